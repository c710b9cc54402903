//! Messages flash : posés avant une redirection, lus et effacés à la requête suivante.

use actix_session::Session;
use serde::{Deserialize, Serialize};

const FLASH_KEY: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlashMessages {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub success: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error: Vec<String>,
}

impl FlashMessages {
    fn bucket(&mut self, kind: FlashKind) -> &mut Vec<String> {
        match kind {
            FlashKind::Success => &mut self.success,
            FlashKind::Error => &mut self.error,
        }
    }
}

/// Ajoute un message ; un échec de session est journalisé sans interrompre la requête
pub fn push(session: &Session, kind: FlashKind, message: impl Into<String>) {
    let mut messages = session
        .get::<FlashMessages>(FLASH_KEY)
        .ok()
        .flatten()
        .unwrap_or_default();
    messages.bucket(kind).push(message.into());

    if let Err(err) = session.insert(FLASH_KEY, &messages) {
        tracing::warn!(error = %err, "impossible d'enregistrer le message flash");
    }
}

pub fn success(session: &Session, message: impl Into<String>) {
    push(session, FlashKind::Success, message);
}

pub fn error(session: &Session, message: impl Into<String>) {
    push(session, FlashKind::Error, message);
}

/// Lit puis efface les messages en attente
pub fn take(session: &Session) -> FlashMessages {
    match session.remove_as::<FlashMessages>(FLASH_KEY) {
        Some(Ok(messages)) => messages,
        Some(Err(raw)) => {
            tracing::warn!(raw = %raw, "messages flash illisibles ignorés");
            FlashMessages::default()
        }
        None => FlashMessages::default(),
    }
}

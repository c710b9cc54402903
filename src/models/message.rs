use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::UnknownStatus;
use crate::errors::{AppError, Result};
use crate::utils::validation::{looks_like_email, normalize, FormErrors};

/// Objet utilisé quand le visiteur n'en saisit pas
pub const DEFAULT_SUBJECT: &str = "Demande de contact";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Unread,
    Read,
    Replied,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Unread => "unread",
            MessageStatus::Read => "read",
            MessageStatus::Replied => "replied",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unread" => Ok(MessageStatus::Unread),
            "read" => Ok(MessageStatus::Read),
            "replied" => Ok(MessageStatus::Replied),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for MessageStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Message laissé via le formulaire de contact
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Formulaire public de contact
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// Message validé, toujours créé au statut `unread`
#[derive(Debug, Clone, PartialEq)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<NewContactMessage> {
        let mut errors = FormErrors::new();
        let name = errors.required(self.name.as_deref(), "");
        let email = errors.required(self.email.as_deref(), "");
        let message = errors.required(self.message.as_deref(), "");
        if !errors.is_empty() {
            return Err(AppError::Validation(
                "Tous les champs obligatoires doivent être remplis".to_string(),
            ));
        }
        if !looks_like_email(&email) {
            return Err(AppError::Validation("Adresse email invalide".to_string()));
        }

        let phone = normalize(self.phone.as_deref());
        let subject =
            normalize(self.subject.as_deref()).unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        let mut errors = FormErrors::new();
        errors.max_len(Some(&name), 255, "Le nom ne doit pas dépasser 255 caractères");
        errors.max_len(Some(&email), 255, "L'email ne doit pas dépasser 255 caractères");
        errors.max_len(phone.as_deref(), 64, "Le téléphone ne doit pas dépasser 64 caractères");
        errors.max_len(Some(&subject), 255, "Le sujet ne doit pas dépasser 255 caractères");
        errors.finish()?;

        Ok(NewContactMessage {
            name,
            email,
            phone,
            subject,
            message,
        })
    }
}

/// Formulaire de changement de statut (back-office)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusForm {
    pub status: Option<String>,
}

impl StatusForm {
    pub fn validate(&self) -> Result<MessageStatus> {
        normalize(self.status.as_deref())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| AppError::Validation("Statut de message invalide".to_string()))
    }
}

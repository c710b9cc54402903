//! Validation des champs de formulaire.

use crate::errors::AppError;

/// Rogne la valeur ; une chaîne vide devient `None`
pub fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Vérification grossière : une partie locale, un `@`, un domaine avec un point
pub fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Accumule les erreurs d'un formulaire pour les signaler d'un coup
#[derive(Debug, Default)]
pub struct FormErrors(Vec<String>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Champ obligatoire ; renvoie la valeur rognée (vide si absente)
    pub fn required(&mut self, value: Option<&str>, message: &str) -> String {
        match normalize(value) {
            Some(v) => v,
            None => {
                self.0.push(message.to_string());
                String::new()
            }
        }
    }

    pub fn check(&mut self, ok: bool, message: &str) {
        if !ok {
            self.0.push(message.to_string());
        }
    }

    pub fn max_len(&mut self, value: Option<&str>, max: usize, message: &str) {
        if let Some(v) = value {
            self.check(v.chars().count() <= max, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0.join(", ")))
        }
    }
}

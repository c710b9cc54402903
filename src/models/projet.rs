use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use super::UnknownStatus;
use crate::errors::{AppError, Result};
use crate::utils::validation::{normalize, FormErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjetStatus {
    #[default]
    Active,
    Archived,
}

impl ProjetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjetStatus::Active => "active",
            ProjetStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjetStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProjetStatus::Active),
            "archived" => Ok(ProjetStatus::Archived),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for ProjetStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Projet réalisé
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Projet {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub date: NaiveDate,
    pub client: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ProjetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Champs bruts du formulaire de projet (l'image arrive à part)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjetForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub client: Option<String>,
    pub status: Option<String>,
}

/// Projet validé. `image: None` conserve l'image existante lors d'une mise à jour.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjetInput {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub client: Option<String>,
    pub status: ProjetStatus,
    pub image: Option<String>,
}

impl ProjetForm {
    pub fn validate(&self) -> Result<ProjetInput> {
        let mut errors = FormErrors::new();
        let title = errors.required(self.title.as_deref(), "Le titre est obligatoire");
        let description =
            errors.required(self.description.as_deref(), "La description est obligatoire");
        errors.max_len(Some(&title), 255, "Le titre ne doit pas dépasser 255 caractères");

        let raw_date = errors.required(self.date.as_deref(), "La date est obligatoire");
        let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").ok();
        if !raw_date.is_empty() {
            errors.check(date.is_some(), "La date doit être au format AAAA-MM-JJ");
        }

        let status = match normalize(self.status.as_deref()) {
            Some(raw) => raw.parse::<ProjetStatus>().ok(),
            None => Some(ProjetStatus::default()),
        };
        errors.check(status.is_some(), "Statut de projet invalide");

        errors.finish()?;

        match (date, status) {
            (Some(date), Some(status)) => Ok(ProjetInput {
                title,
                description,
                date,
                client: normalize(self.client.as_deref()),
                status,
                image: None,
            }),
            _ => Err(AppError::Validation("Projet invalide".to_string())),
        }
    }
}

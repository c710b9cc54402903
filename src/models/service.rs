use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::Result;
use crate::utils::validation::{normalize, FormErrors};

/// Service proposé sur le site public
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub duration: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Formulaire de création / modification d'un service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInput {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub duration: Option<String>,
}

impl ServiceForm {
    pub fn validate(&self) -> Result<ServiceInput> {
        let mut errors = FormErrors::new();
        let title = errors.required(self.title.as_deref(), "Le titre est obligatoire");
        let description =
            errors.required(self.description.as_deref(), "La description est obligatoire");
        let image_url = normalize(self.image_url.as_deref());
        let category = normalize(self.category.as_deref());
        let duration = normalize(self.duration.as_deref());
        errors.max_len(Some(&title), 255, "Le titre ne doit pas dépasser 255 caractères");
        errors.max_len(image_url.as_deref(), 255, "L'URL de l'image ne doit pas dépasser 255 caractères");
        errors.max_len(category.as_deref(), 255, "La catégorie ne doit pas dépasser 255 caractères");
        errors.max_len(duration.as_deref(), 255, "La durée ne doit pas dépasser 255 caractères");
        errors.finish()?;

        Ok(ServiceInput {
            title,
            description,
            image_url,
            category,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    fn form() -> ServiceForm {
        ServiceForm {
            title: Some(" Audit énergétique ".into()),
            description: Some("Bilan complet".into()),
            category: Some("  ".into()),
            ..Default::default()
        }
    }

    #[test]
    fn optional_fields_are_trimmed_to_none() {
        let input = form().validate().unwrap();
        assert_eq!(input.title, "Audit énergétique");
        assert_eq!(input.category, None);
        assert_eq!(input.image_url, None);
    }

    #[test]
    fn values_longer_than_their_column_are_refused() {
        let long = "é".repeat(256);
        for field in ["title", "imageUrl", "category", "duration"] {
            let mut form = form();
            match field {
                "title" => form.title = Some(long.clone()),
                "imageUrl" => form.image_url = Some(long.clone()),
                "category" => form.category = Some(long.clone()),
                _ => form.duration = Some(long.clone()),
            }
            assert!(
                matches!(form.validate(), Err(AppError::Validation(_))),
                "{} trop long doit être refusé",
                field
            );
        }

        let mut form = form();
        form.title = Some("é".repeat(255));
        assert!(form.validate().is_ok());
    }
}

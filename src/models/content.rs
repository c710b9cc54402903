use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::Result;
use crate::utils::validation::{normalize, FormErrors};

/// Bloc de contenu ; `page` et `section` l'adressent comme emplacement unique
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: i32,
    pub title: String,
    pub text: String,
    pub page: Option<String>,
    pub section: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Champs bruts du formulaire de contenu
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentForm {
    pub title: Option<String>,
    pub text: Option<String>,
    pub page: Option<String>,
    pub section: Option<String>,
}

/// Contenu validé, prêt à écrire. `image: None` conserve l'image existante.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentInput {
    pub title: String,
    pub text: String,
    pub page: Option<String>,
    pub section: Option<String>,
    pub image: Option<String>,
}

impl ContentForm {
    pub fn validate(&self) -> Result<ContentInput> {
        let mut errors = FormErrors::new();
        let title = errors.required(self.title.as_deref(), "Le titre est obligatoire");
        let text = errors.required(self.text.as_deref(), "Le contenu est obligatoire");
        let page = normalize(self.page.as_deref());
        let section = normalize(self.section.as_deref());

        errors.max_len(Some(&title), 255, "Le titre ne doit pas dépasser 255 caractères");
        errors.max_len(page.as_deref(), 100, "La page ne doit pas dépasser 100 caractères");
        errors.max_len(section.as_deref(), 100, "La section ne doit pas dépasser 100 caractères");
        errors.finish()?;

        Ok(ContentInput {
            title,
            text,
            page,
            section,
            image: None,
        })
    }
}

/// Page publique alimentée par l'emplacement `page` d'un contenu
#[derive(Debug)]
pub struct PageSlot {
    pub page: &'static str,
    pub fallback_title: &'static str,
    pub fallback_text: &'static str,
}

pub const HOME_SLOT: PageSlot = PageSlot {
    page: "accueil",
    fallback_title: "ENNO - Solutions Énergétiques",
    fallback_text: "Solutions clés en main depuis 2008",
};

pub const SERVICES_SLOT: PageSlot = PageSlot {
    page: "services",
    fallback_title: "Nos expertises",
    fallback_text: "Solutions clés en main : étude, installation, solaire, maintenance et support.",
};

pub const ABOUT_SLOT: PageSlot = PageSlot {
    page: "apropos",
    fallback_title: "Energies Nouvelles (ENNO)",
    fallback_text: "Fondée en 2008, ENNO est spécialisée dans les solutions énergétiques durables en République du Congo.",
};

pub const PAGE_SLOTS: &[PageSlot] = &[HOME_SLOT, SERVICES_SLOT, ABOUT_SLOT];

pub fn page_slot(page: &str) -> Option<&'static PageSlot> {
    PAGE_SLOTS.iter().find(|slot| slot.page == page)
}

/// Contenu affiché sur une page publique
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageContent {
    pub title: String,
    pub text: String,
    pub image: Option<String>,
}

impl PageSlot {
    /// Le contenu enregistré s'il existe, sinon le texte par défaut
    pub fn resolve(&self, content: Option<Content>) -> PageContent {
        match content {
            Some(content) => PageContent {
                title: content.title,
                text: content.text,
                image: content.image,
            },
            None => PageContent {
                title: self.fallback_title.to_string(),
                text: self.fallback_text.to_string(),
                image: None,
            },
        }
    }
}

//! Accès aux données du site.
//!
//! `SiteStore` est implémenté par le stockage MySQL et par un stockage en
//! mémoire (démarrage sans `DATABASE_URL` et tests). Les écritures sur les
//! emplacements de contenu échouent avec `AppError::DuplicateSlot` au lieu
//! d'écraser une autre ligne.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::AdminSeed;
use crate::errors::{AppError, Result};
use crate::models::admin::{Admin, NewAdmin};
use crate::models::content::{Content, ContentInput};
use crate::models::message::{ContactMessage, MessageStatus, NewContactMessage};
use crate::models::projet::{Projet, ProjetInput};
use crate::models::service::{Service, ServiceInput};
use crate::models::visitor::{NewVisit, StatsWindows, Visitor, VisitorStats};
use crate::models::SiteTotals;
use crate::utils::hash;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait SiteStore: Send + Sync {
    // Administrateurs
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>>;
    async fn create_admin(&self, admin: NewAdmin) -> Result<Admin>;

    // Contenus
    async fn list_contents(&self) -> Result<Vec<Content>>;
    async fn find_content(&self, id: i32) -> Result<Option<Content>>;
    async fn find_content_by_page(&self, page: &str) -> Result<Option<Content>>;
    async fn insert_content(&self, input: ContentInput) -> Result<Content>;
    /// `None` si l'id n'existe pas
    async fn update_content(&self, id: i32, input: ContentInput) -> Result<Option<Content>>;
    /// Crée ou met à jour le contenu de la page ; `section` n'est pas modifiée
    async fn upsert_page_content(&self, page: &str, input: ContentInput) -> Result<Content>;
    /// `false` si l'id n'existe pas
    async fn delete_content(&self, id: i32) -> Result<bool>;

    // Services
    async fn list_services(&self) -> Result<Vec<Service>>;
    async fn find_service(&self, id: i32) -> Result<Option<Service>>;
    async fn insert_service(&self, input: ServiceInput) -> Result<Service>;
    async fn update_service(&self, id: i32, input: ServiceInput) -> Result<Option<Service>>;
    async fn delete_service(&self, id: i32) -> Result<bool>;

    // Projets, triés par date décroissante
    async fn list_projets(&self, limit: Option<i64>) -> Result<Vec<Projet>>;
    async fn find_projet(&self, id: i32) -> Result<Option<Projet>>;
    async fn insert_projet(&self, input: ProjetInput) -> Result<Projet>;
    async fn update_projet(&self, id: i32, input: ProjetInput) -> Result<Option<Projet>>;
    async fn delete_projet(&self, id: i32) -> Result<bool>;

    // Messages de contact
    async fn list_messages(&self, limit: Option<i64>) -> Result<Vec<ContactMessage>>;
    async fn find_message(&self, id: i32) -> Result<Option<ContactMessage>>;
    async fn insert_message(&self, message: NewContactMessage) -> Result<ContactMessage>;
    /// Passe un message `unread` à `read` et le renvoie ; les autres statuts sont conservés
    async fn open_message(&self, id: i32) -> Result<Option<ContactMessage>>;
    async fn set_message_status(&self, id: i32, status: MessageStatus) -> Result<bool>;
    async fn delete_message(&self, id: i32) -> Result<bool>;

    // Visiteurs
    /// Enregistre la visite sauf si la même session a vu la même page
    /// dans les 30 dernières minutes. Renvoie `true` si une ligne a été créée.
    async fn record_visit(&self, visit: NewVisit, now: DateTime<Utc>) -> Result<bool>;
    async fn visitor_stats(&self, windows: StatsWindows) -> Result<VisitorStats>;
    async fn list_visits(&self, offset: i64, limit: i64) -> Result<(Vec<Visitor>, i64)>;

    async fn totals(&self) -> Result<SiteTotals>;
}

/// Crée l'administrateur configuré s'il n'existe pas encore
pub async fn ensure_admin(store: &dyn SiteStore, seed: &AdminSeed) -> Result<bool> {
    if store.find_admin_by_email(&seed.email).await?.is_some() {
        return Ok(false);
    }

    let password_hash = match (&seed.password_hash, &seed.password) {
        (Some(hash), _) => hash.clone(),
        (None, Some(password)) => hash::hash_password(password)?,
        (None, None) => {
            return Err(AppError::Validation(
                "ADMIN_PASSWORD ou ADMIN_HASH_PASSWORD doit être défini".to_string(),
            ))
        }
    };

    let admin = store
        .create_admin(NewAdmin {
            email: seed.email.clone(),
            password_hash,
            name: seed.name.clone(),
        })
        .await?;
    tracing::info!(admin_id = admin.id, email = %admin.email, "administrateur créé");
    Ok(true)
}

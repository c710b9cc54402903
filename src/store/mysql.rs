use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use super::SiteStore;
use crate::errors::{AppError, Result};
use crate::models::admin::{Admin, NewAdmin};
use crate::models::content::{Content, ContentInput};
use crate::models::message::{ContactMessage, MessageStatus, NewContactMessage};
use crate::models::projet::{Projet, ProjetInput};
use crate::models::service::{Service, ServiceInput};
use crate::models::visitor::{
    dedup_window_start, NewVisit, PageVisits, StatsWindows, Visitor, VisitorStats,
    TOP_PAGES_LIMIT,
};
use crate::models::SiteTotals;

const CONTENT_COLUMNS: &str =
    "id, title, text, page, section, image, created_at, updated_at";
const SERVICE_COLUMNS: &str =
    "id, title, description, image_url, category, duration, created_at, updated_at";
const PROJET_COLUMNS: &str =
    "id, title, description, image, date, client, status, created_at, updated_at";
const MESSAGE_COLUMNS: &str =
    "id, name, email, phone, subject, message, status, created_at, updated_at";
const VISITOR_COLUMNS: &str = "id, ip, user_agent, page, referer, session_id, created_at";

/// Stockage MySQL ; l'unicité des emplacements repose sur les index uniques
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool).await?)
    }

    async fn count_since(&self, sql: &str, since: DateTime<Utc>) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>(sql)
            .bind(since)
            .fetch_one(&self.pool)
            .await?)
    }
}

/// Traduit une violation d'index unique sur `contents` en erreur de validation
fn slot_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::DuplicateSlot;
        }
    }
    AppError::Database(err)
}

fn last_id(result: &sqlx::mysql::MySqlQueryResult) -> i32 {
    result.last_insert_id() as i32
}

#[async_trait]
impl SiteStore for MySqlStore {
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>> {
        Ok(sqlx::query_as::<_, Admin>(
            "SELECT id, email, password, name, created_at FROM admins WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_admin(&self, admin: NewAdmin) -> Result<Admin> {
        let result = sqlx::query("INSERT INTO admins (email, password, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(&admin.email)
            .bind(&admin.password_hash)
            .bind(&admin.name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Validation("Email déjà utilisé".to_string())
                }
                other => AppError::Database(other),
            })?;

        Ok(sqlx::query_as::<_, Admin>(
            "SELECT id, email, password, name, created_at FROM admins WHERE id = ?",
        )
        .bind(last_id(&result))
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_contents(&self) -> Result<Vec<Content>> {
        let sql = format!("SELECT {} FROM contents ORDER BY updated_at DESC, id DESC", CONTENT_COLUMNS);
        Ok(sqlx::query_as::<_, Content>(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_content(&self, id: i32) -> Result<Option<Content>> {
        let sql = format!("SELECT {} FROM contents WHERE id = ?", CONTENT_COLUMNS);
        Ok(sqlx::query_as::<_, Content>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_content_by_page(&self, page: &str) -> Result<Option<Content>> {
        let sql = format!("SELECT {} FROM contents WHERE page = ?", CONTENT_COLUMNS);
        Ok(sqlx::query_as::<_, Content>(&sql)
            .bind(page)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_content(&self, input: ContentInput) -> Result<Content> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO contents (title, text, page, section, image, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.title)
        .bind(&input.text)
        .bind(&input.page)
        .bind(&input.section)
        .bind(&input.image)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(slot_conflict)?;

        self.find_content(last_id(&result))
            .await?
            .ok_or(AppError::NotFound("Contenu"))
    }

    async fn update_content(&self, id: i32, input: ContentInput) -> Result<Option<Content>> {
        // COALESCE : sans nouvelle image, l'ancienne est conservée
        sqlx::query(
            "UPDATE contents SET title = ?, text = ?, page = ?, section = ?, \
             image = COALESCE(?, image), updated_at = ? WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.text)
        .bind(&input.page)
        .bind(&input.section)
        .bind(&input.image)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(slot_conflict)?;

        self.find_content(id).await
    }

    async fn upsert_page_content(&self, page: &str, input: ContentInput) -> Result<Content> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO contents (page, title, text, image, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE title = VALUES(title), text = VALUES(text), \
             image = COALESCE(VALUES(image), image), updated_at = VALUES(updated_at)",
        )
        .bind(page)
        .bind(&input.title)
        .bind(&input.text)
        .bind(&input.image)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(slot_conflict)?;

        self.find_content_by_page(page)
            .await?
            .ok_or(AppError::NotFound("Contenu"))
    }

    async fn delete_content(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        let sql = format!("SELECT {} FROM services ORDER BY created_at DESC, id DESC", SERVICE_COLUMNS);
        Ok(sqlx::query_as::<_, Service>(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_service(&self, id: i32) -> Result<Option<Service>> {
        let sql = format!("SELECT {} FROM services WHERE id = ?", SERVICE_COLUMNS);
        Ok(sqlx::query_as::<_, Service>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_service(&self, input: ServiceInput) -> Result<Service> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO services (title, description, image_url, category, duration, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(&input.category)
        .bind(&input.duration)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_service(last_id(&result))
            .await?
            .ok_or(AppError::NotFound("Service"))
    }

    async fn update_service(&self, id: i32, input: ServiceInput) -> Result<Option<Service>> {
        sqlx::query(
            "UPDATE services SET title = ?, description = ?, image_url = ?, category = ?, \
             duration = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(&input.category)
        .bind(&input.duration)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find_service(id).await
    }

    async fn delete_service(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM services WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_projets(&self, limit: Option<i64>) -> Result<Vec<Projet>> {
        let sql = format!(
            "SELECT {} FROM projets ORDER BY date DESC, id DESC LIMIT ?",
            PROJET_COLUMNS
        );
        Ok(sqlx::query_as::<_, Projet>(&sql)
            .bind(limit.unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_projet(&self, id: i32) -> Result<Option<Projet>> {
        let sql = format!("SELECT {} FROM projets WHERE id = ?", PROJET_COLUMNS);
        Ok(sqlx::query_as::<_, Projet>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_projet(&self, input: ProjetInput) -> Result<Projet> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO projets (title, description, image, date, client, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.image)
        .bind(input.date)
        .bind(&input.client)
        .bind(input.status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_projet(last_id(&result))
            .await?
            .ok_or(AppError::NotFound("Projet"))
    }

    async fn update_projet(&self, id: i32, input: ProjetInput) -> Result<Option<Projet>> {
        sqlx::query(
            "UPDATE projets SET title = ?, description = ?, date = ?, client = ?, status = ?, \
             image = COALESCE(?, image), updated_at = ? WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.date)
        .bind(&input.client)
        .bind(input.status.as_str())
        .bind(&input.image)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find_projet(id).await
    }

    async fn delete_projet(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_messages(&self, limit: Option<i64>) -> Result<Vec<ContactMessage>> {
        let sql = format!(
            "SELECT {} FROM contact_messages ORDER BY created_at DESC, id DESC LIMIT ?",
            MESSAGE_COLUMNS
        );
        Ok(sqlx::query_as::<_, ContactMessage>(&sql)
            .bind(limit.unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_message(&self, id: i32) -> Result<Option<ContactMessage>> {
        let sql = format!("SELECT {} FROM contact_messages WHERE id = ?", MESSAGE_COLUMNS);
        Ok(sqlx::query_as::<_, ContactMessage>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_message(&self, message: NewContactMessage) -> Result<ContactMessage> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO contact_messages (name, email, phone, subject, message, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.phone)
        .bind(&message.subject)
        .bind(&message.message)
        .bind(MessageStatus::Unread.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_message(last_id(&result))
            .await?
            .ok_or(AppError::NotFound("Message"))
    }

    async fn open_message(&self, id: i32) -> Result<Option<ContactMessage>> {
        // La condition sur le statut rend la transition unread -> read unique
        sqlx::query("UPDATE contact_messages SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(MessageStatus::Read.as_str())
            .bind(Utc::now())
            .bind(id)
            .bind(MessageStatus::Unread.as_str())
            .execute(&self.pool)
            .await?;

        self.find_message(id).await
    }

    async fn set_message_status(&self, id: i32, status: MessageStatus) -> Result<bool> {
        sqlx::query("UPDATE contact_messages SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        // rows_affected vaut 0 quand le statut ne change pas : on relit
        Ok(self.find_message(id).await?.is_some())
    }

    async fn delete_message(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_visit(&self, visit: NewVisit, now: DateTime<Utc>) -> Result<bool> {
        // Vérification puis insertion non atomiques : deux requêtes simultanées
        // de la même session peuvent compter deux fois
        let existing = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM visitors WHERE session_id <=> ? AND page = ? AND created_at >= ? LIMIT 1",
        )
        .bind(&visit.session_id)
        .bind(&visit.page)
        .bind(dedup_window_start(now))
        .fetch_optional(&self.pool)
        .await?;

        if existing.is_some() {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO visitors (ip, user_agent, page, referer, session_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&visit.ip)
        .bind(&visit.user_agent)
        .bind(&visit.page)
        .bind(&visit.referer)
        .bind(&visit.session_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    async fn visitor_stats(&self, windows: StatsWindows) -> Result<VisitorStats> {
        let since = "SELECT COUNT(*) FROM visitors WHERE created_at >= ?";

        let top_pages = sqlx::query_as::<_, PageVisits>(
            "SELECT page, COUNT(*) AS visits FROM visitors GROUP BY page \
             ORDER BY visits DESC, page ASC LIMIT ?",
        )
        .bind(TOP_PAGES_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(VisitorStats {
            visitors_today: self.count_since(since, windows.start_of_day).await?,
            visitors_this_week: self.count_since(since, windows.week_start).await?,
            visitors_this_month: self.count_since(since, windows.month_start).await?,
            total_visitors: self.count("SELECT COUNT(*) FROM visitors").await?,
            unique_visitors_today: self
                .count_since(
                    "SELECT COUNT(DISTINCT ip) FROM visitors WHERE created_at >= ?",
                    windows.start_of_day,
                )
                .await?,
            top_pages,
        })
    }

    async fn list_visits(&self, offset: i64, limit: i64) -> Result<(Vec<Visitor>, i64)> {
        let sql = format!(
            "SELECT {} FROM visitors ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            VISITOR_COLUMNS
        );
        let rows = sqlx::query_as::<_, Visitor>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        let total = self.count("SELECT COUNT(*) FROM visitors").await?;
        Ok((rows, total))
    }

    async fn totals(&self) -> Result<SiteTotals> {
        Ok(SiteTotals {
            contents: self.count("SELECT COUNT(*) FROM contents").await?,
            services: self.count("SELECT COUNT(*) FROM services").await?,
            projets: self.count("SELECT COUNT(*) FROM projets").await?,
            messages: self.count("SELECT COUNT(*) FROM contact_messages").await?,
            unread_messages: self
                .count("SELECT COUNT(*) FROM contact_messages WHERE status = 'unread'")
                .await?,
        })
    }
}

/// Tests sur une vraie base : ignorés sans `DATABASE_URL`
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use uuid::Uuid;

    async fn store() -> Option<MySqlStore> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL absent, test MySQL ignoré");
            return None;
        };
        let pool = db::init_pool(&url, 2).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        Some(MySqlStore::new(pool))
    }

    /// Valeur propre à l'exécution pour ne pas heurter les lignes existantes
    fn unique(prefix: &str) -> String {
        format!("{}-{}", prefix, Uuid::new_v4().simple())
    }

    fn content(title: &str, page: Option<&str>, image: Option<&str>) -> ContentInput {
        ContentInput {
            title: title.into(),
            text: "Texte".into(),
            page: page.map(Into::into),
            section: None,
            image: image.map(Into::into),
        }
    }

    #[actix_web::test]
    async fn page_slot_is_unique() {
        let Some(store) = store().await else { return };
        let page = unique("page");

        let first = store.insert_content(content("Accueil", Some(&page), None)).await.unwrap();
        let err = store
            .insert_content(content("Autre", Some(&page), None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateSlot));

        let other = store.insert_content(content("Libre", None, None)).await.unwrap();
        let err = store
            .update_content(other.id, content("Libre", Some(&page), None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateSlot));

        store.delete_content(first.id).await.unwrap();
        store.delete_content(other.id).await.unwrap();
    }

    #[actix_web::test]
    async fn update_without_image_keeps_the_stored_one() {
        let Some(store) = store().await else { return };

        let created = store
            .insert_content(content("Mission", None, Some("/images/content-a.png")))
            .await
            .unwrap();
        let updated = store
            .update_content(created.id, content("Mission 2", None, None))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Mission 2");
        assert_eq!(updated.image.as_deref(), Some("/images/content-a.png"));

        assert!(store.update_content(i32::MAX, content("x", None, None)).await.unwrap().is_none());
        store.delete_content(created.id).await.unwrap();
    }

    #[actix_web::test]
    async fn page_upsert_reuses_the_row() {
        let Some(store) = store().await else { return };
        let page = unique("page");

        let first = store
            .upsert_page_content(&page, content("V1", None, Some("/images/content-b.png")))
            .await
            .unwrap();
        let second = store.upsert_page_content(&page, content("V2", None, None)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.title, "V2");
        assert_eq!(second.image.as_deref(), Some("/images/content-b.png"));

        store.delete_content(second.id).await.unwrap();
    }

    #[actix_web::test]
    async fn opening_marks_unread_once_and_keeps_replied() {
        let Some(store) = store().await else { return };
        let message = store
            .insert_message(NewContactMessage {
                name: "Jane".into(),
                email: "jane@x.com".into(),
                phone: None,
                subject: "Devis".into(),
                message: "Bonjour".into(),
            })
            .await
            .unwrap();
        assert_eq!(message.status, MessageStatus::Unread);

        let opened = store.open_message(message.id).await.unwrap().unwrap();
        assert_eq!(opened.status, MessageStatus::Read);

        assert!(store.set_message_status(message.id, MessageStatus::Replied).await.unwrap());
        let reopened = store.open_message(message.id).await.unwrap().unwrap();
        assert_eq!(reopened.status, MessageStatus::Replied);

        assert!(store.open_message(i32::MAX).await.unwrap().is_none());
        assert!(store.delete_message(message.id).await.unwrap());
    }

    #[actix_web::test]
    async fn visits_are_deduplicated_within_the_window() {
        let Some(store) = store().await else { return };
        let session = unique("s");
        let visit = NewVisit {
            ip: "10.0.0.1".into(),
            user_agent: None,
            page: "/services".into(),
            referer: None,
            session_id: Some(session),
        };
        let now = Utc::now();

        assert!(store.record_visit(visit.clone(), now).await.unwrap());
        assert!(!store
            .record_visit(visit.clone(), now + chrono::Duration::minutes(10))
            .await
            .unwrap());
        assert!(store
            .record_visit(visit, now + chrono::Duration::minutes(31))
            .await
            .unwrap());
    }
}

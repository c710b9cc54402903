//! Stockage en mémoire : toutes les tables derrière un seul verrou, ce qui
//! rend atomiques la vérification d'unicité et l'écriture.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

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

struct Table<T> {
    rows: Vec<T>,
    last_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
struct Tables {
    admins: Table<Admin>,
    contents: Table<Content>,
    services: Table<Service>,
    projets: Table<Projet>,
    messages: Table<ContactMessage>,
    visitors: Table<Visitor>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Un panic pendant une écriture ne laisse pas de donnée à moitié écrite
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Vrai si une autre ligne que `except` occupe déjà la page ou la section
fn slot_taken(rows: &[Content], page: Option<&str>, section: Option<&str>, except: Option<i32>) -> bool {
    rows.iter().filter(|c| Some(c.id) != except).any(|c| {
        (page.is_some() && c.page.as_deref() == page)
            || (section.is_some() && c.section.as_deref() == section)
    })
}

fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn truncate<T>(mut rows: Vec<T>, limit: Option<i64>) -> Vec<T> {
    if let Some(limit) = limit {
        rows.truncate(limit.max(0) as usize);
    }
    rows
}

fn remove_by_id<T>(rows: &mut Vec<T>, id: i32, row_id: impl Fn(&T) -> i32) -> bool {
    let before = rows.len();
    rows.retain(|row| row_id(row) != id);
    rows.len() != before
}

#[async_trait]
impl SiteStore for MemoryStore {
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>> {
        Ok(self.tables().admins.rows.iter().find(|a| a.email == email).cloned())
    }

    async fn create_admin(&self, admin: NewAdmin) -> Result<Admin> {
        let mut tables = self.tables();
        if tables.admins.rows.iter().any(|a| a.email == admin.email) {
            return Err(AppError::Validation("Email déjà utilisé".to_string()));
        }
        let row = Admin {
            id: tables.admins.next_id(),
            email: admin.email,
            password: admin.password_hash,
            name: admin.name,
            created_at: Utc::now(),
        };
        tables.admins.rows.push(row.clone());
        Ok(row)
    }

    async fn list_contents(&self) -> Result<Vec<Content>> {
        let mut rows = self.tables().contents.rows.clone();
        newest_first(&mut rows, |c| (c.updated_at, c.id));
        Ok(rows)
    }

    async fn find_content(&self, id: i32) -> Result<Option<Content>> {
        Ok(self.tables().contents.rows.iter().find(|c| c.id == id).cloned())
    }

    async fn find_content_by_page(&self, page: &str) -> Result<Option<Content>> {
        Ok(self
            .tables()
            .contents
            .rows
            .iter()
            .find(|c| c.page.as_deref() == Some(page))
            .cloned())
    }

    async fn insert_content(&self, input: ContentInput) -> Result<Content> {
        let mut tables = self.tables();
        if slot_taken(&tables.contents.rows, input.page.as_deref(), input.section.as_deref(), None) {
            return Err(AppError::DuplicateSlot);
        }
        let now = Utc::now();
        let row = Content {
            id: tables.contents.next_id(),
            title: input.title,
            text: input.text,
            page: input.page,
            section: input.section,
            image: input.image,
            created_at: now,
            updated_at: now,
        };
        tables.contents.rows.push(row.clone());
        Ok(row)
    }

    async fn update_content(&self, id: i32, input: ContentInput) -> Result<Option<Content>> {
        let mut tables = self.tables();
        if !tables.contents.rows.iter().any(|c| c.id == id) {
            return Ok(None);
        }
        if slot_taken(&tables.contents.rows, input.page.as_deref(), input.section.as_deref(), Some(id)) {
            return Err(AppError::DuplicateSlot);
        }
        let Some(row) = tables.contents.rows.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        row.title = input.title;
        row.text = input.text;
        row.page = input.page;
        row.section = input.section;
        if input.image.is_some() {
            row.image = input.image;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn upsert_page_content(&self, page: &str, input: ContentInput) -> Result<Content> {
        let mut tables = self.tables();
        let now = Utc::now();
        if let Some(row) = tables
            .contents
            .rows
            .iter_mut()
            .find(|c| c.page.as_deref() == Some(page))
        {
            row.title = input.title;
            row.text = input.text;
            if input.image.is_some() {
                row.image = input.image;
            }
            row.updated_at = now;
            return Ok(row.clone());
        }

        let row = Content {
            id: tables.contents.next_id(),
            title: input.title,
            text: input.text,
            page: Some(page.to_string()),
            section: None,
            image: input.image,
            created_at: now,
            updated_at: now,
        };
        tables.contents.rows.push(row.clone());
        Ok(row)
    }

    async fn delete_content(&self, id: i32) -> Result<bool> {
        Ok(remove_by_id(&mut self.tables().contents.rows, id, |c| c.id))
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        let mut rows = self.tables().services.rows.clone();
        newest_first(&mut rows, |s| (s.created_at, s.id));
        Ok(rows)
    }

    async fn find_service(&self, id: i32) -> Result<Option<Service>> {
        Ok(self.tables().services.rows.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_service(&self, input: ServiceInput) -> Result<Service> {
        let mut tables = self.tables();
        let now = Utc::now();
        let row = Service {
            id: tables.services.next_id(),
            title: input.title,
            description: input.description,
            image_url: input.image_url,
            category: input.category,
            duration: input.duration,
            created_at: now,
            updated_at: now,
        };
        tables.services.rows.push(row.clone());
        Ok(row)
    }

    async fn update_service(&self, id: i32, input: ServiceInput) -> Result<Option<Service>> {
        let mut tables = self.tables();
        let Some(row) = tables.services.rows.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        row.title = input.title;
        row.description = input.description;
        row.image_url = input.image_url;
        row.category = input.category;
        row.duration = input.duration;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_service(&self, id: i32) -> Result<bool> {
        Ok(remove_by_id(&mut self.tables().services.rows, id, |s| s.id))
    }

    async fn list_projets(&self, limit: Option<i64>) -> Result<Vec<Projet>> {
        let mut rows = self.tables().projets.rows.clone();
        rows.sort_by(|a, b| (b.date, b.id).cmp(&(a.date, a.id)));
        Ok(truncate(rows, limit))
    }

    async fn find_projet(&self, id: i32) -> Result<Option<Projet>> {
        Ok(self.tables().projets.rows.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_projet(&self, input: ProjetInput) -> Result<Projet> {
        let mut tables = self.tables();
        let now = Utc::now();
        let row = Projet {
            id: tables.projets.next_id(),
            title: input.title,
            description: input.description,
            image: input.image,
            date: input.date,
            client: input.client,
            status: input.status,
            created_at: now,
            updated_at: now,
        };
        tables.projets.rows.push(row.clone());
        Ok(row)
    }

    async fn update_projet(&self, id: i32, input: ProjetInput) -> Result<Option<Projet>> {
        let mut tables = self.tables();
        let Some(row) = tables.projets.rows.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        row.title = input.title;
        row.description = input.description;
        row.date = input.date;
        row.client = input.client;
        row.status = input.status;
        if input.image.is_some() {
            row.image = input.image;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_projet(&self, id: i32) -> Result<bool> {
        Ok(remove_by_id(&mut self.tables().projets.rows, id, |p| p.id))
    }

    async fn list_messages(&self, limit: Option<i64>) -> Result<Vec<ContactMessage>> {
        let mut rows = self.tables().messages.rows.clone();
        newest_first(&mut rows, |m| (m.created_at, m.id));
        Ok(truncate(rows, limit))
    }

    async fn find_message(&self, id: i32) -> Result<Option<ContactMessage>> {
        Ok(self.tables().messages.rows.iter().find(|m| m.id == id).cloned())
    }

    async fn insert_message(&self, message: NewContactMessage) -> Result<ContactMessage> {
        let mut tables = self.tables();
        let now = Utc::now();
        let row = ContactMessage {
            id: tables.messages.next_id(),
            name: message.name,
            email: message.email,
            phone: message.phone,
            subject: Some(message.subject),
            message: message.message,
            status: MessageStatus::Unread,
            created_at: now,
            updated_at: now,
        };
        tables.messages.rows.push(row.clone());
        Ok(row)
    }

    async fn open_message(&self, id: i32) -> Result<Option<ContactMessage>> {
        let mut tables = self.tables();
        let Some(row) = tables.messages.rows.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        if row.status == MessageStatus::Unread {
            row.status = MessageStatus::Read;
            row.updated_at = Utc::now();
        }
        Ok(Some(row.clone()))
    }

    async fn set_message_status(&self, id: i32, status: MessageStatus) -> Result<bool> {
        let mut tables = self.tables();
        match tables.messages.rows.iter_mut().find(|m| m.id == id) {
            Some(row) => {
                row.status = status;
                row.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_message(&self, id: i32) -> Result<bool> {
        Ok(remove_by_id(&mut self.tables().messages.rows, id, |m| m.id))
    }

    async fn record_visit(&self, visit: NewVisit, now: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.tables();
        let since = dedup_window_start(now);
        let seen = tables.visitors.rows.iter().any(|v| {
            v.session_id == visit.session_id && v.page == visit.page && v.created_at >= since
        });
        if seen {
            return Ok(false);
        }
        let row = Visitor {
            id: tables.visitors.next_id(),
            ip: visit.ip,
            user_agent: visit.user_agent,
            page: visit.page,
            referer: visit.referer,
            session_id: visit.session_id,
            created_at: now,
        };
        tables.visitors.rows.push(row);
        Ok(true)
    }

    async fn visitor_stats(&self, windows: StatsWindows) -> Result<VisitorStats> {
        let tables = self.tables();
        let rows = &tables.visitors.rows;
        let since = |start: DateTime<Utc>| rows.iter().filter(|v| v.created_at >= start).count() as i64;

        let unique_ips: HashSet<&str> = rows
            .iter()
            .filter(|v| v.created_at >= windows.start_of_day)
            .map(|v| v.ip.as_str())
            .collect();

        let mut per_page: HashMap<&str, i64> = HashMap::new();
        for visit in rows {
            *per_page.entry(visit.page.as_str()).or_default() += 1;
        }
        let mut top_pages: Vec<PageVisits> = per_page
            .into_iter()
            .map(|(page, visits)| PageVisits {
                page: page.to_string(),
                visits,
            })
            .collect();
        top_pages.sort_by(|a, b| b.visits.cmp(&a.visits).then_with(|| a.page.cmp(&b.page)));
        top_pages.truncate(TOP_PAGES_LIMIT);

        Ok(VisitorStats {
            visitors_today: since(windows.start_of_day),
            visitors_this_week: since(windows.week_start),
            visitors_this_month: since(windows.month_start),
            total_visitors: rows.len() as i64,
            unique_visitors_today: unique_ips.len() as i64,
            top_pages,
        })
    }

    async fn list_visits(&self, offset: i64, limit: i64) -> Result<(Vec<Visitor>, i64)> {
        let mut rows = self.tables().visitors.rows.clone();
        let total = rows.len() as i64;
        newest_first(&mut rows, |v| (v.created_at, v.id));
        let page = rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn totals(&self) -> Result<SiteTotals> {
        let tables = self.tables();
        Ok(SiteTotals {
            contents: tables.contents.rows.len() as i64,
            services: tables.services.rows.len() as i64,
            projets: tables.projets.rows.len() as i64,
            messages: tables.messages.rows.len() as i64,
            unread_messages: tables
                .messages
                .rows
                .iter()
                .filter(|m| m.status == MessageStatus::Unread)
                .count() as i64,
        })
    }
}

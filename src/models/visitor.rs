use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Une même session sur une même page n'est comptée qu'une fois sur cette fenêtre
pub const DEDUP_WINDOW_MINUTES: i64 = 30;

/// Nombre de pages du classement des plus visitées
pub const TOP_PAGES_LIMIT: usize = 10;

/// Visite enregistrée
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub id: i32,
    pub ip: String,
    pub user_agent: Option<String>,
    pub page: String,
    pub referer: Option<String>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Visite à enregistrer
#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
    pub ip: String,
    pub user_agent: Option<String>,
    pub page: String,
    pub referer: Option<String>,
    pub session_id: Option<String>,
}

/// Début de la fenêtre de déduplication pour une visite à `now`
pub fn dedup_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::minutes(DEDUP_WINDOW_MINUTES)
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct PageVisits {
    pub page: String,
    pub visits: i64,
}

/// Bornes des périodes de statistiques, en UTC
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsWindows {
    pub start_of_day: DateTime<Utc>,
    pub week_start: DateTime<Utc>,
    pub month_start: DateTime<Utc>,
}

impl StatsWindows {
    pub fn at(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let first_of_month = today.with_day(1).unwrap_or(today);
        Self {
            start_of_day: today.and_time(NaiveTime::MIN).and_utc(),
            week_start: now - Duration::days(7),
            month_start: first_of_month.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    pub visitors_today: i64,
    pub visitors_this_week: i64,
    pub visitors_this_month: i64,
    pub total_visitors: i64,
    pub unique_visitors_today: i64,
    pub top_pages: Vec<PageVisits>,
}

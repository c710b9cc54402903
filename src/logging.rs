//! Initialisation des logs et journalisation des requêtes HTTP.

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::Error;
use std::time::Instant;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialise le système de logs : JSON en production, format lisible sinon
pub fn init(is_production: bool, log_level: Option<&str>) {
    let level = log_level.unwrap_or(if is_production { "info" } else { "debug" });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("enno_site={},actix_web=info,sqlx=warn", level))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    // try_init : un second appel (tests) ne doit pas paniquer
    let result = if is_production {
        registry
            .with(fmt::layer().json().with_target(true).with_line_number(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).pretty())
            .try_init()
    };

    if result.is_ok() {
        tracing::info!(
            "Logs initialisés ({})",
            if is_production { "production" } else { "développement" }
        );
    }
}

/// Middleware : une ligne de log par requête avec statut et durée
pub async fn log_request(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let method = req.method().clone();
    let path = req.path().to_string();

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "requête reçue");

    let response = next.call(req).await?;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();

    if status.is_server_error() {
        tracing::error!(request_id = %request_id, method = %method, path = %path, status = %status, duration_ms, "requête terminée en erreur");
    } else if status.is_client_error() {
        tracing::warn!(request_id = %request_id, method = %method, path = %path, status = %status, duration_ms, "requête refusée");
    } else {
        tracing::info!(request_id = %request_id, method = %method, path = %path, status = %status, duration_ms, "requête terminée");
    }

    Ok(response)
}

mod app;
mod config;
mod db;
mod errors;
mod logging;
mod models;
mod routes;
mod store;
mod utils;

#[cfg(test)]
mod test_support;

use actix_web::HttpServer;
use anyhow::Context;
use std::sync::Arc;

use app::{build_app, AppState};
use config::Config;
use store::{MemoryStore, MySqlStore, SiteStore};
use utils::upload::ImageStorage;

/// Stockage MySQL si `DATABASE_URL` est défini, sinon stockage en mémoire
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn SiteStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_pool_max)
                .await
                .context("Impossible de se connecter à la base de données")?;
            db::run_migrations(&pool)
                .await
                .context("Échec des migrations")?;
            Ok(Arc::new(MySqlStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL absent : stockage en mémoire, les données seront perdues à l'arrêt");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Charger la configuration depuis .env
    let config = Config::from_env()
        .map_err(anyhow::Error::msg)
        .context("Erreur lors du chargement de la configuration")?;

    logging::init(config.is_production(), config.log_level.as_deref());

    let store = open_store(&config).await?;

    if let Some(seed) = &config.admin_seed {
        store::ensure_admin(store.as_ref(), seed)
            .await
            .context("Impossible de créer l'administrateur")?;
    }

    let images = ImageStorage::new(&config.upload_dir);
    tokio::fs::create_dir_all(images.dir())
        .await
        .with_context(|| format!("Répertoire d'images inaccessible : {}", images.dir().display()))?;

    let state = AppState {
        store,
        images,
        session_secret: config.session_secret.clone(),
        secure_cookies: config.is_production(),
        allowed_origin: config.allowed_origin.clone(),
    };

    let (host, port) = config.bind_address();
    tracing::info!("Démarrage du serveur sur http://{}:{}", host, port);

    // Démarrer le serveur Actix-web
    HttpServer::new(move || build_app(state.clone()))
        .bind((host.as_str(), port))?
        .run()
        .await?;

    Ok(())
}

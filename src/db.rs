use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;

/// Initialise une connexion à la base de données
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<MySqlPool, sqlx::Error> {
    tracing::info!("Connexion à la base de données...");

    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!("Pool de connexions MySQL initialisé");

    Ok(pool)
}

/// Tables du site ; les index uniques de `contents` ignorent les NULL,
/// ce qui fait de `page` et `section` des emplacements uniques quand ils sont renseignés
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS admins (
        id INT AUTO_INCREMENT PRIMARY KEY,
        email VARCHAR(255) NOT NULL,
        password VARCHAR(255) NOT NULL,
        name VARCHAR(255) NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE KEY admins_email_unique (email)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contents (
        id INT AUTO_INCREMENT PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        text TEXT NOT NULL,
        page VARCHAR(100) NULL,
        section VARCHAR(100) NULL,
        image VARCHAR(255) NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE KEY contents_page_unique (page),
        UNIQUE KEY contents_section_unique (section)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS services (
        id INT AUTO_INCREMENT PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        description TEXT NOT NULL,
        image_url VARCHAR(255) NULL,
        category VARCHAR(255) NULL,
        duration VARCHAR(255) NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS projets (
        id INT AUTO_INCREMENT PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        description TEXT NOT NULL,
        image VARCHAR(255) NULL,
        date DATE NOT NULL,
        client VARCHAR(255) NULL,
        status VARCHAR(16) NOT NULL DEFAULT 'active',
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contact_messages (
        id INT AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL,
        phone VARCHAR(64) NULL,
        subject VARCHAR(255) NULL,
        message TEXT NOT NULL,
        status VARCHAR(16) NOT NULL DEFAULT 'unread',
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS visitors (
        id INT AUTO_INCREMENT PRIMARY KEY,
        ip VARCHAR(64) NOT NULL,
        user_agent TEXT NULL,
        page VARCHAR(255) NOT NULL,
        referer VARCHAR(512) NULL,
        session_id VARCHAR(64) NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        KEY visitors_ip (ip),
        KEY visitors_page (page),
        KEY visitors_created_at (created_at),
        KEY visitors_session_id (session_id)
    )
    "#,
];

/// Crée les tables manquantes (idempotent)
pub async fn run_migrations(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    tracing::info!("Exécution des migrations...");
    for statement in MIGRATIONS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!("Migrations terminées");
    Ok(())
}

use std::env;
use std::path::PathBuf;
use dotenvy::dotenv;

/// Secret de session de développement, refusé en production
const DEV_SESSION_SECRET: &str = "enno-admin-secret-key-change-this-in-production-please";

/// Identifiants de l'administrateur créé au démarrage s'il n'existe pas
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
    pub password_hash: Option<String>,
}

/// Structure pour stocker la configuration de l'application
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub db_pool_max: u32,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub session_secret: String,
    pub upload_dir: PathBuf,
    pub allowed_origin: String,
    pub log_level: Option<String>,
    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    /// Charge les variables d'environnement et initialise la configuration
    pub fn from_env() -> Result<Self, String> {
        // Charge le fichier `.env`
        dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Construit la configuration à partir d'une source de variables quelconque
    pub fn from_vars<F>(var: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let environment = non_empty("ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let is_production = environment == "production";

        let session_secret = match non_empty("SESSION_SECRET") {
            Some(secret) => secret,
            None if is_production => {
                return Err("SESSION_SECRET doit être défini en production".to_string())
            }
            None => DEV_SESSION_SECRET.to_string(),
        };
        if session_secret.len() < 32 {
            return Err("SESSION_SECRET doit contenir au moins 32 caractères".to_string());
        }
        if is_production && session_secret == DEV_SESSION_SECRET {
            return Err("SESSION_SECRET par défaut refusé en production".to_string());
        }

        let port = match non_empty("PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| format!("PORT invalide : {}", port))?,
            None => 3000,
        };

        let db_pool_max = non_empty("DB_POOL_MAX")
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let admin_seed = non_empty("ADMIN_EMAIL").map(|email| AdminSeed {
            email,
            name: non_empty("ADMIN_NAME").unwrap_or_else(|| "Admin ENNO".to_string()),
            password: non_empty("ADMIN_PASSWORD"),
            password_hash: non_empty("ADMIN_HASH_PASSWORD"),
        });

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            db_pool_max,
            host: non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            environment,
            session_secret,
            upload_dir: non_empty("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public/images")),
            allowed_origin: non_empty("ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            log_level: non_empty("LOG_LEVEL"),
            admin_seed,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_in_development() {
        let config = config_from(&[]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.port, 3000);
        assert_eq!(config.upload_dir, PathBuf::from("public/images"));
        assert!(!config.is_production());
        assert!(config.admin_seed.is_none());
    }

    #[test]
    fn production_requires_its_own_session_secret() {
        assert!(config_from(&[("ENVIRONMENT", "production")]).is_err());
        assert!(config_from(&[
            ("ENVIRONMENT", "production"),
            ("SESSION_SECRET", DEV_SESSION_SECRET)
        ])
        .is_err());

        let config = config_from(&[
            ("ENVIRONMENT", "production"),
            ("SESSION_SECRET", "0123456789abcdef0123456789abcdef-prod"),
        ])
        .unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn short_secret_and_bad_port_are_rejected() {
        assert!(config_from(&[("SESSION_SECRET", "court")]).is_err());
        assert!(config_from(&[("PORT", "quatre-vingt")]).is_err());
    }

    #[test]
    fn admin_seed_is_read_when_email_is_set() {
        let config = config_from(&[
            ("ADMIN_EMAIL", "admin@enno.com"),
            ("ADMIN_PASSWORD", "motdepasse"),
        ])
        .unwrap();
        let seed = config.admin_seed.unwrap();
        assert_eq!(seed.email, "admin@enno.com");
        assert_eq!(seed.name, "Admin ENNO");
        assert_eq!(seed.password.as_deref(), Some("motdepasse"));
        assert!(seed.password_hash.is_none());
    }
}

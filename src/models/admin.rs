use serde::Deserialize;
use sqlx::FromRow;
use chrono::{DateTime, Utc};

/// Représente un administrateur dans la base de données
/// (pas de `Serialize` : le hachage ne doit jamais partir dans une réponse)
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: i32,
    pub email: String,
    pub password: String, // Hachage bcrypt, jamais le mot de passe en clair
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Administrateur à insérer, mot de passe déjà haché
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

/// Structure pour les requêtes de connexion
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

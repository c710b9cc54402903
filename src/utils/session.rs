//! Contenu de la session : identité de l'administrateur et identifiant visiteur.

use actix_session::config::PersistentSession;
use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionMiddleware};
use actix_web::cookie::time::Duration;
use actix_web::cookie::Key;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::admin::Admin;

pub const USER_KEY: &str = "user";
pub const VISITOR_SID_KEY: &str = "visitor_sid";

/// Nom du cookie de session
pub const COOKIE_NAME: &str = "enno_session";

const SESSION_TTL_HOURS: i64 = 24;

pub const ADMIN_ROLE: &str = "admin";

/// Identité authentifiée, figée à la connexion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: String,
}

impl AdminIdentity {
    pub fn from_admin(admin: &Admin) -> Self {
        Self {
            id: admin.id,
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: ADMIN_ROLE.to_string(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Identité stockée en session ; une valeur illisible compte comme absente
pub fn current_identity(session: &Session) -> Option<AdminIdentity> {
    match session.get::<AdminIdentity>(USER_KEY) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(error = %err, "identité de session illisible");
            None
        }
    }
}

/// Ouvre une session administrateur avec un nouvel identifiant de session
pub fn sign_in(session: &Session, identity: &AdminIdentity) -> Result<()> {
    session.renew();
    session.insert(USER_KEY, identity)?;
    Ok(())
}

/// Identifiant visiteur de la session, créé à la première visite
pub fn visitor_session_id(session: &Session) -> Result<String> {
    if let Some(sid) = session.get::<String>(VISITOR_SID_KEY)? {
        return Ok(sid);
    }
    let sid = Uuid::new_v4().to_string();
    session.insert(VISITOR_SID_KEY, &sid)?;
    Ok(sid)
}

/// Session par cookie signé et chiffré, valable 24 heures
pub fn session_middleware(secret: &str, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::derive_from(secret.as_bytes()))
        .cookie_name(COOKIE_NAME.to_string())
        .cookie_http_only(true)
        .cookie_secure(secure)
        .session_lifecycle(
            PersistentSession::default().session_ttl(Duration::hours(SESSION_TTL_HOURS)),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn identity_never_carries_the_password() {
        let admin = Admin {
            id: 7,
            email: "admin@enno.com".into(),
            password: "$2b$10$hash".into(),
            name: "Admin ENNO".into(),
            created_at: Utc::now(),
        };
        let identity = AdminIdentity::from_admin(&admin);
        assert!(identity.is_admin());

        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("hash"));
        assert!(json.contains("admin@enno.com"));
    }

    #[test]
    fn other_roles_are_not_admin() {
        let identity = AdminIdentity {
            id: 1,
            email: "x@enno.com".into(),
            name: "X".into(),
            role: "editor".into(),
        };
        assert!(!identity.is_admin());
    }
}

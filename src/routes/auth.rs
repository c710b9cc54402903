use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;

use crate::models::admin::LoginForm;
use crate::routes::{redirect, view};
use crate::store::SiteStore;
use crate::utils::admin_gate::LOGIN_PATH;
use crate::utils::session::{self, AdminIdentity};
use crate::utils::{flash, hash};

const LOGIN_TITLE: &str = "Connexion Admin - ENNO";

fn login_view(status: StatusCode, session: &Session, error: Option<&str>, email: &str) -> HttpResponse {
    view(
        status,
        LOGIN_TITLE,
        flash::take(session),
        json!({ "error": error, "email": email }),
    )
}

/// Formulaire de connexion ; un administrateur déjà connecté va au tableau de bord
#[get("/admin/login")]
async fn login_form(session: Session) -> impl Responder {
    if session::current_identity(&session).is_some() {
        return redirect("/admin");
    }
    login_view(StatusCode::OK, &session, None, "")
}

/// Route pour la connexion de l'administrateur
#[post("/admin/login")]
async fn login(
    store: web::Data<dyn SiteStore>,
    session: Session,
    form: web::Form<LoginForm>,
) -> impl Responder {
    let email = form.email.trim();

    // Rechercher l'administrateur par email
    let admin = match store.find_admin_by_email(email).await {
        Ok(admin) => admin,
        Err(err) => {
            tracing::error!(error = %err, "erreur lors de la récupération de l'administrateur");
            return login_view(
                StatusCode::INTERNAL_SERVER_ERROR,
                &session,
                Some("Une erreur est survenue"),
                email,
            );
        }
    };

    // Vérifier le mot de passe ; le message ne dit pas lequel des deux est faux
    let admin = match admin {
        Some(admin) if hash::verify_password(&form.password, &admin.password) => admin,
        _ => {
            tracing::warn!(email = %email, "échec de connexion");
            return login_view(
                StatusCode::UNAUTHORIZED,
                &session,
                Some("Identifiants incorrects"),
                email,
            );
        }
    };

    let identity = AdminIdentity::from_admin(&admin);
    if let Err(err) = session::sign_in(&session, &identity) {
        tracing::error!(error = %err, "impossible d'ouvrir la session");
        return login_view(
            StatusCode::INTERNAL_SERVER_ERROR,
            &session,
            Some("Une erreur est survenue"),
            email,
        );
    }

    tracing::info!(admin_id = admin.id, "administrateur connecté");
    redirect("/admin")
}

/// Détruit la session
#[get("/admin/logout")]
async fn logout(session: Session) -> impl Responder {
    session.purge();
    redirect(LOGIN_PATH)
}

/// Configuration des routes d'authentification
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(login_form);
    cfg.service(login);
    cfg.service(logout);
}

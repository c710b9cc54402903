pub mod admin;
pub mod auth;
pub mod contents;
pub mod images;
pub mod messages;
pub mod projets;
pub mod public;
pub mod services;

use actix_session::Session;
use actix_web::http::{header, StatusCode, Uri};
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::utils::admin_gate::AdminGate;
use crate::utils::flash::{self, FlashMessages};

/// Réponse de redirection 302
pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Chemin de la page précédente (Referer du même hôte), sinon `fallback`
pub fn back_location(req: &HttpRequest, fallback: &str) -> String {
    let referer = req
        .headers()
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Uri>().ok());

    let Some(uri) = referer else {
        return fallback.to_string();
    };

    let same_host = match uri.authority() {
        Some(authority) => authority.as_str() == req.connection_info().host(),
        None => true,
    };

    match uri.path_and_query() {
        Some(path) if same_host && path.as_str().starts_with('/') => path.as_str().to_string(),
        _ => fallback.to_string(),
    }
}

pub fn redirect_back(req: &HttpRequest, fallback: &str) -> HttpResponse {
    redirect(&back_location(req, fallback))
}

/// Échec d'un formulaire : message flash puis retour à la page précédente
pub fn fail_back(req: &HttpRequest, session: &Session, err: &AppError, fallback: &str) -> HttpResponse {
    if err.is_internal() {
        tracing::error!(path = %req.path(), error = %err, "échec du formulaire");
    }
    flash::error(session, err.public_message());
    redirect_back(req, fallback)
}

/// Page 404 du back-office, avec retour vers la liste
pub fn admin_not_found(session: &Session, resource: &'static str, back: &str) -> HttpResponse {
    view(
        StatusCode::NOT_FOUND,
        "Page non trouvée",
        flash::take(session),
        json!({ "error": AppError::NotFound(resource).to_string(), "back": back }),
    )
}

/// Modèle de vue JSON : `title`, `messages` et les champs propres à la page
pub fn view(status: StatusCode, title: &str, flash: FlashMessages, fields: Value) -> HttpResponse {
    let mut body = json!({ "title": title, "messages": flash });
    if let (Some(body), Value::Object(fields)) = (body.as_object_mut(), fields) {
        body.extend(fields);
    }
    HttpResponse::build(status).json(body)
}

/// Corps des suppressions : `{success: true}` ou 404 `{success: false}`
pub fn deletion(result: Result<bool, AppError>, resource: &'static str) -> HttpResponse {
    match result {
        Ok(true) => HttpResponse::Ok().json(json!({ "success": true })),
        Ok(false) => HttpResponse::NotFound().json(json!({
            "success": false,
            "error": AppError::NotFound(resource).to_string(),
        })),
        Err(err) => {
            tracing::error!(resource, error = %err, "suppression en échec");
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": err.public_message(),
            }))
        }
    }
}

/// Page 404 pour toute route inconnue
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    view(
        StatusCode::NOT_FOUND,
        "Page non trouvée",
        FlashMessages::default(),
        json!({ "path": req.path() }),
    )
}

/// Configuration de toutes les routes du site
pub fn config(cfg: &mut web::ServiceConfig) {
    // La connexion reste hors du périmètre protégé
    cfg.configure(auth::config);
    cfg.service(
        web::scope("/admin")
            .wrap(AdminGate)
            .configure(admin::config)
            .configure(services::config)
            .configure(messages::config)
            .configure(contents::config)
            .configure(projets::config)
            .configure(images::config),
    );
    cfg.configure(public::config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn back_location_follows_same_host_referer() {
        let req = TestRequest::default()
            .insert_header((header::HOST, "localhost:3000"))
            .insert_header((header::REFERER, "http://localhost:3000/admin/services/new?x=1"))
            .to_http_request();
        assert_eq!(back_location(&req, "/admin/services"), "/admin/services/new?x=1");
    }

    #[test]
    fn back_location_ignores_foreign_or_missing_referer() {
        let foreign = TestRequest::default()
            .insert_header((header::HOST, "localhost:3000"))
            .insert_header((header::REFERER, "https://evil.example/phish"))
            .to_http_request();
        assert_eq!(back_location(&foreign, "/admin/services"), "/admin/services");

        let missing = TestRequest::default().to_http_request();
        assert_eq!(back_location(&missing, "/admin"), "/admin");
    }

    #[test]
    fn view_merges_page_fields() {
        let res = view(
            StatusCode::OK,
            "Accueil",
            FlashMessages::default(),
            json!({ "services": [] }),
        );
        assert_eq!(res.status(), StatusCode::OK);
    }
}

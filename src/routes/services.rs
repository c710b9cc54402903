use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{delete, get, post, route, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;

use crate::models::service::ServiceForm;
use crate::routes::{admin_not_found, deletion, fail_back, redirect, view};
use crate::store::SiteStore;
use crate::utils::flash;
use crate::utils::session::AdminIdentity;

const LIST: &str = "/admin/services";

/// Liste des services, les plus récents d'abord
#[get("/services")]
async fn list_services(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
) -> impl Responder {
    match store.list_services().await {
        Ok(services) => view(
            StatusCode::OK,
            "Gestion des services",
            flash::take(&session),
            json!({ "admin": user.into_inner(), "services": services }),
        ),
        Err(err) => {
            tracing::error!(error = %err, "erreur lors de la récupération des services");
            view(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Gestion des services",
                flash::take(&session),
                json!({
                    "admin": user.into_inner(),
                    "services": [],
                    "error": "Erreur lors du chargement des services",
                }),
            )
        }
    }
}

#[get("/services/new")]
async fn new_service_form(session: Session, user: web::ReqData<AdminIdentity>) -> impl Responder {
    view(
        StatusCode::OK,
        "Nouveau service",
        flash::take(&session),
        json!({ "admin": user.into_inner(), "service": null }),
    )
}

#[post("/services")]
async fn create_service(
    req: HttpRequest,
    store: web::Data<dyn SiteStore>,
    session: Session,
    form: web::Form<ServiceForm>,
) -> HttpResponse {
    let result = match form.validate() {
        Ok(input) => store.insert_service(input).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(service) => {
            tracing::info!(service_id = service.id, "service créé");
            flash::success(&session, "Service créé avec succès");
            redirect(LIST)
        }
        Err(err) => fail_back(&req, &session, &err, LIST),
    }
}

#[get("/services/{id}/edit")]
async fn edit_service_form(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
    path: web::Path<i32>,
) -> HttpResponse {
    match store.find_service(path.into_inner()).await {
        Ok(Some(service)) => view(
            StatusCode::OK,
            "Modifier le service",
            flash::take(&session),
            json!({ "admin": user.into_inner(), "service": service }),
        ),
        Ok(None) => admin_not_found(&session, "Service", LIST),
        Err(err) => {
            tracing::error!(error = %err, "erreur lors du chargement du service");
            flash::error(&session, "Erreur lors du chargement du service");
            redirect(LIST)
        }
    }
}

#[route("/services/{id}", method = "POST", method = "PUT")]
async fn update_service(
    req: HttpRequest,
    store: web::Data<dyn SiteStore>,
    session: Session,
    path: web::Path<i32>,
    form: web::Form<ServiceForm>,
) -> HttpResponse {
    let id = path.into_inner();
    let result = match form.validate() {
        Ok(input) => store.update_service(id, input).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(Some(_)) => {
            flash::success(&session, "Service mis à jour avec succès");
            redirect(LIST)
        }
        Ok(None) => {
            flash::error(&session, "Service non trouvé");
            redirect(LIST)
        }
        Err(err) => fail_back(&req, &session, &err, LIST),
    }
}

#[delete("/services/{id}")]
async fn delete_service(store: web::Data<dyn SiteStore>, path: web::Path<i32>) -> HttpResponse {
    deletion(store.delete_service(path.into_inner()).await, "Service")
}

/// Configuration des routes de gestion des services
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(list_services);
    cfg.service(new_service_form);
    cfg.service(create_service);
    cfg.service(edit_service_form);
    cfg.service(update_service);
    cfg.service(delete_service);
}

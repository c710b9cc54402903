use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;

use crate::models::message::StatusForm;
use crate::routes::{admin_not_found, deletion, fail_back, redirect, view};
use crate::store::SiteStore;
use crate::utils::flash;
use crate::utils::session::AdminIdentity;

const LIST: &str = "/admin/messages";

#[get("/messages")]
async fn list_messages(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
) -> impl Responder {
    let (status, messages, error) = match store.list_messages(None).await {
        Ok(messages) => (StatusCode::OK, messages, None),
        Err(err) => {
            tracing::error!(error = %err, "erreur lors du chargement des messages");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Vec::new(),
                Some("Erreur lors du chargement des messages"),
            )
        }
    };

    view(
        status,
        "Messages",
        flash::take(&session),
        json!({ "admin": user.into_inner(), "contactMessages": messages, "error": error }),
    )
}

/// Affiche un message ; un message non lu passe au statut `read`
#[get("/messages/{id}")]
async fn view_message(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
    path: web::Path<i32>,
) -> HttpResponse {
    match store.open_message(path.into_inner()).await {
        Ok(Some(message)) => view(
            StatusCode::OK,
            "Message",
            flash::take(&session),
            json!({ "admin": user.into_inner(), "message": message }),
        ),
        Ok(None) => admin_not_found(&session, "Message", LIST),
        Err(err) => {
            tracing::error!(error = %err, "erreur lors de l'ouverture du message");
            flash::error(&session, "Erreur lors du chargement du message");
            redirect(LIST)
        }
    }
}

/// Change le statut d'un message ; toute valeur connue est acceptée
#[post("/messages/{id}/status")]
async fn update_message_status(
    req: HttpRequest,
    store: web::Data<dyn SiteStore>,
    session: Session,
    path: web::Path<i32>,
    form: web::Form<StatusForm>,
) -> HttpResponse {
    let id = path.into_inner();
    let result = match form.validate() {
        Ok(status) => store.set_message_status(id, status).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(true) => {
            flash::success(&session, "Statut du message mis à jour");
            redirect(LIST)
        }
        Ok(false) => {
            flash::error(&session, "Message non trouvé");
            redirect(LIST)
        }
        Err(err) => fail_back(&req, &session, &err, LIST),
    }
}

#[delete("/messages/{id}")]
async fn delete_message(store: web::Data<dyn SiteStore>, path: web::Path<i32>) -> HttpResponse {
    deletion(store.delete_message(path.into_inner()).await, "Message")
}

/// Configuration des routes de gestion des messages
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(list_messages);
    cfg.service(view_message);
    cfg.service(update_message_status);
    cfg.service(delete_message);
}

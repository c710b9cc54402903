use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;

use crate::models::content::{PageContent, PageSlot, ABOUT_SLOT, HOME_SLOT, SERVICES_SLOT};
use crate::models::message::ContactForm;
use crate::models::service::Service;
use crate::routes::{redirect, view};
use crate::store::SiteStore;
use crate::utils::flash;

/// Nombre de projets renvoyés par l'API publique
const LATEST_PROJETS: i64 = 6;

/// Contenu d'une page publique ; toute erreur retombe sur le texte par défaut
async fn page_content(store: &dyn SiteStore, slot: &PageSlot) -> PageContent {
    let content = store.find_content_by_page(slot.page).await.unwrap_or_else(|err| {
        tracing::error!(page = slot.page, error = %err, "contenu indisponible");
        None
    });
    slot.resolve(content)
}

async fn all_services(store: &dyn SiteStore) -> Vec<Service> {
    store.list_services().await.unwrap_or_else(|err| {
        tracing::error!(error = %err, "services indisponibles");
        Vec::new()
    })
}

/// Page d'accueil
#[get("/")]
async fn home(store: web::Data<dyn SiteStore>, session: Session) -> impl Responder {
    let services = all_services(store.get_ref()).await;
    let content = page_content(store.get_ref(), &HOME_SLOT).await;
    view(
        StatusCode::OK,
        "ENNO - Solutions Énergétiques",
        flash::take(&session),
        json!({ "services": services, "content": content }),
    )
}

/// Page services
#[get("/services")]
async fn services_page(store: web::Data<dyn SiteStore>, session: Session) -> impl Responder {
    let services = all_services(store.get_ref()).await;
    let content = page_content(store.get_ref(), &SERVICES_SLOT).await;
    view(
        StatusCode::OK,
        "Nos services - ENNO",
        flash::take(&session),
        json!({ "services": services, "content": content }),
    )
}

/// Page à propos
#[get("/about")]
async fn about(store: web::Data<dyn SiteStore>, session: Session) -> impl Responder {
    let content = page_content(store.get_ref(), &ABOUT_SLOT).await;
    view(
        StatusCode::OK,
        "À propos - ENNO",
        flash::take(&session),
        json!({ "content": content }),
    )
}

/// Page contact
#[get("/contact")]
async fn contact(session: Session) -> impl Responder {
    view(StatusCode::OK, "Contact - ENNO", flash::take(&session), json!({}))
}

/// Traitement du formulaire de contact
#[post("/contact")]
async fn send_contact(
    store: web::Data<dyn SiteStore>,
    session: Session,
    form: web::Form<ContactForm>,
) -> HttpResponse {
    let message = match form.validate() {
        Ok(message) => message,
        Err(err) => {
            flash::error(&session, err.public_message());
            return redirect("/contact");
        }
    };

    match store.insert_message(message).await {
        Ok(saved) => {
            tracing::info!(message_id = saved.id, "message de contact enregistré");
            flash::success(
                &session,
                "Votre message a été envoyé avec succès. Nous vous répondrons dans les plus brefs délais.",
            );
        }
        Err(err) => {
            tracing::error!(error = %err, "erreur lors de l'enregistrement du message");
            flash::error(
                &session,
                "Une erreur est survenue lors de l'envoi de votre message. Veuillez réessayer.",
            );
        }
    }
    redirect("/contact")
}

/// Les derniers projets, par date décroissante ; `[]` en cas d'erreur
#[get("/api/projets")]
async fn latest_projets(store: web::Data<dyn SiteStore>) -> impl Responder {
    match store.list_projets(Some(LATEST_PROJETS)).await {
        Ok(projets) => HttpResponse::Ok().json(projets),
        Err(err) => {
            tracing::error!(error = %err, "erreur lors de la récupération des projets");
            HttpResponse::Ok().json(json!([]))
        }
    }
}

/// Configuration des routes publiques
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(home);
    cfg.service(services_page);
    cfg.service(about);
    cfg.service(contact);
    cfg.service(send_contact);
    cfg.service(latest_projets);
}

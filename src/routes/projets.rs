use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{delete, get, post, route, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;

use crate::errors::Result;
use crate::models::projet::{ProjetForm, ProjetInput};
use crate::routes::{admin_not_found, deletion, fail_back, redirect, view};
use crate::store::SiteStore;
use crate::utils::flash;
use crate::utils::session::AdminIdentity;
use crate::utils::upload::ImageStorage;

const LIST: &str = "/admin/projets";
const IMAGE_PREFIX: &str = "projet";

#[derive(Debug, MultipartForm)]
pub struct ProjetUpload {
    title: Option<Text<String>>,
    description: Option<Text<String>>,
    date: Option<Text<String>>,
    client: Option<Text<String>>,
    status: Option<Text<String>>,
    #[multipart(limit = "5 MiB")]
    image: Option<TempFile>,
}

impl ProjetUpload {
    async fn input(&self, images: &ImageStorage) -> Result<ProjetInput> {
        let text = |field: &Option<Text<String>>| field.as_ref().map(|t| t.0.clone());
        let form = ProjetForm {
            title: text(&self.title),
            description: text(&self.description),
            date: text(&self.date),
            client: text(&self.client),
            status: text(&self.status),
        };

        let mut input = form.validate()?;
        input.image = images.save_optional(IMAGE_PREFIX, self.image.as_ref()).await?;
        Ok(input)
    }
}

/// Liste des projets, du plus récent au plus ancien
#[get("/projets")]
async fn list_projets(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
) -> impl Responder {
    match store.list_projets(None).await {
        Ok(projets) => view(
            StatusCode::OK,
            "Gestion des projets",
            flash::take(&session),
            json!({ "admin": user.into_inner(), "projets": projets }),
        ),
        Err(err) => {
            tracing::error!(error = %err, "erreur lors du chargement des projets");
            flash::error(&session, "Erreur lors du chargement des projets");
            redirect("/admin")
        }
    }
}

#[get("/projets/new")]
async fn new_projet_form(session: Session, user: web::ReqData<AdminIdentity>) -> impl Responder {
    view(
        StatusCode::OK,
        "Nouveau projet",
        flash::take(&session),
        json!({ "admin": user.into_inner(), "projet": null }),
    )
}

#[post("/projets")]
async fn create_projet(
    req: HttpRequest,
    store: web::Data<dyn SiteStore>,
    images: web::Data<ImageStorage>,
    session: Session,
    MultipartForm(upload): MultipartForm<ProjetUpload>,
) -> HttpResponse {
    let input = match upload.input(&images).await {
        Ok(input) => input,
        Err(err) => return fail_back(&req, &session, &err, LIST),
    };
    let image = input.image.clone();

    match store.insert_projet(input).await {
        Ok(projet) => {
            tracing::info!(projet_id = projet.id, "projet créé");
            flash::success(&session, "Projet ajouté avec succès");
            redirect(LIST)
        }
        Err(err) => {
            images.discard(image.as_deref()).await;
            fail_back(&req, &session, &err, LIST)
        }
    }
}

#[get("/projets/{id}/edit")]
async fn edit_projet_form(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
    path: web::Path<i32>,
) -> HttpResponse {
    match store.find_projet(path.into_inner()).await {
        Ok(Some(projet)) => view(
            StatusCode::OK,
            "Modifier le projet",
            flash::take(&session),
            json!({ "admin": user.into_inner(), "projet": projet }),
        ),
        Ok(None) => admin_not_found(&session, "Projet", LIST),
        Err(err) => {
            tracing::error!(error = %err, "erreur lors du chargement du projet");
            flash::error(&session, "Erreur lors du chargement du projet");
            redirect(LIST)
        }
    }
}

#[route("/projets/{id}", method = "POST", method = "PUT")]
async fn update_projet(
    req: HttpRequest,
    store: web::Data<dyn SiteStore>,
    images: web::Data<ImageStorage>,
    session: Session,
    path: web::Path<i32>,
    MultipartForm(upload): MultipartForm<ProjetUpload>,
) -> HttpResponse {
    let id = path.into_inner();
    let input = match upload.input(&images).await {
        Ok(input) => input,
        Err(err) => return fail_back(&req, &session, &err, LIST),
    };
    let image = input.image.clone();

    let result = store.update_projet(id, input).await;
    if !matches!(result, Ok(Some(_))) {
        images.discard(image.as_deref()).await;
    }

    match result {
        Ok(Some(_)) => {
            flash::success(&session, "Projet modifié avec succès");
            redirect(LIST)
        }
        Ok(None) => {
            flash::error(&session, "Projet non trouvé");
            redirect(LIST)
        }
        Err(err) => fail_back(&req, &session, &err, LIST),
    }
}

#[delete("/projets/{id}")]
async fn delete_projet(store: web::Data<dyn SiteStore>, path: web::Path<i32>) -> HttpResponse {
    deletion(store.delete_projet(path.into_inner()).await, "Projet")
}

/// Configuration des routes de gestion des projets
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(list_projets);
    cfg.service(new_projet_form);
    cfg.service(create_projet);
    cfg.service(edit_projet_form);
    cfg.service(update_projet);
    cfg.service(delete_projet);
}

use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::text::Text;
use actix_multipart::form::MultipartForm;
use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{delete, get, post, route, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;

use crate::errors::{AppError, Result};
use crate::models::content::{page_slot, ContentForm, ContentInput};
use crate::routes::{admin_not_found, deletion, fail_back, redirect, view};
use crate::store::SiteStore;
use crate::utils::flash;
use crate::utils::session::AdminIdentity;
use crate::utils::upload::ImageStorage;

const LIST: &str = "/admin/contents";
const IMAGE_PREFIX: &str = "content";

/// Formulaire multipart d'un contenu, image facultative
#[derive(Debug, MultipartForm)]
pub struct ContentUpload {
    title: Option<Text<String>>,
    text: Option<Text<String>>,
    page: Option<Text<String>>,
    section: Option<Text<String>>,
    #[multipart(limit = "5 MiB")]
    image: Option<TempFile>,
}

fn text(field: &Option<Text<String>>) -> Option<String> {
    field.as_ref().map(|t| t.0.clone())
}

impl ContentUpload {
    fn form(&self) -> ContentForm {
        ContentForm {
            title: text(&self.title),
            text: text(&self.text),
            page: text(&self.page),
            section: text(&self.section),
        }
    }

    /// Valide les champs puis enregistre l'image si une nouvelle a été choisie
    async fn input(&self, images: &ImageStorage) -> Result<ContentInput> {
        let mut input = self.form().validate()?;
        input.image = images.save_optional(IMAGE_PREFIX, self.image.as_ref()).await?;
        Ok(input)
    }
}

#[get("/contents")]
async fn list_contents(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
) -> impl Responder {
    match store.list_contents().await {
        Ok(contents) => view(
            StatusCode::OK,
            "Gestion des contenus",
            flash::take(&session),
            json!({ "admin": user.into_inner(), "contents": contents }),
        ),
        Err(err) => {
            tracing::error!(error = %err, "erreur lors de la récupération des contenus");
            view(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Gestion des contenus",
                flash::take(&session),
                json!({
                    "admin": user.into_inner(),
                    "contents": [],
                    "error": "Erreur lors de la récupération des contenus",
                }),
            )
        }
    }
}

#[get("/contents/new")]
async fn new_content_form(session: Session, user: web::ReqData<AdminIdentity>) -> impl Responder {
    view(
        StatusCode::OK,
        "Nouveau contenu",
        flash::take(&session),
        json!({ "admin": user.into_inner(), "content": null }),
    )
}

#[post("/contents")]
async fn create_content(
    req: HttpRequest,
    store: web::Data<dyn SiteStore>,
    images: web::Data<ImageStorage>,
    session: Session,
    MultipartForm(upload): MultipartForm<ContentUpload>,
) -> HttpResponse {
    let input = match upload.input(&images).await {
        Ok(input) => input,
        Err(err) => return fail_back(&req, &session, &err, LIST),
    };
    let image = input.image.clone();

    match store.insert_content(input).await {
        Ok(content) => {
            tracing::info!(content_id = content.id, "contenu créé");
            flash::success(&session, "Contenu créé avec succès");
            redirect(LIST)
        }
        Err(err) => {
            images.discard(image.as_deref()).await;
            fail_back(&req, &session, &err, LIST)
        }
    }
}

#[get("/contents/{id}/edit")]
async fn edit_content_form(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
    path: web::Path<i32>,
) -> HttpResponse {
    match store.find_content(path.into_inner()).await {
        Ok(Some(content)) => view(
            StatusCode::OK,
            "Modifier le contenu",
            flash::take(&session),
            json!({ "admin": user.into_inner(), "content": content }),
        ),
        Ok(None) => admin_not_found(&session, "Contenu", LIST),
        Err(err) => {
            tracing::error!(error = %err, "erreur lors du chargement du contenu");
            flash::error(&session, "Erreur lors du chargement du contenu");
            redirect(LIST)
        }
    }
}

#[route("/contents/{id}", method = "POST", method = "PUT")]
async fn update_content(
    req: HttpRequest,
    store: web::Data<dyn SiteStore>,
    images: web::Data<ImageStorage>,
    session: Session,
    path: web::Path<i32>,
    MultipartForm(upload): MultipartForm<ContentUpload>,
) -> HttpResponse {
    let id = path.into_inner();
    let input = match upload.input(&images).await {
        Ok(input) => input,
        Err(err) => return fail_back(&req, &session, &err, LIST),
    };
    let image = input.image.clone();

    let result = store.update_content(id, input).await;
    if !matches!(result, Ok(Some(_))) {
        images.discard(image.as_deref()).await;
    }

    match result {
        Ok(Some(_)) => {
            flash::success(&session, "Contenu mis à jour avec succès");
            redirect(LIST)
        }
        Ok(None) => {
            flash::error(&session, "Contenu non trouvé");
            redirect(LIST)
        }
        Err(AppError::DuplicateSlot) => {
            flash::error(&session, "Un autre contenu avec cette page ou section existe déjà");
            crate::routes::redirect_back(&req, LIST)
        }
        Err(err) => fail_back(&req, &session, &err, LIST),
    }
}

#[delete("/contents/{id}")]
async fn delete_content(store: web::Data<dyn SiteStore>, path: web::Path<i32>) -> HttpResponse {
    deletion(store.delete_content(path.into_inner()).await, "Contenu")
}

/// Éditeur du contenu d'une page publique
#[get("/pages/{page}")]
async fn edit_page_content(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
    path: web::Path<String>,
) -> HttpResponse {
    let Some(slot) = page_slot(&path) else {
        return admin_not_found(&session, "Page", LIST);
    };

    let content = store.find_content_by_page(slot.page).await.unwrap_or_else(|err| {
        tracing::error!(page = slot.page, error = %err, "contenu de page indisponible");
        None
    });

    view(
        StatusCode::OK,
        &format!("Gestion - {}", slot.page),
        flash::take(&session),
        json!({ "admin": user.into_inner(), "page": slot.page, "content": content }),
    )
}

/// Crée ou met à jour le contenu de la page ; l'image n'est remplacée que si une nouvelle est envoyée
#[post("/pages/{page}")]
async fn update_page_content(
    store: web::Data<dyn SiteStore>,
    images: web::Data<ImageStorage>,
    session: Session,
    path: web::Path<String>,
    MultipartForm(upload): MultipartForm<ContentUpload>,
) -> HttpResponse {
    let Some(slot) = page_slot(&path) else {
        return admin_not_found(&session, "Page", LIST);
    };
    let back = format!("/admin/pages/{}", slot.page);

    let form = ContentForm {
        page: None,
        section: None,
        ..upload.form()
    };
    let result = match form.validate() {
        Ok(mut input) => match images.save_optional(IMAGE_PREFIX, upload.image.as_ref()).await {
            Ok(image) => {
                input.image = image.clone();
                let saved = store.upsert_page_content(slot.page, input).await;
                if saved.is_err() {
                    images.discard(image.as_deref()).await;
                }
                saved
            }
            Err(err) => Err(err),
        },
        Err(err) => Err(err),
    };

    match result {
        Ok(_) => flash::success(&session, "Contenu mis à jour avec succès"),
        Err(err) => {
            if err.is_internal() {
                tracing::error!(page = slot.page, error = %err, "mise à jour de page en échec");
            }
            flash::error(&session, err.public_message());
        }
    }
    redirect(&back)
}

/// Configuration des routes de gestion des contenus
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(list_contents);
    cfg.service(new_content_form);
    cfg.service(create_content);
    cfg.service(edit_content_form);
    cfg.service(update_content);
    cfg.service(delete_content);
    cfg.service(edit_page_content);
    cfg.service(update_page_content);
}

#[cfg(test)]
mod tests {
    use crate::models::content::ContentInput;
    use crate::store::SiteStore;
    use crate::test_support::{login, multipart, session_cookie, test_app, FilePart};
    use actix_web::http::{header, StatusCode};
    use actix_web::test;

    fn slot(title: &str, page: Option<&str>) -> ContentInput {
        ContentInput {
            title: title.into(),
            text: "Texte".into(),
            page: page.map(str::to_string),
            section: None,
            image: None,
        }
    }

    #[actix_web::test]
    async fn duplicate_page_is_refused_with_a_flash() {
        let (app, ctx) = test_app!();
        ctx.store.insert_content(slot("Accueil", Some("accueil"))).await.unwrap();
        let cookie = login!(app);

        let (content_type, body) =
            multipart(&[("title", "Autre"), ("text", "Texte"), ("page", "accueil")], None);
        let req = test::TestRequest::post()
            .uri("/admin/contents")
            .cookie(cookie.clone())
            .insert_header((header::CONTENT_TYPE, content_type))
            .insert_header((header::REFERER, "/admin/contents/new"))
            .set_payload(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/admin/contents/new");
        let cookie = session_cookie(&res).unwrap_or(cookie);
        assert_eq!(ctx.store.list_contents().await.unwrap().len(), 1);

        let req = test::TestRequest::get()
            .uri("/admin/contents/new")
            .cookie(cookie)
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body["messages"]["error"][0],
            "Un contenu avec cette page ou section existe déjà"
        );
    }

    #[actix_web::test]
    async fn refused_duplicate_leaves_no_image_behind() {
        let (app, ctx) = test_app!();
        ctx.store.insert_content(slot("Accueil", Some("accueil"))).await.unwrap();
        let cookie = login!(app);

        let (content_type, body) = multipart(
            &[("title", "Autre"), ("text", "Texte"), ("page", "accueil")],
            Some(FilePart {
                field: "image",
                filename: "x.png",
                mime: "image/png",
                data: b"\x89PNG image",
            }),
        );
        let req = test::TestRequest::post()
            .uri("/admin/contents")
            .cookie(cookie.clone())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(ctx.store.list_contents().await.unwrap().len(), 1);
        assert!(ctx.images.list().await.unwrap().is_empty());

        let (content_type, body) = multipart(
            &[("title", "Fantôme"), ("text", "Texte")],
            Some(FilePart {
                field: "image",
                filename: "y.png",
                mime: "image/png",
                data: b"\x89PNG image",
            }),
        );
        let req = test::TestRequest::put()
            .uri("/admin/contents/999")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        test::call_service(&app, req).await;
        assert!(ctx.images.list().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn created_content_keeps_its_image_on_text_only_update() {
        let (app, ctx) = test_app!();
        let cookie = login!(app);

        let (content_type, body) = multipart(
            &[("title", "Mission"), ("text", "Texte"), ("section", "mission")],
            Some(FilePart {
                field: "image",
                filename: "mission.png",
                mime: "image/png",
                data: b"\x89PNG image",
            }),
        );
        let req = test::TestRequest::post()
            .uri("/admin/contents")
            .cookie(cookie.clone())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/admin/contents");

        let created = ctx.store.list_contents().await.unwrap().remove(0);
        let image = created.image.clone().unwrap();
        assert!(image.starts_with("/images/content-"));

        let (content_type, body) = multipart(
            &[("title", "Notre mission"), ("text", "Texte"), ("section", "mission")],
            Some(FilePart {
                field: "image",
                filename: "",
                mime: "application/octet-stream",
                data: b"",
            }),
        );
        let req = test::TestRequest::put()
            .uri(&format!("/admin/contents/{}", created.id))
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        test::call_service(&app, req).await;

        let updated = ctx.store.find_content(created.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "Notre mission");
        assert_eq!(updated.image.as_deref(), Some(image.as_str()));
    }

    #[actix_web::test]
    async fn non_image_upload_is_rejected_before_saving() {
        let (app, ctx) = test_app!();
        let cookie = login!(app);

        let (content_type, body) = multipart(
            &[("title", "Mission"), ("text", "Texte")],
            Some(FilePart {
                field: "image",
                filename: "payload.html",
                mime: "text/html",
                data: b"<script></script>",
            }),
        );
        let req = test::TestRequest::post()
            .uri("/admin/contents")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert!(ctx.store.list_contents().await.unwrap().is_empty());
        assert!(ctx.images.list().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn page_editor_upserts_the_slot() {
        let (app, ctx) = test_app!();
        let cookie = login!(app);

        for title in ["Bienvenue", "Bienvenue chez ENNO"] {
            let (content_type, body) = multipart(&[("title", title), ("text", "Texte")], None);
            let req = test::TestRequest::post()
                .uri("/admin/pages/accueil")
                .cookie(cookie.clone())
                .insert_header((header::CONTENT_TYPE, content_type))
                .set_payload(body)
                .to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/admin/pages/accueil");
        }

        let contents = ctx.store.list_contents().await.unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].title, "Bienvenue chez ENNO");
        assert_eq!(contents[0].page.as_deref(), Some("accueil"));

        let req = test::TestRequest::get()
            .uri("/admin/pages/inconnue")
            .cookie(cookie)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn deleting_content_removes_exactly_that_row() {
        let (app, ctx) = test_app!();
        let keep = ctx.store.insert_content(slot("A", Some("accueil"))).await.unwrap();
        let gone = ctx.store.insert_content(slot("B", Some("apropos"))).await.unwrap();
        let cookie = login!(app);

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/contents/{}", gone.id))
            .cookie(cookie)
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);

        assert!(ctx.store.find_content(keep.id).await.unwrap().is_some());
        assert!(ctx.store.find_content(gone.id).await.unwrap().is_none());
    }
}

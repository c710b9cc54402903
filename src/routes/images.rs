use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::MultipartForm;
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use serde::Serialize;
use serde_json::json;

use crate::errors::{AppError, Result};
use crate::utils::upload::{self, ImageStorage};

const IMAGE_PREFIX: &str = "image";

#[derive(Debug, MultipartForm)]
pub struct ImagesUpload {
    #[multipart(limit = "5 MiB")]
    images: Vec<TempFile>,
}

#[derive(Debug, Serialize)]
struct UploadedFile {
    filename: String,
    url: String,
}

/// Images de la médiathèque ; liste vide si le répertoire est illisible
#[get("/images")]
async fn list_images(images: web::Data<ImageStorage>) -> impl Responder {
    match images.list().await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(err) => {
            tracing::error!(error = %err, "erreur lors de la lecture des images");
            HttpResponse::Ok().json(Vec::<upload::ImageInfo>::new())
        }
    }
}

/// Envoi d'une ou plusieurs images ; un seul fichier refusé et rien n'est écrit
#[post("/images/upload")]
async fn upload_images(
    images: web::Data<ImageStorage>,
    MultipartForm(form): MultipartForm<ImagesUpload>,
) -> Result<HttpResponse> {
    let files: Vec<&TempFile> = form.images.iter().filter(|f| upload::is_supplied(f)).collect();
    if files.is_empty() {
        return Err(AppError::Upload("Aucun fichier envoyé".to_string()));
    }

    let checked = files
        .into_iter()
        .map(|file| {
            let mime = file.content_type.as_ref().map(|m| m.essence_str());
            upload::validate_upload(file.file_name.as_deref(), mime, file.size).map(|ext| (file, ext))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut uploaded = Vec::with_capacity(checked.len());
    for (file, ext) in checked {
        let url = images.persist(IMAGE_PREFIX, file.file.path(), ext).await?;
        let filename = url.rsplit('/').next().unwrap_or_default().to_string();
        uploaded.push(UploadedFile { filename, url });
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Images uploadées avec succès",
        "files": uploaded,
    })))
}

#[delete("/images/{filename}")]
async fn delete_image(
    images: web::Data<ImageStorage>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    images.delete(&path).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Image supprimée avec succès",
    })))
}

/// Configuration des routes de la médiathèque
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(list_images);
    cfg.service(upload_images);
    cfg.service(delete_image);
}

#[cfg(test)]
mod tests {
    use crate::test_support::{login, multipart, multipart_files, test_app, FilePart};
    use actix_web::http::{header, StatusCode};
    use actix_web::test;

    #[actix_web::test]
    async fn upload_list_and_delete_an_image() {
        let (app, _ctx) = test_app!();
        let cookie = login!(app);

        let (content_type, body) = multipart(
            &[],
            Some(FilePart {
                field: "images",
                filename: "logo.webp",
                mime: "image/webp",
                data: b"RIFF....WEBP",
            }),
        );
        let req = test::TestRequest::post()
            .uri("/admin/images/upload")
            .cookie(cookie.clone())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        let filename = body["files"][0]["filename"].as_str().unwrap().to_string();
        assert!(filename.starts_with("image-") && filename.ends_with(".webp"));

        let req = test::TestRequest::get()
            .uri("/admin/images")
            .cookie(cookie.clone())
            .to_request();
        let list: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list[0]["filename"], filename.as_str());

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/images/{}", filename))
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/images/{}", filename))
            .cookie(cookie)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn upload_refuses_non_images() {
        let (app, ctx) = test_app!();
        let cookie = login!(app);

        let (content_type, body) = multipart(
            &[],
            Some(FilePart {
                field: "images",
                filename: "notes.txt",
                mime: "text/plain",
                data: b"hello",
            }),
        );
        let req = test::TestRequest::post()
            .uri("/admin/images/upload")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(ctx.images.list().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn one_bad_file_rejects_the_whole_batch() {
        let (app, ctx) = test_app!();
        let cookie = login!(app);

        let (content_type, body) = multipart_files(
            &[],
            &[
                FilePart {
                    field: "images",
                    filename: "ok.png",
                    mime: "image/png",
                    data: b"\x89PNG image",
                },
                FilePart {
                    field: "images",
                    filename: "bad.txt",
                    mime: "text/plain",
                    data: b"hello",
                },
            ],
        );
        let req = test::TestRequest::post()
            .uri("/admin/images/upload")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(ctx.images.list().await.unwrap().is_empty());
    }
}

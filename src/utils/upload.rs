//! Images envoyées depuis le back-office, rangées dans le répertoire public.

use actix_multipart::form::tempfile::TempFile;
use actix_multipart::form::MultipartFormConfig;
use actix_multipart::MultipartError;
use actix_session::SessionExt;
use actix_web::error::InternalError;
use actix_web::{HttpRequest, HttpResponse};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::utils::flash;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];
const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];
pub const PUBLIC_PREFIX: &str = "/images";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub created_at: String,
}

/// Vérifie extension, type MIME et taille ; renvoie l'extension retenue
pub fn validate_upload(
    file_name: Option<&str>,
    mime_type: Option<&str>,
    size: usize,
) -> Result<&'static str> {
    let ext = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    let Some(ext) = ALLOWED_EXTENSIONS.iter().find(|allowed| **allowed == ext) else {
        return Err(AppError::Upload(
            "Seules les images sont autorisées (jpeg, jpg, png, gif, webp)".to_string(),
        ));
    };

    let mime_ok = mime_type
        .map(|mime| ALLOWED_MIME_TYPES.contains(&mime.to_lowercase().as_str()))
        .unwrap_or(false);
    if !mime_ok {
        return Err(AppError::Upload(
            "Seules les images sont autorisées (jpeg, jpg, png, gif, webp)".to_string(),
        ));
    }

    if size > MAX_FILE_SIZE {
        return Err(AppError::Upload(
            "Fichier trop volumineux (5 Mo maximum)".to_string(),
        ));
    }
    if size == 0 {
        return Err(AppError::Upload("Fichier vide".to_string()));
    }

    Ok(*ext)
}

/// Un champ fichier laissé vide par le navigateur arrive sans nom et sans octet
pub fn is_supplied(file: &TempFile) -> bool {
    file.size > 0 || file.file_name.as_deref().is_some_and(|name| !name.is_empty())
}

/// Rejette les tentatives de remonter l'arborescence
fn sanitize_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains('\0')
}

#[derive(Debug, Clone)]
pub struct ImageStorage {
    dir: PathBuf,
}

impl ImageStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copie le fichier sous `<prefix>-<uuid>.<ext>` et renvoie son URL publique
    pub async fn persist(&self, prefix: &str, source: &Path, ext: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let filename = format!("{}-{}.{}", prefix, Uuid::new_v4(), ext);
        tokio::fs::copy(source, self.dir.join(&filename)).await?;

        tracing::info!(filename = %filename, "image enregistrée");
        Ok(format!("{}/{}", PUBLIC_PREFIX, filename))
    }

    /// Valide puis enregistre un fichier reçu en multipart
    pub async fn save(&self, prefix: &str, file: &TempFile) -> Result<String> {
        let mime = file.content_type.as_ref().map(|m| m.essence_str());
        let ext = validate_upload(file.file_name.as_deref(), mime, file.size)?;
        self.persist(prefix, file.file.path(), ext).await
    }

    /// Comme `save`, mais `None` quand aucun fichier n'a été choisi
    pub async fn save_optional(&self, prefix: &str, file: Option<&TempFile>) -> Result<Option<String>> {
        match file.filter(|f| is_supplied(f)) {
            Some(file) => self.save(prefix, file).await.map(Some),
            None => Ok(None),
        }
    }

    /// Images du répertoire, les plus récentes d'abord
    pub async fn list(&self) -> Result<Vec<ImageInfo>> {
        let mut images = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(images),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
            if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let created_at = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map(|t| {
                    let dt: chrono::DateTime<chrono::Utc> = t.into();
                    dt.to_rfc3339()
                })
                .unwrap_or_default();

            images.push(ImageInfo {
                url: format!("{}/{}", PUBLIC_PREFIX, filename),
                filename,
                size: metadata.len(),
                created_at,
            });
        }

        images.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(images)
    }

    /// Supprime une image tout juste enregistrée dont la ligne n'a pas pu être écrite
    pub async fn discard(&self, url: Option<&str>) {
        let Some(filename) = url.and_then(|u| u.strip_prefix(PUBLIC_PREFIX)) else {
            return;
        };
        let filename = filename.trim_start_matches('/');
        if let Err(err) = self.delete(filename).await {
            tracing::warn!(filename = %filename, error = %err, "image orpheline non supprimée");
        }
    }

    pub async fn delete(&self, filename: &str) -> Result<()> {
        if !sanitize_filename(filename) {
            return Err(AppError::Upload("Nom de fichier invalide".to_string()));
        }

        match tokio::fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => {
                tracing::info!(filename = %filename, "image supprimée");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound("Image"))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Limites multipart ; un envoi refusé revient au formulaire avec un message flash
pub fn multipart_config() -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(MAX_FILE_SIZE * 4)
        .memory_limit(1024 * 1024)
        .error_handler(multipart_error)
}

fn multipart_error(err: MultipartError, req: &HttpRequest) -> actix_web::Error {
    tracing::warn!(path = %req.path(), error = %err, "envoi multipart refusé");
    flash::error(&req.get_session(), "Fichier refusé (images de 5 Mo maximum)");

    let location = crate::routes::back_location(req, req.path());
    let response = HttpResponse::Found()
        .insert_header((actix_web::http::header::LOCATION, location))
        .finish();
    InternalError::from_response(err, response).into()
}

//! Outils partagés par les tests des routes : application en mémoire, connexion, multipart.

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use std::sync::Arc;
use uuid::Uuid;

use crate::app::AppState;
use crate::config::AdminSeed;
use crate::store::{ensure_admin, MemoryStore};
use crate::utils::session::COOKIE_NAME;
use crate::utils::upload::ImageStorage;

pub const ADMIN_EMAIL: &str = "admin@enno.com";
pub const ADMIN_PASSWORD: &str = "admin123";

const BOUNDARY: &str = "----enno-test-boundary";

/// Stockage en mémoire avec un administrateur, images dans un répertoire temporaire
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub images: ImageStorage,
}

impl TestContext {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let seed = AdminSeed {
            email: ADMIN_EMAIL.to_string(),
            name: "Admin ENNO".to_string(),
            password: Some(ADMIN_PASSWORD.to_string()),
            password_hash: None,
        };
        ensure_admin(store.as_ref(), &seed).await.unwrap();

        let images = ImageStorage::new(
            std::env::temp_dir().join(format!("enno-test-{}", Uuid::new_v4())),
        );
        Self { store, images }
    }

    pub fn state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            images: self.images.clone(),
            session_secret: "test-secret-".repeat(6),
            secure_cookies: false,
            allowed_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(self.images.dir());
    }
}

/// Application complète sur un stockage en mémoire : `let (app, ctx) = test_app!();`
macro_rules! test_app {
    () => {{
        let ctx = $crate::test_support::TestContext::new().await;
        let app = actix_web::test::init_service($crate::app::build_app(ctx.state())).await;
        (app, ctx)
    }};
}
pub(crate) use test_app;

/// Se connecte avec l'administrateur de test et renvoie le cookie de session
macro_rules! login {
    ($app:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/admin/login")
            .set_form([
                ("email", $crate::test_support::ADMIN_EMAIL),
                ("password", $crate::test_support::ADMIN_PASSWORD),
            ])
            .to_request();
        let res = actix_web::test::call_service(&$app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::FOUND);
        $crate::test_support::session_cookie(&res).unwrap()
    }};
}
pub(crate) use login;

/// Cookie de session posé par la réponse, s'il y en a un
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == COOKIE_NAME)
        .map(|cookie| cookie.into_owned())
}

pub struct FilePart<'a> {
    pub field: &'a str,
    pub filename: &'a str,
    pub mime: &'a str,
    pub data: &'a [u8],
}

/// Corps `multipart/form-data` : renvoie l'en-tête Content-Type et le corps
pub fn multipart(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> (String, Vec<u8>) {
    multipart_files(fields, file.as_slice())
}

/// Variante à plusieurs fichiers
pub fn multipart_files(fields: &[(&str, &str)], files: &[FilePart<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file.field, file.filename, file.mime
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

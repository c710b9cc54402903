use actix_session::SessionExt;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{header, Method};
use actix_web::{web, Error};
use chrono::Utc;
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::errors::Result;
use crate::models::visitor::NewVisit;
use crate::store::SiteStore;
use crate::utils::session;

/// Vrai pour une page publique : ni back-office, ni API, ni fichier statique
pub fn should_track(method: &Method, path: &str) -> bool {
    method == Method::GET
        && !path.starts_with("/admin")
        && !path.starts_with("/api")
        && ![".css", ".js", ".ico", "/images/"]
            .iter()
            .any(|fragment| path.contains(fragment))
}

//Il enregistre la visite des pages publiques sans jamais bloquer la requête.
pub struct TrackVisitor;

impl<S, B> Transform<S, ServiceRequest> for TrackVisitor
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = TrackVisitorMiddleware<S>;
    type InitError = ();
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(TrackVisitorMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct TrackVisitorMiddleware<S> {
    service: Rc<S>,
}

fn header_value(req: &ServiceRequest, name: header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn record(req: &ServiceRequest) -> Result<bool> {
    let Some(store) = req.app_data::<web::Data<dyn SiteStore>>() else {
        return Ok(false);
    };

    // Deux instructions séparées : connection_info() et get_session()
    // empruntent tous deux les extensions de la requête
    let session_id = session::visitor_session_id(&req.get_session())?;
    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();

    let visit = NewVisit {
        ip,
        user_agent: header_value(req, header::USER_AGENT),
        page: req.path().to_string(),
        referer: header_value(req, header::REFERER),
        session_id: Some(session_id),
    };

    store.record_visit(visit, Utc::now()).await
}

impl<S, B> Service<ServiceRequest> for TrackVisitorMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut std::task::Context<'_>) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            if should_track(req.method(), req.path()) {
                match record(&req).await {
                    Ok(true) => tracing::debug!(page = %req.path(), "visite enregistrée"),
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(page = %req.path(), error = %err, "suivi des visiteurs en échec")
                    }
                }
            }

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::utils::session::session_middleware;
    use actix_web::http::StatusCode;
    use actix_web::{test, App, HttpResponse};
    use std::sync::Arc;

    #[actix_web::test]
    async fn tracked_request_reaches_the_handler_and_is_recorded() {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn SiteStore> = store.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(shared))
                .route("/", web::get().to(HttpResponse::Ok))
                .wrap(TrackVisitor)
                .wrap(session_middleware(&"k".repeat(64), false)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::USER_AGENT, "Mozilla/5.0"))
            .insert_header((header::REFERER, "https://www.google.com/"))
            .peer_addr("10.1.2.3:4567".parse().unwrap())
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let (visits, total) = store.list_visits(0, 20).await.unwrap();
        assert_eq!(total, 1);
        assert!(visits[0].ip.starts_with("10.1.2.3"));
        assert_eq!(visits[0].user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(visits[0].referer.as_deref(), Some("https://www.google.com/"));
        assert!(visits[0].session_id.is_some());
    }

    #[::core::prelude::v1::test]
    fn public_pages_are_tracked() {
        assert!(should_track(&Method::GET, "/"));
        assert!(should_track(&Method::GET, "/services"));
        assert!(should_track(&Method::GET, "/contact"));
    }

    #[::core::prelude::v1::test]
    fn admin_api_and_assets_are_skipped() {
        assert!(!should_track(&Method::GET, "/admin"));
        assert!(!should_track(&Method::GET, "/admin/messages"));
        assert!(!should_track(&Method::GET, "/api/projets"));
        assert!(!should_track(&Method::GET, "/css/style.css"));
        assert!(!should_track(&Method::GET, "/js/app.js"));
        assert!(!should_track(&Method::GET, "/favicon.ico"));
        assert!(!should_track(&Method::GET, "/images/projet-1.png"));
    }

    #[::core::prelude::v1::test]
    fn only_get_requests_count() {
        assert!(!should_track(&Method::POST, "/contact"));
    }
}

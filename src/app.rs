//! Assemblage de l'application : données partagées, middlewares et routes.

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::{from_fn, ErrorHandlerResponse, ErrorHandlers, NormalizePath};
use actix_web::{http, web, App, Error, HttpResponse};
use std::sync::Arc;

use crate::errors::ErrorResponse;
use crate::logging::log_request;
use crate::routes;
use crate::store::SiteStore;
use crate::utils::method_override::MethodOverride;
use crate::utils::session::session_middleware;
use crate::utils::track_visitor::TrackVisitor;
use crate::utils::upload::{self, ImageStorage};

/// Ce que chaque worker HTTP partage
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SiteStore>,
    pub images: ImageStorage,
    pub session_secret: String,
    pub secure_cookies: bool,
    pub allowed_origin: String,
}

/// Remplace toute réponse 500 par un corps générique
fn internal_error<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    tracing::error!(path = %res.request().path(), "réponse 500");
    let (req, _) = res.into_parts();
    let response = HttpResponse::InternalServerError().json(ErrorResponse {
        success: false,
        error: "Une erreur est survenue".to_string(),
    });
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}

pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let cors = Cors::default() // Configuration de CORS
        .allowed_origin(&state.allowed_origin)
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![http::header::CONTENT_TYPE])
        .max_age(3600);

    App::new()
        .app_data(web::Data::from(state.store.clone())) // Partager le stockage avec les handlers
        .app_data(web::Data::new(state.images.clone()))
        .app_data(upload::multipart_config())
        .configure(routes::config)
        .default_service(web::to(routes::not_found))
        .wrap(TrackVisitor)
        .wrap(session_middleware(&state.session_secret, state.secure_cookies))
        .wrap(from_fn(log_request))
        .wrap(ErrorHandlers::new().handler(http::StatusCode::INTERNAL_SERVER_ERROR, internal_error))
        .wrap(MethodOverride)
        .wrap(NormalizePath::trim())
        .wrap(cors)
}

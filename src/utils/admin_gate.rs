use actix_session::SessionExt;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{http::header, Error, HttpMessage, HttpResponse};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::utils::session;

pub const LOGIN_PATH: &str = "/admin/login";

//Il vérifie qu'un administrateur est connecté grâce à la session.
//Sans session : redirection vers la page de connexion. Rôle différent : retour à l'accueil.
pub struct AdminGate;

impl<S, B> Transform<S, ServiceRequest> for AdminGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AdminGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminGateMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct AdminGateMiddleware<S> {
    service: Rc<S>,
}

fn redirect_to<B>(req: ServiceRequest, location: &str) -> ServiceResponse<EitherBody<B>> {
    let response = HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish();
    req.into_response(response).map_into_right_body()
}

impl<S, B> Service<ServiceRequest> for AdminGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let identity = session::current_identity(&req.get_session());

            match identity {
                None => {
                    tracing::debug!(path = %req.path(), "accès admin sans session");
                    Ok(redirect_to(req, LOGIN_PATH))
                }
                Some(identity) if !identity.is_admin() => {
                    tracing::warn!(user_id = identity.id, role = %identity.role, "accès admin refusé");
                    Ok(redirect_to(req, "/"))
                }
                Some(identity) => {
                    // Les handlers la reçoivent via `web::ReqData<AdminIdentity>`
                    req.extensions_mut().insert(identity);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
            }
        })
    }
}

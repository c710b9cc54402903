use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::Method;
use actix_web::Error;
use futures_util::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;

pub const OVERRIDE_HEADER: &str = "x-http-method-override";

/// Méthode demandée par un formulaire HTML via `?_method=` ou l'en-tête d'override
pub fn override_method(query: &str, header: Option<&str>) -> Option<Method> {
    let requested = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "_method")
        .map(|(_, value)| value)
        .or(header)?;

    match requested.to_ascii_uppercase().as_str() {
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

//Il redirige un POST vers PUT, PATCH ou DELETE avant le routage.
pub struct MethodOverride;

impl<S, B> Transform<S, ServiceRequest> for MethodOverride
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = MethodOverrideMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(MethodOverrideMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct MethodOverrideMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MethodOverrideMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        if req.method() == Method::POST {
            let header = req
                .headers()
                .get(OVERRIDE_HEADER)
                .and_then(|value| value.to_str().ok());
            if let Some(method) = override_method(req.query_string(), header) {
                req.head_mut().method = method;
            }
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move { service.call(req).await })
    }
}

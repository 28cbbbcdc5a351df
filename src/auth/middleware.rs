use super::{authenticate, reject_unknown};
use crate::confluence::ContentTransport;
use crate::endpoint::Endpoint;
use crate::error::{ConflagentError, ConflagentResult};
use crate::server::AppState;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use log::{debug, warn};
use std::rc::Rc;
use std::sync::Arc;

/// Endpoint that passed the access gate, together with its transport.
///
/// Inserted into request extensions by [`EndpointAuth`] and extracted by page
/// handlers.
#[derive(Clone)]
pub struct AuthorizedEndpoint {
    pub endpoint: Arc<Endpoint>,
    pub transport: Arc<dyn ContentTransport>,
}

impl FromRequest for AuthorizedEndpoint {
    type Error = ConflagentError;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        std::future::ready(
            req.extensions()
                .get::<AuthorizedEndpoint>()
                .cloned()
                .ok_or(ConflagentError::Unauthorized),
        )
    }
}

/// Bearer-token middleware for the protected page routes.
///
/// Reads the `{endpoint}` path segment, authenticates the request against that
/// endpoint and rejects it with an `UNAUTHORIZED` envelope before any handler
/// or body extractor runs. Unknown endpoint names are rejected the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointAuth;

impl<S, B> Transform<S, ServiceRequest> for EndpointAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = EndpointAuthService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(EndpointAuthService {
            service: Rc::new(service),
        }))
    }
}

pub struct EndpointAuthService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for EndpointAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            match authorize(&req) {
                Ok(authorized) => {
                    debug!(
                        "Authorized request for endpoint '{}' on {}",
                        authorized.endpoint.name,
                        req.path()
                    );
                    req.extensions_mut().insert(authorized);
                    let response = service.call(req).await?;
                    Ok(response.map_into_left_body())
                }
                Err(err) => {
                    if matches!(err, ConflagentError::Unauthorized) {
                        warn!("Rejected unauthenticated request to {}", req.path());
                    }
                    let response = err.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

fn authorize(req: &ServiceRequest) -> ConflagentResult<AuthorizedEndpoint> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ConflagentError::internal("Application state is not configured"))?;
    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let name = req.match_info().get("endpoint").unwrap_or_default();

    let endpoint = match state.registry.resolve(name) {
        Ok(endpoint) => endpoint,
        Err(_) => return Err(reject_unknown(presented)),
    };
    authenticate(&endpoint, presented)?;

    let transport = state.transports.transport_for(&endpoint)?;
    Ok(AuthorizedEndpoint {
        endpoint,
        transport,
    })
}

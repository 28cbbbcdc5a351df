use super::{HttpMetrics, UNMATCHED_ROUTE};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

/// App-level middleware feeding [`HttpMetrics`].
#[derive(Clone)]
pub struct RequestMetrics {
    metrics: Arc<HttpMetrics>,
}

impl RequestMetrics {
    pub fn new(metrics: Arc<HttpMetrics>) -> Self {
        Self { metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestMetricsService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestMetricsService {
            service: Rc::new(service),
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct RequestMetricsService<S> {
    service: Rc<S>,
    metrics: Arc<HttpMetrics>,
}

/// Holds an in-progress slot until the request completes or its future is dropped.
struct InFlight {
    metrics: Arc<HttpMetrics>,
    method: String,
    route: String,
    started: Instant,
    finished: bool,
}

impl InFlight {
    fn begin(metrics: Arc<HttpMetrics>, method: String, route: String) -> Self {
        metrics.request_started(&route);
        Self {
            metrics,
            method,
            route,
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(mut self, status: u16) {
        self.finished = true;
        self.metrics.request_finished(
            &self.method,
            &self.route,
            status,
            self.started.elapsed().as_secs_f64(),
        );
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.finished {
            self.metrics.request_abandoned(&self.route);
        }
    }
}

impl<S, B> Service<ServiceRequest> for RequestMetricsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let route = req
            .match_pattern()
            .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
        let in_flight = InFlight::begin(self.metrics.clone(), req.method().to_string(), route);

        Box::pin(async move {
            let result = service.call(req).await;
            let status = match &result {
                Ok(response) => response.status().as_u16(),
                Err(err) => err.as_response_error().status_code().as_u16(),
            };
            in_flight.finish(status);
            result
        })
    }
}

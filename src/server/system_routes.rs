use super::http_server::AppState;
use crate::api::{ok, openapi};
use crate::error::{ConflagentError, ConflagentResult};
use crate::metrics::TEXT_CONTENT_TYPE;

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

/// Liveness check for a configured endpoint. No authentication.
pub async fn health(
    state: web::Data<AppState>,
    endpoint: web::Path<String>,
) -> ConflagentResult<HttpResponse> {
    state.registry.resolve(&endpoint)?;
    Ok(ok("Service is healthy", json!({"status": "ok"})))
}

/// OpenAPI document for a configured endpoint. No authentication.
pub async fn openapi_spec(
    req: HttpRequest,
    state: web::Data<AppState>,
    endpoint: web::Path<String>,
) -> ConflagentResult<HttpResponse> {
    let endpoint = state.registry.resolve(&endpoint)?;
    let info = req.connection_info();
    let host_url = format!("{}://{}", info.scheme(), info.host());
    Ok(HttpResponse::Ok().json(openapi::openapi_document(&endpoint.name, &host_url)))
}

/// Prometheus scrape target. No authentication.
pub async fn metrics(state: web::Data<AppState>) -> ConflagentResult<HttpResponse> {
    let text = state
        .metrics
        .encode_text()
        .map_err(|e| ConflagentError::internal(e.to_string()))?;
    Ok(HttpResponse::Ok().content_type(TEXT_CONTENT_TYPE).body(text))
}

/// Static landing page
pub async fn landing_page() -> HttpResponse {
    let html = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{name}</title></head>\n<body>\n\
         <h1>Welcome to {name}</h1>\n\
         <p>Title-addressed access to sandboxed Confluence page trees.</p>\n\
         <p>Version v{version}</p>\n\
         <p>See <code>/endpoint/&lt;name&gt;/openapi.json</code> to view the API specification.</p>\n\
         </body>\n</html>\n",
        name = openapi::API_TITLE.trim_end_matches(" API"),
        version = env!("CARGO_PKG_VERSION"),
    );
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

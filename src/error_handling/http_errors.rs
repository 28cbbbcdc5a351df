use crate::api::ResponseEnvelope;
use crate::error::ErrorCode;
use actix_web::{
    error::{JsonPayloadError, QueryPayloadError},
    http::StatusCode,
    HttpRequest, HttpResponse,
};

/// Custom error handler for JSON deserialization errors.
///
/// Registered through `web::JsonConfig`. Logs the specific error and answers
/// with an `INVALID_INPUT` envelope.
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::warn!(
        "JSON payload error: \"{}\" for {} request to {}",
        err,
        req.method(),
        req.path()
    );

    let message = match &err {
        JsonPayloadError::Deserialize(serde_err) => {
            format!("Invalid JSON format: {}", serde_err)
        }
        JsonPayloadError::ContentType => {
            "Request body must be JSON (Content-Type: application/json)".to_string()
        }
        _ => format!("Invalid request payload: {}", err),
    };

    let response = ResponseEnvelope::failure(ErrorCode::InvalidInput, message).into_response();
    actix_web::error::InternalError::from_response(err, response).into()
}

/// Custom error handler for malformed query strings, registered through
/// `web::QueryConfig`.
pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::warn!(
        "Query string error: \"{}\" for {} request to {}",
        err,
        req.method(),
        req.path()
    );

    let response = ResponseEnvelope::failure(
        ErrorCode::InvalidInput,
        format!("Invalid query string: {}", err),
    )
    .into_response();
    actix_web::error::InternalError::from_response(err, response).into()
}

/// Fallback for requests that match no route.
pub async fn not_found_handler(req: HttpRequest) -> HttpResponse {
    log::debug!("No route for {} {}", req.method(), req.path());
    ResponseEnvelope::failure(
        ErrorCode::NotFound,
        format!("No route for {} {}", req.method(), req.path()),
    )
    .into_response()
}

/// Fallback for a known route asked for with a method it does not serve.
///
/// Answered with HTTP 405 and an `INVALID_OPERATION` envelope.
pub async fn method_not_allowed_handler(req: HttpRequest) -> HttpResponse {
    log::debug!("Method {} not allowed on {}", req.method(), req.path());
    let envelope = ResponseEnvelope::failure(
        ErrorCode::InvalidOperation,
        format!("Method {} is not allowed on {}", req.method(), req.path()),
    );
    HttpResponse::build(StatusCode::METHOD_NOT_ALLOWED).json(envelope)
}

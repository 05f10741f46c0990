//! Request ID middleware for log correlation.
//!
//! Every request runs inside a `tracing` span carrying its id, so log lines
//! written while handling it (including those forwarded from the `vpoker`
//! core) can be matched up. The id is echoed back in the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied id we pass through; longer ones are replaced
const MAX_REQUEST_ID_LEN: usize = 64;

/// Request ID stored in request extensions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Reuse the client's id when it is sane, otherwise generate one
fn get_or_generate_request_id(headers: &HeaderMap) -> RequestId {
    let id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    RequestId(id)
}

/// Middleware to tag every request and response with an id
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use vp_server::api::request_id::request_id_middleware;
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .layer(middleware::from_fn(request_id_middleware));
/// ```
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = get_or_generate_request_id(request.headers());
    request.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id.0,
        method = %request.method(),
        uri = %request.uri(),
    );

    async move {
        tracing::info!("Request started");
        let mut response = next.run(request).await;

        if let Ok(value) = HeaderValue::from_str(&request_id.0) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        tracing::info!(status = %response.status(), "Request completed");
        response
    }
    .instrument(span)
    .await
}

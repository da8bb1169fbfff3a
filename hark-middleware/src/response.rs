use crate::exchange::Exchange;
use axum::body::{Body, HttpBody, to_bytes};
use axum::response::{IntoResponse, Response};
use hark_core::{Frame, LogArg};
use http::{HeaderValue, StatusCode, header};
use serde_json::Value;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shown in place of a body that is not buffered for logging.
pub const STREAMED_BODY: &str = "[STREAMED]";

/// Rewrites a JSON response body before it is logged. The client still
/// receives the original bytes.
#[derive(Clone)]
pub struct LogTransform(Arc<dyn Fn(Value) -> Value + Send + Sync>);

impl LogTransform {
    pub fn new(f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl std::fmt::Debug for LogTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LogTransform")
    }
}

/// Marker left on responses produced by [`ResponseFile`], so the middleware
/// logs the file path instead of the file contents.
#[derive(Debug, Clone)]
pub struct SentFile {
    pub path: String,
    pub location: &'static Location<'static>,
}

/// Serve a file from disk as the response.
///
/// ```ignore
/// async fn readme() -> Response {
///     ResponseFile::new("README.md").send().await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ResponseFile {
    path: PathBuf,
    location: &'static Location<'static>,
}

impl ResponseFile {
    #[track_caller]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            location: Location::caller(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and build the response. A missing file yields 404.
    pub async fn send(self) -> Response {
        let shown = self.path.display().to_string();
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %shown, "Response file not found");
                return StatusCode::NOT_FOUND.into_response();
            }
            Err(e) => {
                warn!(path = %shown, error = %e, "Failed to read response file");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        let mut response = Response::new(Body::from(contents));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type_for(&self.path)),
        );
        response.extensions_mut().insert(SentFile {
            path: shown,
            location: self.location,
        });
        response
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" | "md" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Record what the handler sent, then hand the response back unchanged.
pub(crate) async fn intercept(
    response: Response,
    exchange: &Exchange,
    max_body_bytes: usize,
    transform: Option<&LogTransform>,
) -> Response {
    if let Some(sent) = response.extensions().get::<SentFile>().cloned() {
        let site = exchange.resolve(Frame::from_location(sent.location, None));
        exchange.with_buffer(|buffer| buffer.append_response_file(sent.path, site));
        return response;
    }

    let buffered = response
        .body()
        .size_hint()
        .exact()
        .is_some_and(|len| len <= max_body_bytes as u64);
    if !buffered {
        exchange.with_buffer(|buffer| buffer.append_response(LogArg::from(STREAMED_BODY), None));
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(exchange = %exchange.id(), error = %e, "Failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !bytes.is_empty() {
        let is_json = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json") || ct.contains("+json"));
        let arg = match is_json.then(|| serde_json::from_slice(&bytes)) {
            Some(Ok(value)) => LogArg::Json(match transform {
                Some(transform) => transform.apply(value),
                None => value,
            }),
            _ => LogArg::Text(String::from_utf8_lossy(&bytes).into_owned()),
        };
        let appended = exchange.with_buffer(|buffer| buffer.append_response(arg, None));
        if let Some(Err(e)) = appended {
            warn!(exchange = %exchange.id(), error = %e, kind = e.kind(), "Failed to record response body");
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}

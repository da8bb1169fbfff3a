use axum::body::{Body, HttpBody, to_bytes};
use axum::response::{IntoResponse, Response};
use hark_core::RequestLine;
use http::{Method, Request, StatusCode, header};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Read what the request line needs and hand back an equivalent request.
///
/// GET requests contribute their query string; everything else contributes
/// its body, buffered only when its declared size fits in `max_body_bytes`.
pub async fn capture(
    req: Request<Body>,
    max_body_bytes: usize,
) -> Result<(Request<Body>, RequestLine), Response> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if method == Method::GET {
        let payload = req.uri().query().map(query_payload).unwrap_or(Value::Null);
        let line = RequestLine {
            method: method.to_string(),
            path,
            payload,
        };
        return Ok((req, line));
    }

    let fits = req
        .body()
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= max_body_bytes as u64);
    if !fits {
        debug!(path = %path, "Request body has no bounded size, not logging it");
        let line = RequestLine {
            method: method.to_string(),
            path,
            payload: Value::Null,
        };
        return Ok((req, line));
    }

    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path, error = %e, "Failed to read request body");
            return Err((StatusCode::BAD_REQUEST, "failed to read request body").into_response());
        }
    };

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let payload = body_payload(content_type, &bytes);

    let line = RequestLine {
        method: method.to_string(),
        path,
        payload,
    };
    Ok((Request::from_parts(parts, Body::from(bytes)), line))
}

/// Query string as a JSON object. Repeated keys collect into an array.
pub fn query_payload(query: &str) -> Value {
    form_object(query.as_bytes())
}

/// JSON bodies are parsed; any other body counts as empty.
fn body_payload(content_type: &str, bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if mime != "application/json" && !mime.ends_with("+json") {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or_else(|e| {
        debug!(error = %e, "Request body is not valid JSON, not logging it");
        Value::Null
    })
}

fn form_object(input: &[u8]) -> Value {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(input) {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(map)
}

use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use hark_middleware::{ExchangeLogger, ResponseFile, hark_log};
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing::warn;

/// Demo application routes, before the logger is applied.
pub fn demo_routes(readme: PathBuf) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/sum", get(sum))
        .route("/product", get(product))
        .route("/timeout", get(never_responds))
        .route("/404", get(not_found))
        .route("/400", get(bad_request))
        .route("/max", post(max))
        .route("/query", get(query_users))
        .route("/readme", get(move || send_readme(readme.clone())))
}

async fn hello() -> &'static str {
    "Hello World"
}

fn numbers(pairs: &[(String, String)]) -> impl Iterator<Item = i64> + '_ {
    pairs
        .iter()
        .filter(|(key, _)| key == "numbers")
        .filter_map(|(_, value)| value.trim().parse().ok())
}

async fn sum(Query(pairs): Query<Vec<(String, String)>>) -> Json<Value> {
    Json(json!({ "sum": numbers(&pairs).sum::<i64>() }))
}

async fn product(Query(pairs): Query<Vec<(String, String)>>) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(json!({ "product": numbers(&pairs).product::<i64>() })),
    )
}

async fn never_responds() -> &'static str {
    std::future::pending().await
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}

async fn bad_request() -> StatusCode {
    StatusCode::BAD_REQUEST
}

async fn max(logger: ExchangeLogger, Json(body): Json<Value>) -> Response {
    let values: Vec<i64> = body["numbers"]
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    if let Err(e) = hark_log!(logger, "computing max of", json!(values)) {
        warn!(error = %e, "Failed to log");
    }

    match values.iter().max() {
        Some(max) => Json(json!({ "max": max })).into_response(),
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn query_users(logger: ExchangeLogger) -> Json<Value> {
    let statement = "
        SELECT id, name
        FROM users
        WHERE active = 1
    ";
    if let Err(e) = hark_log!(logger, "loading active users", statement) {
        warn!(error = %e, "Failed to log");
    }
    Json(json!([
        { "id": 1, "name": "ada" },
        { "id": 2, "name": "grace" },
    ]))
}

async fn send_readme(path: PathBuf) -> Response {
    ResponseFile::new(path).send().await
}

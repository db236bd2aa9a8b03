use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
}

/// What `/echo` saw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Deserialize)]
pub struct SlowParams {
    #[serde(default = "default_delay")]
    pub ms: u64,
}

fn default_delay() -> u64 {
    500
}

/// Counts every request except `GET /hits`.
#[derive(Clone, Default)]
pub struct AppState {
    hits: Arc<AtomicUsize>,
}

pub fn app() -> Router {
    let state = AppState::default();
    Router::new()
        .route("/users", post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(replace_user).patch(update_user).delete(delete_user),
        )
        .route("/text", get(text))
        .route("/slow", get(slow))
        .route("/graphql", post(graphql))
        .route("/echo", any(echo))
        .route("/hits", get(hits))
        .layer(middleware::from_fn_with_state(state.clone(), count_hits))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn count_hits(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.uri().path() != "/hits" {
        state.hits.fetch_add(1, Ordering::SeqCst);
    }
    next.run(request).await
}

async fn hits(State(state): State<AppState>) -> Json<usize> {
    Json(state.hits.load(Ordering::SeqCst))
}

async fn get_user(Path(id): Path<u64>) -> Result<Json<User>, (StatusCode, Json<Value>)> {
    if id == 0 {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "user not found"})),
        ));
    }
    Ok(Json(User {
        id,
        name: format!("user-{id}"),
    }))
}

async fn create_user(Json(input): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut user = input;
    if let Some(fields) = user.as_object_mut() {
        fields.insert("id".to_string(), Value::from(42));
    }
    (StatusCode::CREATED, Json(user))
}

async fn replace_user(Path(id): Path<u64>, Json(input): Json<Value>) -> Json<Value> {
    Json(serde_json::json!({"id": id, "replaced": input}))
}

async fn update_user(Path(id): Path<u64>, Json(input): Json<Value>) -> Json<Value> {
    Json(serde_json::json!({"id": id, "updated": input}))
}

async fn delete_user(Path(_id): Path<u64>) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "hello, plain text")
}

async fn slow(Query(params): Query<SlowParams>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    Json(serde_json::json!({"slow": true}))
}

async fn graphql(Json(input): Json<Value>) -> Json<Value> {
    Json(serde_json::json!({"data": {"received": input}}))
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();
    Json(Echo {
        method: method.to_string(),
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_to_json() {
        let user = User {
            id: 1,
            name: "user-1".to_string(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json, serde_json::json!({"id": 1, "name": "user-1"}));
    }

    #[test]
    fn slow_params_default_delay() {
        let params: SlowParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.ms, 500);
    }

    #[test]
    fn echo_roundtrips_through_json() {
        let echo = Echo {
            method: "PATCH".to_string(),
            headers: BTreeMap::from([("x-a".to_string(), "1".to_string())]),
            body: "{}".to_string(),
        };
        let back: Echo = serde_json::from_str(&serde_json::to_string(&echo).unwrap()).unwrap();
        assert_eq!(back, echo);
    }
}

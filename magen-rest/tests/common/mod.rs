//! Fake JSON service used by the REST integration tests

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
struct Users {
    records: Arc<Mutex<HashMap<String, Value>>>,
    next_id: Arc<AtomicUsize>,
}

fn with_uuid(mut body: Value, id: &str) -> Value {
    if let Some(map) = body.as_object_mut() {
        map.insert("uuid".into(), Value::String(id.to_string()));
    }
    body
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"title": "Not Found", "status": 404, "detail": "No such user"})),
    )
        .into_response()
}

async fn create_user(State(users): State<Users>, Json(body): Json<Value>) -> Response {
    let id = format!("u{}", users.next_id.fetch_add(1, Ordering::SeqCst) + 1);
    let stored = with_uuid(body, &id);
    users.records.lock().insert(id.clone(), stored.clone());
    (
        StatusCode::CREATED,
        [(header::LOCATION, format!("/users/{id}/"))],
        Json(stored),
    )
        .into_response()
}

async fn read_user(State(users): State<Users>, Path(id): Path<String>) -> Response {
    match users.records.lock().get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => not_found(),
    }
}

async fn replace_user(
    State(users): State<Users>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let stored = with_uuid(body, &id);
    users.records.lock().insert(id, stored.clone());
    Json(stored).into_response()
}

async fn delete_user(State(users): State<Users>, Path(id): Path<String>) -> Response {
    match users.records.lock().remove(&id) {
        Some(_) => Json(json!({"deleted": id})).into_response(),
        None => not_found(),
    }
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!({"late": true}))
}

fn router() -> Router {
    Router::new()
        .route("/users/", post(create_user))
        .route(
            "/users/{id}/",
            get(read_user).put(replace_user).delete(delete_user),
        )
        .route("/no-location/", post(|| async { Json(json!({"created": true})) }))
        .route("/empty/", get(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/silent/",
            post(|| async { (StatusCode::NO_CONTENT, [(header::LOCATION, "/silent/1/")]) })
                .put(|| async { StatusCode::NO_CONTENT })
                .delete(|| async { StatusCode::NO_CONTENT }),
        )
        .route("/slow/", get(slow).post(slow).put(slow).delete(slow))
        .route(
            "/text/",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "plain words") }),
        )
        .route(
            "/boom/",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "exploded"})),
                )
            }),
        )
        .route(
            "/sticky/",
            get(|| async { Json(json!({"still": "here"})) })
                .delete(|| async { StatusCode::NO_CONTENT }),
        )
        .with_state(Users::default())
}

/// Start the fake service on an ephemeral port and return its base URL
pub async fn spawn_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a port nothing listens on
pub async fn unused_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

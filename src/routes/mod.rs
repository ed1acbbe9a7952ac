use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::db::DbError;

pub mod analytics;
pub mod birthday;
pub mod gallery;
pub mod status;
pub mod visitors;
pub mod wishes;

/// Every API handler answers with a status code and a JSON envelope.
pub type ApiResponse = Custom<Json<Value>>;

/// `{"success": true, ...body}` with 200.
pub fn ok(body: Value) -> ApiResponse {
    respond(Status::Ok, body)
}

/// `{"success": true, ...body}` with 201.
pub fn created(body: Value) -> ApiResponse {
    respond(Status::Created, body)
}

pub fn bad_request(error: &str) -> ApiResponse {
    Custom(
        Status::BadRequest,
        Json(json!({"success": false, "error": error})),
    )
}

pub fn not_found(error: &str) -> ApiResponse {
    Custom(
        Status::NotFound,
        Json(json!({"success": false, "error": error})),
    )
}

/// Maps a data access failure to a response. An empty update is the client's
/// fault (400); anything else is a 500 whose detail is only exposed outside
/// production.
pub fn failure(config: &AppConfig, context: &str, err: &DbError) -> ApiResponse {
    match err {
        DbError::EmptyUpdate => bad_request(&err.to_string()),
        DbError::Query(detail) => {
            let mut body = json!({"success": false, "error": context});
            if !config.is_production() {
                body["message"] = Value::String(detail.clone());
            }
            Custom(Status::InternalServerError, Json(body))
        }
    }
}

fn respond(code: Status, mut body: Value) -> ApiResponse {
    if let Some(map) = body.as_object_mut() {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Custom(code, Json(body))
}

/// Trimmed, non-empty text or `None`.
pub fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ── Catchers ───────────────────────────────────────────

#[catch(404)]
pub fn not_found_catcher(req: &Request) -> Json<Value> {
    Json(json!({
        "success": false,
        "error": "Endpoint not found",
        "path": req.uri().to_string(),
        "method": req.method().as_str(),
    }))
}

#[catch(400)]
pub fn bad_request_catcher() -> Json<Value> {
    Json(json!({"success": false, "error": "Malformed request body"}))
}

#[catch(422)]
pub fn unprocessable_catcher() -> Json<Value> {
    Json(json!({"success": false, "error": "Request body has the wrong shape"}))
}

#[catch(500)]
pub fn server_error_catcher() -> Json<Value> {
    Json(json!({"success": false, "error": "Internal server error"}))
}

pub fn catchers() -> Vec<rocket::Catcher> {
    catchers![
        not_found_catcher,
        bad_request_catcher,
        unprocessable_catcher,
        server_error_catcher
    ]
}

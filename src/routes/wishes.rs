use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::json;

use super::{bad_request, created, failure, not_found, ok, required, ApiResponse};
use crate::client_info::ClientInfo;
use crate::config::AppConfig;
use crate::db::Db;
use crate::models::wish::{BirthdayWish, WishForm, WishPatch};

#[derive(Debug, Deserialize)]
pub struct NewWish {
    pub name: Option<String>,
    pub wish: Option<String>,
    pub email: Option<String>,
}

fn too_long(config: &AppConfig, text: &str) -> Option<ApiResponse> {
    if text.chars().count() > config.max_wish_length {
        Some(bad_request(&format!(
            "Wish must be at most {} characters",
            config.max_wish_length
        )))
    } else {
        None
    }
}

#[get("/wishes?<name>&<q>")]
pub fn list_wishes(
    db: &State<Db>,
    config: &State<AppConfig>,
    name: Option<&str>,
    q: Option<&str>,
) -> ApiResponse {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    let keyword = q.map(str::trim).filter(|k| !k.is_empty());

    let result = match (name, keyword) {
        (Some(name), _) => BirthdayWish::by_name(db, name),
        (None, Some(keyword)) => BirthdayWish::search(db, keyword),
        (None, None) => BirthdayWish::list_approved(db),
    };

    match result {
        Ok(wishes) => ok(json!({
            "count": wishes.len(),
            "wishes": wishes,
        })),
        Err(e) => failure(config, "Failed to fetch wishes", &e),
    }
}

#[get("/wishes/all")]
pub fn list_all_wishes(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match BirthdayWish::list_all(db) {
        Ok(wishes) => ok(json!({
            "count": wishes.len(),
            "wishes": wishes,
        })),
        Err(e) => failure(config, "Failed to fetch wishes", &e),
    }
}

#[get("/wishes/<id>")]
pub fn get_wish(db: &State<Db>, config: &State<AppConfig>, id: &str) -> ApiResponse {
    match BirthdayWish::find_approved(db, id) {
        Ok(Some(wish)) => ok(json!({ "wish": wish })),
        Ok(None) => not_found("Wish not found"),
        Err(e) => failure(config, "Failed to fetch wish", &e),
    }
}

#[post("/wishes", data = "<body>")]
pub fn create_wish(
    db: &State<Db>,
    config: &State<AppConfig>,
    client: ClientInfo,
    body: Json<NewWish>,
) -> ApiResponse {
    let body = body.into_inner();
    let (name, text) = match (required(&body.name), required(&body.wish)) {
        (Some(name), Some(text)) => (name.to_string(), text.to_string()),
        _ => return bad_request("Name and wish are required"),
    };
    if let Some(rejection) = too_long(config, &text) {
        return rejection;
    }

    let form = WishForm {
        name,
        wish: text,
        email: body.email,
        is_approved: config.auto_approve,
        ip_address: client.ip,
        user_agent: client.user_agent,
    };

    match BirthdayWish::create(db, &form) {
        Ok(wish) => created(json!({
            "message": "Wish submitted successfully",
            "wish": wish.public(),
        })),
        Err(e) => failure(config, "Failed to save wish", &e),
    }
}

#[put("/wishes/<id>", data = "<body>")]
pub fn update_wish(
    db: &State<Db>,
    config: &State<AppConfig>,
    id: &str,
    body: Json<WishPatch>,
) -> ApiResponse {
    let mut patch = body.into_inner();
    if let Some(ref text) = patch.wish {
        let text = text.trim();
        if text.is_empty() {
            return bad_request("Wish cannot be empty");
        }
        if let Some(rejection) = too_long(config, text) {
            return rejection;
        }
        patch.wish = Some(text.to_string());
    }
    if matches!(patch.name.as_deref().map(str::trim), Some("")) {
        return bad_request("Name cannot be empty");
    }

    match BirthdayWish::update(db, id, &patch) {
        Ok(summary) if summary.affected == 0 => return not_found("Wish not found"),
        Ok(_) => {}
        Err(e) => return failure(config, "Failed to update wish", &e),
    }

    match BirthdayWish::find_by_id(db, id) {
        Ok(Some(wish)) => ok(json!({
            "message": "Wish updated successfully",
            "wish": wish,
        })),
        Ok(None) => not_found("Wish not found"),
        Err(e) => failure(config, "Failed to fetch wish", &e),
    }
}

#[delete("/wishes/<id>")]
pub fn delete_wish(db: &State<Db>, config: &State<AppConfig>, id: &str) -> ApiResponse {
    match BirthdayWish::delete(db, id) {
        Ok(summary) if summary.affected == 0 => not_found("Wish not found"),
        Ok(_) => ok(json!({ "message": "Wish deleted successfully" })),
        Err(e) => failure(config, "Failed to delete wish", &e),
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        list_wishes,
        list_all_wishes,
        get_wish,
        create_wish,
        update_wish,
        delete_wish
    ]
}

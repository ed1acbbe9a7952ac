use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::json;

use super::{bad_request, created, failure, not_found, ok, required, ApiResponse};
use crate::client_info::ClientInfo;
use crate::config::AppConfig;
use crate::db::Db;
use crate::models::message::{BirthdayMessage, MessageForm, MessagePatch};
use crate::models::moderation;

#[derive(Debug, Deserialize)]
pub struct NewMessage {
    pub message: Option<String>,
    pub author: Option<String>,
}

#[get("/birthday/messages?<author>&<q>")]
pub fn list_messages(
    db: &State<Db>,
    config: &State<AppConfig>,
    author: Option<&str>,
    q: Option<&str>,
) -> ApiResponse {
    let author = author.map(str::trim).filter(|a| !a.is_empty());
    let keyword = q.map(str::trim).filter(|k| !k.is_empty());

    let result = match (author, keyword) {
        (Some(author), _) => BirthdayMessage::by_author(db, author),
        (None, Some(keyword)) => BirthdayMessage::search(db, keyword),
        (None, None) => BirthdayMessage::list_approved(db),
    };

    match result {
        Ok(messages) => ok(json!({
            "count": messages.len(),
            "messages": messages,
        })),
        Err(e) => failure(config, "Failed to fetch birthday messages", &e),
    }
}

#[get("/birthday/messages/all")]
pub fn list_all_messages(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match BirthdayMessage::list_all(db) {
        Ok(messages) => ok(json!({
            "count": messages.len(),
            "messages": messages,
        })),
        Err(e) => failure(config, "Failed to fetch birthday messages", &e),
    }
}

#[get("/birthday/messages/<id>")]
pub fn get_message(db: &State<Db>, config: &State<AppConfig>, id: &str) -> ApiResponse {
    match BirthdayMessage::find_approved(db, id) {
        Ok(Some(message)) => ok(json!({ "message": message })),
        Ok(None) => not_found("Message not found"),
        Err(e) => failure(config, "Failed to fetch message", &e),
    }
}

#[post("/birthday/messages", data = "<body>")]
pub fn create_message(
    db: &State<Db>,
    config: &State<AppConfig>,
    client: ClientInfo,
    body: Json<NewMessage>,
) -> ApiResponse {
    let body = body.into_inner();
    let text = match required(&body.message) {
        Some(text) => text,
        None => return bad_request("Message is required"),
    };
    if text.chars().count() > config.max_message_length {
        return bad_request(&format!(
            "Message must be at most {} characters",
            config.max_message_length
        ));
    }

    let form = MessageForm {
        message: text.to_string(),
        author: body.author,
        is_approved: config.auto_approve,
        ip_address: client.ip,
        user_agent: client.user_agent,
    };

    match BirthdayMessage::create(db, &form) {
        Ok(message) => {
            let note = if message.is_approved {
                "Message posted successfully"
            } else {
                "Message received and awaiting approval"
            };
            created(json!({
                "message": note,
                "data": message.public(),
            }))
        }
        Err(e) => failure(config, "Failed to save message", &e),
    }
}

#[put("/birthday/messages/<id>", data = "<body>")]
pub fn update_message(
    db: &State<Db>,
    config: &State<AppConfig>,
    id: &str,
    body: Json<MessagePatch>,
) -> ApiResponse {
    let mut patch = body.into_inner();
    if let Some(ref text) = patch.message {
        let text = text.trim();
        if text.is_empty() {
            return bad_request("Message cannot be empty");
        }
        if text.chars().count() > config.max_message_length {
            return bad_request(&format!(
                "Message must be at most {} characters",
                config.max_message_length
            ));
        }
        patch.message = Some(text.to_string());
    }
    if let Some(ref author) = patch.author {
        let author = author.trim();
        patch.author = Some(if author.is_empty() { "Anonymous" } else { author }.to_string());
    }

    match BirthdayMessage::update(db, id, &patch) {
        Ok(summary) if summary.affected == 0 => return not_found("Message not found"),
        Ok(_) => {}
        Err(e) => return failure(config, "Failed to update message", &e),
    }

    match BirthdayMessage::find_by_id(db, id) {
        Ok(Some(message)) => ok(json!({
            "message": "Message updated successfully",
            "data": message,
        })),
        Ok(None) => not_found("Message not found"),
        Err(e) => failure(config, "Failed to fetch message", &e),
    }
}

#[delete("/birthday/messages/<id>")]
pub fn delete_message(db: &State<Db>, config: &State<AppConfig>, id: &str) -> ApiResponse {
    match BirthdayMessage::delete(db, id) {
        Ok(summary) if summary.affected == 0 => not_found("Message not found"),
        Ok(_) => ok(json!({ "message": "Message deleted successfully" })),
        Err(e) => failure(config, "Failed to delete message", &e),
    }
}

#[post("/birthday/messages/<id>/like")]
pub fn like_message(db: &State<Db>, config: &State<AppConfig>, id: &str) -> ApiResponse {
    match BirthdayMessage::like(db, id) {
        Ok(summary) if summary.affected == 0 => not_found("Message not found"),
        Ok(_) => match BirthdayMessage::find_approved(db, id) {
            Ok(Some(message)) => ok(json!({ "likes": message.likes })),
            Ok(None) => not_found("Message not found"),
            Err(e) => failure(config, "Failed to fetch message", &e),
        },
        Err(e) => failure(config, "Failed to like message", &e),
    }
}

#[get("/birthday/random-message")]
pub fn random_message(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match BirthdayMessage::random_approved(db) {
        Ok(Some(message)) => ok(json!({ "message": message })),
        Ok(None) => not_found("No messages yet"),
        Err(e) => failure(config, "Failed to fetch random message", &e),
    }
}

#[get("/birthday/pending")]
pub fn pending(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match moderation::pending_items(db) {
        Ok(items) => ok(json!({
            "count": items.len(),
            "items": items,
        })),
        Err(e) => failure(config, "Failed to fetch pending content", &e),
    }
}

#[get("/birthday/stats")]
pub fn board_stats(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match moderation::board_stats(db) {
        Ok(stats) => ok(json!({ "stats": stats })),
        Err(e) => failure(config, "Failed to fetch board statistics", &e),
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        list_messages,
        list_all_messages,
        get_message,
        create_message,
        update_message,
        delete_message,
        like_message,
        random_message,
        pending,
        board_stats
    ]
}

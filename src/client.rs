//! Blocking client for the board's HTTP API.
//!
//! Every call either returns the parsed JSON body or a [`ClientError`]. Callers
//! that want to keep rendering when the server is away wrap a call with
//! [`or_fallback`] and get an explicit [`Content::Fallback`] back.

use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{json, Value};
use url::Url;

#[derive(Debug)]
pub enum ClientError {
    /// The request never produced a response.
    Network(String),
    /// Non-2xx response. `message` comes from the body when it carries one.
    Status { code: u16, message: String },
    Decode(String),
    Url(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Network(e) => write!(f, "request failed: {}", e),
            ClientError::Status { message, .. } => write!(f, "{}", message),
            ClientError::Decode(e) => write!(f, "invalid JSON response: {}", e),
            ClientError::Url(e) => write!(f, "invalid URL: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

/// Error text for a non-2xx response: the body's `message`, then its `error`,
/// then a generic line naming the status.
pub fn error_message(code: u16, body: Option<&Value>) -> String {
    body.and_then(|b| {
        b.get("message")
            .and_then(Value::as_str)
            .or_else(|| b.get("error").and_then(Value::as_str))
    })
    .map(str::to_string)
    .unwrap_or_else(|| format!("HTTP error! status: {}", code))
}

pub struct ApiClient {
    base: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base).map_err(|e| ClientError::Url(e.to_string()))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Network(format!("HTTP client error: {}", e)))?;
        Ok(ApiClient { base, http })
    }

    /// Appends `endpoint` to the base URL, keeping any path prefix the base has.
    pub fn url_for(&self, endpoint: &str) -> Result<Url, ClientError> {
        let base = self.base.as_str().trim_end_matches('/');
        let endpoint = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{}", endpoint)
        };
        Url::parse(&format!("{}{}", base, endpoint)).map_err(|e| ClientError::Url(e.to_string()))
    }

    pub fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = self.url_for(endpoint)?;
        let mut req = self
            .http
            .request(method, url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().map_err(|e| {
            log::warn!("API request to {} failed: {}", endpoint, e);
            ClientError::Network(e.to_string())
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.json::<Value>().ok();
            return Err(ClientError::Status {
                code: status.as_u16(),
                message: error_message(status.as_u16(), body.as_ref()),
            });
        }

        resp.json::<Value>()
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn get(&self, endpoint: &str) -> Result<Value, ClientError> {
        self.request(Method::GET, endpoint, None)
    }

    // ── Server ─────────────────────────────────────────

    pub fn server_info(&self) -> Result<Value, ClientError> {
        self.get("/")
    }

    pub fn status(&self) -> Result<Value, ClientError> {
        self.get("/api/status")
    }

    pub fn health(&self) -> Result<Value, ClientError> {
        self.get("/api/health")
    }

    pub fn analytics(&self) -> Result<Value, ClientError> {
        self.get("/api/analytics")
    }

    pub fn is_online(&self) -> bool {
        self.status().is_ok()
    }

    // ── Messages ───────────────────────────────────────

    pub fn birthday_messages(&self) -> Result<Value, ClientError> {
        self.get("/api/birthday/messages")
    }

    pub fn add_birthday_message(&self, message: &str, author: &str) -> Result<Value, ClientError> {
        let body = json!({ "message": message, "author": author });
        self.request(Method::POST, "/api/birthday/messages", Some(&body))
    }

    pub fn random_birthday_message(&self) -> Result<Value, ClientError> {
        self.get("/api/birthday/random-message")
    }

    // ── Visitors ───────────────────────────────────────

    pub fn track_visitor(&self, name: &str) -> Result<Value, ClientError> {
        self.request(Method::POST, "/api/visitors", Some(&json!({ "name": name })))
    }

    pub fn visitors(&self) -> Result<Value, ClientError> {
        self.get("/api/visitors")
    }

    // ── Wishes ─────────────────────────────────────────

    pub fn add_birthday_wish(
        &self,
        name: &str,
        wish: &str,
        email: Option<&str>,
    ) -> Result<Value, ClientError> {
        let body = json!({ "name": name, "wish": wish, "email": email });
        self.request(Method::POST, "/api/wishes", Some(&body))
    }

    pub fn birthday_wishes(&self) -> Result<Value, ClientError> {
        self.get("/api/wishes")
    }

    // ── Gallery ────────────────────────────────────────

    pub fn gallery_images(&self) -> Result<Value, ClientError> {
        self.get("/api/gallery")
    }

    pub fn add_gallery_image(&self, image: &Value) -> Result<Value, ClientError> {
        self.request(Method::POST, "/api/gallery", Some(image))
    }

    pub fn update_gallery_image(&self, id: &str, image: &Value) -> Result<Value, ClientError> {
        self.request(Method::PUT, &format!("/api/gallery/{}", id), Some(image))
    }

    pub fn delete_gallery_image(&self, id: &str) -> Result<Value, ClientError> {
        self.request(Method::DELETE, &format!("/api/gallery/{}", id), None)
    }

    // ── With static fallback ───────────────────────────

    /// Texts of the approved messages, or the built-in set when the server
    /// cannot be reached.
    pub fn message_texts(&self) -> Content<Vec<String>> {
        let remote = self.birthday_messages().map(|body| {
            body.get("messages")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(|m| m.get("message").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        });
        or_fallback(remote, fallback::messages)
    }

    pub fn random_message_text(&self) -> Content<String> {
        let remote = self.random_birthday_message().and_then(|body| {
            body.pointer("/message/message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ClientError::Decode("response has no message text".into()))
        });
        or_fallback(remote, fallback::random_message)
    }
}

/// Where a piece of content came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content<T> {
    Remote(T),
    Fallback(T),
}

impl<T> Content<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Content::Fallback(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Content::Remote(v) | Content::Fallback(v) => v,
        }
    }
}

pub fn or_fallback<T>(result: Result<T, ClientError>, fallback: impl FnOnce() -> T) -> Content<T> {
    match result {
        Ok(value) => Content::Remote(value),
        Err(e) => {
            log::warn!("Using built-in content: {}", e);
            Content::Fallback(fallback())
        }
    }
}

pub mod fallback {
    use rand::seq::SliceRandom;

    pub const MESSAGES: [&str; 4] = [
        "May your special day be filled with happiness, laughter, and love! 🎉",
        "Wishing you a year ahead full of adventure, joy, and beautiful moments! ✨",
        "Here's to celebrating the amazing person you are today and always! 💖",
        "May all your birthday wishes come true and your dreams take flight! 🌟",
    ];

    pub fn messages() -> Vec<String> {
        MESSAGES.iter().map(|m| m.to_string()).collect()
    }

    pub fn random_message() -> String {
        MESSAGES
            .choose(&mut rand::thread_rng())
            .unwrap_or(&MESSAGES[0])
            .to_string()
    }
}

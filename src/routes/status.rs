use std::time::Instant;

use chrono::Utc;
use rocket::State;
use serde_json::json;

use super::{ok, ApiResponse};
use crate::config::AppConfig;

/// Process start, kept in managed state for uptime reporting.
pub struct Uptime(Instant);

impl Uptime {
    pub fn start() -> Self {
        Uptime(Instant::now())
    }

    pub fn secs(&self) -> u64 {
        self.0.elapsed().as_secs()
    }

    pub fn human(&self) -> String {
        let secs = self.secs();
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        let mins = (secs % 3600) / 60;
        if days > 0 {
            format!("{}d {}h {}m", days, hours, mins)
        } else if hours > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}m", mins)
        }
    }
}

// Ranked below the static file server so a built frontend's index.html wins.
#[get("/", rank = 11)]
pub fn index(config: &State<AppConfig>) -> ApiResponse {
    ok(json!({
        "name": config.server_name,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": config.environment,
        "endpoints": {
            "gallery": "/api/gallery",
            "messages": "/api/birthday/messages",
            "random_message": "/api/birthday/random-message",
            "wishes": "/api/wishes",
            "visitors": "/api/visitors",
            "analytics": "/api/analytics",
            "health": "/api/health",
            "status": "/api/status",
        },
    }))
}

#[get("/health")]
pub fn health(uptime: &State<Uptime>) -> ApiResponse {
    ok(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": uptime.secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
    }))
}

#[get("/status")]
pub fn status(config: &State<AppConfig>, uptime: &State<Uptime>) -> ApiResponse {
    ok(json!({
        "status": "running",
        "server": config.server_name,
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": uptime.human(),
        "environment": config.environment,
    }))
}

/// Mounted at `/`.
pub fn root_routes() -> Vec<rocket::Route> {
    routes![index]
}

/// Mounted at `/api`.
pub fn routes() -> Vec<rocket::Route> {
    routes![health, status]
}

use rocket::figment::Figment;
use serde::Deserialize;

/// Application settings, read from `Rocket.toml` and `ROCKET_*` environment
/// variables alongside Rocket's own keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: String,
    pub static_dir: String,
    pub cors_origins: Vec<String>,
    /// "production" hides failure detail from response bodies.
    pub environment: String,
    /// Publish submitted messages and wishes immediately.
    pub auto_approve: bool,
    pub max_message_length: usize,
    pub max_wish_length: usize,
    pub visitor_retention_days: i64,
    pub analytics_retention_days: i64,
    pub server_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: "data/birthday.db".to_string(),
            static_dir: "dist".to_string(),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            environment: "development".to_string(),
            auto_approve: true,
            max_message_length: 500,
            max_wish_length: 1000,
            visitor_retention_days: 180,
            analytics_retention_days: 365,
            server_name: "Birthday Board".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> Self {
        match figment.extract::<AppConfig>() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid application config, using defaults: {}", e);
                AppConfig::default()
            }
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        self.cors_origins.iter().any(|o| o == "*" || o == origin)
    }
}

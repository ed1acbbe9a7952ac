use chrono::NaiveDate;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::json;

use super::{bad_request, failure, ok, required, ApiResponse};
use crate::config::AppConfig;
use crate::db::Db;
use crate::models::analytics::{self, AnalyticsMetric};

#[derive(Debug, Deserialize)]
pub struct MetricInput {
    pub metric_name: Option<String>,
    pub metric_value: Option<f64>,
}

/// Counts only; repeated reads without writes return identical bodies.
#[get("/analytics")]
pub fn dashboard(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match analytics::dashboard(db) {
        Ok(dashboard) => ok(json!({ "analytics": dashboard })),
        Err(e) => failure(config, "Failed to fetch analytics", &e),
    }
}

#[get("/analytics/metrics?<from>&<to>")]
pub fn metrics(
    db: &State<Db>,
    config: &State<AppConfig>,
    from: Option<&str>,
    to: Option<&str>,
) -> ApiResponse {
    let result = match (from, to) {
        (None, None) => AnalyticsMetric::all(db),
        (Some(from), Some(to))
            if NaiveDate::parse_from_str(from, "%Y-%m-%d").is_ok()
                && NaiveDate::parse_from_str(to, "%Y-%m-%d").is_ok() =>
        {
            AnalyticsMetric::by_date_range(db, from, to)
        }
        _ => return bad_request("from and to must both be dates formatted YYYY-MM-DD"),
    };

    match result {
        Ok(rows) => ok(json!({
            "count": rows.len(),
            "metrics": rows,
        })),
        Err(e) => failure(config, "Failed to fetch metrics", &e),
    }
}

#[get("/analytics/current")]
pub fn current(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match AnalyticsMetric::current(db) {
        Ok(rows) => ok(json!({ "metrics": rows })),
        Err(e) => failure(config, "Failed to fetch current metrics", &e),
    }
}

#[post("/analytics/metrics", data = "<body>")]
pub fn record_metric(
    db: &State<Db>,
    config: &State<AppConfig>,
    body: Json<MetricInput>,
) -> ApiResponse {
    let (name, value) = match (required(&body.metric_name), body.metric_value) {
        (Some(name), Some(value)) if value.is_finite() => (name, value),
        _ => return bad_request("metric_name and a numeric metric_value are required"),
    };

    match AnalyticsMetric::upsert(db, name, value) {
        Ok(_) => ok(json!({
            "message": "Metric recorded",
            "metric_name": name,
            "metric_value": value,
        })),
        Err(e) => failure(config, "Failed to record metric", &e),
    }
}

#[get("/analytics/growth")]
pub fn growth(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match analytics::growth(db) {
        Ok(rows) => ok(json!({ "growth": rows })),
        Err(e) => failure(config, "Failed to fetch growth", &e),
    }
}

#[get("/analytics/hourly")]
pub fn hourly(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match analytics::hourly_today(db) {
        Ok(rows) => ok(json!({ "hourly": rows })),
        Err(e) => failure(config, "Failed to fetch hourly visitors", &e),
    }
}

#[get("/analytics/weekly")]
pub fn weekly(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match analytics::weekly(db) {
        Ok(rows) => ok(json!({ "weekly": rows })),
        Err(e) => failure(config, "Failed to fetch weekly pattern", &e),
    }
}

#[get("/analytics/content")]
pub fn content(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match analytics::content_stats(db) {
        Ok(rows) => ok(json!({ "content": rows })),
        Err(e) => failure(config, "Failed to fetch content statistics", &e),
    }
}

#[get("/analytics/top-content?<limit>")]
pub fn top_content(
    db: &State<Db>,
    config: &State<AppConfig>,
    limit: Option<i64>,
) -> ApiResponse {
    let limit = limit.unwrap_or(10).clamp(1, 100);
    match analytics::top_content(db, limit) {
        Ok(rows) => ok(json!({ "content": rows })),
        Err(e) => failure(config, "Failed to fetch top content", &e),
    }
}

#[get("/analytics/health")]
pub fn health(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match analytics::system_health(db) {
        Ok(rows) => ok(json!({ "health": rows })),
        Err(e) => failure(config, "Failed to fetch system health", &e),
    }
}

#[post("/analytics/refresh")]
pub fn refresh(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match AnalyticsMetric::refresh_totals(db) {
        Ok(refreshed) => ok(json!({
            "message": "Metrics refreshed",
            "refreshed": refreshed,
        })),
        Err(e) => failure(config, "Failed to refresh metrics", &e),
    }
}

#[delete("/analytics/cleanup?<days>")]
pub fn cleanup(db: &State<Db>, config: &State<AppConfig>, days: Option<i64>) -> ApiResponse {
    let days = days.unwrap_or(config.analytics_retention_days);
    if days < 1 {
        return bad_request("days must be at least 1");
    }
    match AnalyticsMetric::cleanup_older_than(db, days) {
        Ok(summary) => ok(json!({
            "message": format!("Removed metrics older than {} days", days),
            "deleted": summary.affected,
        })),
        Err(e) => failure(config, "Failed to clean up metrics", &e),
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        dashboard,
        metrics,
        current,
        record_metric,
        growth,
        hourly,
        weekly,
        content,
        top_content,
        health,
        refresh,
        cleanup
    ]
}

use chrono::NaiveDate;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::json;

use super::{bad_request, created, failure, not_found, ok, ApiResponse};
use crate::client_info::{parse_user_agent, ClientInfo};
use crate::config::AppConfig;
use crate::db::Db;
use crate::models::visitor::{Visitor, VisitorForm, VisitorPatch};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 1000;

/// Optional details a page can add to its visit.
#[derive(Debug, Deserialize, Default)]
pub struct NewVisit {
    pub name: Option<String>,
    pub session_id: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

fn valid_day(day: &str) -> bool {
    NaiveDate::parse_from_str(day, "%Y-%m-%d").is_ok()
}

#[get("/visitors?<limit>")]
pub fn list_visitors(
    db: &State<Db>,
    config: &State<AppConfig>,
    limit: Option<i64>,
) -> ApiResponse {
    let result = match limit {
        Some(_) => Visitor::recent(db, clamp_limit(limit, DEFAULT_LIMIT)),
        None => Visitor::list(db),
    };
    match result {
        Ok(visitors) => ok(json!({
            "count": visitors.len(),
            "visitors": visitors,
        })),
        Err(e) => failure(config, "Failed to fetch visitors", &e),
    }
}

#[post("/visitors", data = "<body>")]
pub fn record_visit(
    db: &State<Db>,
    config: &State<AppConfig>,
    client: ClientInfo,
    body: Option<Json<NewVisit>>,
) -> ApiResponse {
    let body = body.map(Json::into_inner).unwrap_or_default();
    let device = client.user_agent.as_deref().map(parse_user_agent);

    let form = VisitorForm {
        name: body.name,
        ip_address: client.ip,
        user_agent: client.user_agent.clone(),
        session_id: body.session_id,
        referrer: client.referrer,
        country: body.country,
        city: body.city,
        device_type: device.as_ref().map(|d| d.device_type.to_string()),
        browser: device.as_ref().map(|d| d.browser.to_string()),
        os: device.as_ref().map(|d| d.os.to_string()),
    };

    match Visitor::record(db, &form) {
        Ok(visitor) => created(json!({
            "message": "Visit recorded",
            "visitor": visitor,
        })),
        Err(e) => failure(config, "Failed to record visit", &e),
    }
}

#[get("/visitors/stats")]
pub fn visitor_stats(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match Visitor::stats(db) {
        Ok(stats) => ok(json!({ "stats": stats })),
        Err(e) => failure(config, "Failed to fetch visitor statistics", &e),
    }
}

#[get("/visitors/dashboard")]
pub fn visitor_dashboard(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match Visitor::dashboard(db) {
        Ok(dashboard) => ok(json!({ "dashboard": dashboard })),
        Err(e) => failure(config, "Failed to fetch visitor dashboard", &e),
    }
}

#[get("/visitors/daily?<days>")]
pub fn daily_visitors(
    db: &State<Db>,
    config: &State<AppConfig>,
    days: Option<i64>,
) -> ApiResponse {
    let days = days.unwrap_or(30).clamp(1, 365);
    match Visitor::daily(db, days) {
        Ok(rows) => ok(json!({ "days": days, "daily": rows })),
        Err(e) => failure(config, "Failed to fetch daily visitors", &e),
    }
}

#[get("/visitors/monthly")]
pub fn monthly_visitors(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match Visitor::monthly(db) {
        Ok(rows) => ok(json!({ "monthly": rows })),
        Err(e) => failure(config, "Failed to fetch monthly visitors", &e),
    }
}

#[get("/visitors/top?<limit>")]
pub fn top_visitors(
    db: &State<Db>,
    config: &State<AppConfig>,
    limit: Option<i64>,
) -> ApiResponse {
    match Visitor::top(db, clamp_limit(limit, 10)) {
        Ok(rows) => ok(json!({ "visitors": rows })),
        Err(e) => failure(config, "Failed to fetch top visitors", &e),
    }
}

#[get("/visitors/devices")]
pub fn devices(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match Visitor::device_breakdown(db) {
        Ok(rows) => ok(json!({ "devices": rows })),
        Err(e) => failure(config, "Failed to fetch device breakdown", &e),
    }
}

#[get("/visitors/countries")]
pub fn countries(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match Visitor::by_country(db) {
        Ok(rows) => ok(json!({ "countries": rows })),
        Err(e) => failure(config, "Failed to fetch visitor countries", &e),
    }
}

#[get("/visitors/range?<from>&<to>")]
pub fn visitors_in_range(
    db: &State<Db>,
    config: &State<AppConfig>,
    from: Option<&str>,
    to: Option<&str>,
) -> ApiResponse {
    let (from, to) = match (from, to) {
        (Some(from), Some(to)) if valid_day(from) && valid_day(to) => (from, to),
        _ => return bad_request("from and to must be dates formatted YYYY-MM-DD"),
    };
    match Visitor::by_date_range(db, from, to) {
        Ok(visitors) => ok(json!({
            "from": from,
            "to": to,
            "count": visitors.len(),
            "visitors": visitors,
        })),
        Err(e) => failure(config, "Failed to fetch visitors", &e),
    }
}

#[get("/visitors/by-ip")]
pub fn visitors_by_ip(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match Visitor::unique_by_ip(db) {
        Ok(rows) => ok(json!({ "addresses": rows })),
        Err(e) => failure(config, "Failed to fetch visitors by address", &e),
    }
}

#[get("/visitors/sessions")]
pub fn sessions(db: &State<Db>, config: &State<AppConfig>) -> ApiResponse {
    match Visitor::sessions(db) {
        Ok(rows) => ok(json!({ "sessions": rows })),
        Err(e) => failure(config, "Failed to fetch sessions", &e),
    }
}

#[delete("/visitors/cleanup?<days>")]
pub fn cleanup(db: &State<Db>, config: &State<AppConfig>, days: Option<i64>) -> ApiResponse {
    let days = days.unwrap_or(config.visitor_retention_days);
    if days < 1 {
        return bad_request("days must be at least 1");
    }
    match Visitor::cleanup_older_than(db, days) {
        Ok(summary) => ok(json!({
            "message": format!("Removed visits older than {} days", days),
            "deleted": summary.affected,
        })),
        Err(e) => failure(config, "Failed to clean up visitors", &e),
    }
}

#[get("/visitors/<id>")]
pub fn get_visitor(db: &State<Db>, config: &State<AppConfig>, id: &str) -> ApiResponse {
    match Visitor::find_by_id(db, id) {
        Ok(Some(visitor)) => ok(json!({ "visitor": visitor })),
        Ok(None) => not_found("Visitor not found"),
        Err(e) => failure(config, "Failed to fetch visitor", &e),
    }
}

#[put("/visitors/<id>", data = "<body>")]
pub fn update_visitor(
    db: &State<Db>,
    config: &State<AppConfig>,
    id: &str,
    body: Json<VisitorPatch>,
) -> ApiResponse {
    match Visitor::update(db, id, &body) {
        Ok(summary) if summary.affected == 0 => return not_found("Visitor not found"),
        Ok(_) => {}
        Err(e) => return failure(config, "Failed to update visitor", &e),
    }

    match Visitor::find_by_id(db, id) {
        Ok(Some(visitor)) => ok(json!({
            "message": "Visitor updated successfully",
            "visitor": visitor,
        })),
        Ok(None) => not_found("Visitor not found"),
        Err(e) => failure(config, "Failed to fetch visitor", &e),
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        list_visitors,
        record_visit,
        visitor_stats,
        visitor_dashboard,
        daily_visitors,
        monthly_visitors,
        top_visitors,
        devices,
        countries,
        visitors_in_range,
        visitors_by_ip,
        sessions,
        cleanup,
        get_visitor,
        update_visitor
    ]
}

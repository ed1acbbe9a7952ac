#![cfg(test)]

use std::collections::HashSet;

use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::Client;
use serde_json::{json, Value};

use crate::build_rocket;
use crate::client::{error_message, fallback, or_fallback, ApiClient, ClientError, Content};
use crate::client_info::{extract_domain, parse_user_agent};
use crate::config::AppConfig;
use crate::db::{update_statement, Db, DbError};
use crate::models::analytics::{self, AnalyticsMetric};
use crate::models::gallery::{GalleryForm, GalleryImage, GalleryPatch};
use crate::models::message::{BirthdayMessage, MessageForm, MessagePatch};
use crate::models::moderation;
use crate::models::visitor::{Visitor, VisitorForm, VisitorPatch};
use crate::models::wish::{BirthdayWish, WishForm, WishPatch};

/// Atomic counter for unique shared-cache DB names so parallel tests don't collide.
static TEST_DB_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

/// Fresh in-memory database with the schema applied. Named shared-cache so every
/// pooled connection sees the same data.
fn test_db() -> Db {
    let id = TEST_DB_COUNTER.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    let db = Db::open(&format!("file:birthday_test_{}?mode=memory&cache=shared", id));
    db.run_migrations().expect("Failed to run migrations");
    db
}

fn test_config() -> AppConfig {
    AppConfig {
        static_dir: "target/no-frontend-build".to_string(),
        ..AppConfig::default()
    }
}

fn client_with(config: AppConfig, db: &Db) -> Client {
    Client::tracked(build_rocket(config, db.clone())).expect("valid rocket instance")
}

fn image_form(src: &str) -> GalleryForm {
    GalleryForm {
        src: src.to_string(),
        ..GalleryForm::default()
    }
}

fn message_form(text: &str, approved: bool) -> MessageForm {
    MessageForm {
        message: text.to_string(),
        is_approved: approved,
        ..MessageForm::default()
    }
}

fn count(db: &Db, table: &str) -> i64 {
    db.single(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
        .unwrap()
}

// ═══════════════════════════════════════════════════════════
// Data access
// ═══════════════════════════════════════════════════════════

#[test]
fn update_statement_keeps_field_order() {
    let patch = GalleryPatch {
        height: Some(600),
        alt: Some("cake".to_string()),
        src: Some("cake.jpg".to_string()),
        ..GalleryPatch::default()
    };
    let (sql, values) = update_statement("gallery_images", "abc", &patch).unwrap();
    assert_eq!(
        sql,
        "UPDATE gallery_images SET src = ?1, alt = ?2, height = ?3, \
         updated_at = CURRENT_TIMESTAMP WHERE id = ?4"
    );
    assert_eq!(values.len(), 4);
}

#[test]
fn update_statement_rejects_empty_patch() {
    let result = update_statement("birthday_messages", "abc", &MessagePatch::default());
    assert!(matches!(result, Err(DbError::EmptyUpdate)));
}

#[test]
fn empty_update_writes_nothing() {
    let db = test_db();
    let image = GalleryImage::create(&db, &image_form("x.jpg")).unwrap();

    let result = GalleryImage::update(&db, &image.id, &GalleryPatch::default());
    assert!(matches!(result, Err(DbError::EmptyUpdate)));

    let stored = GalleryImage::find_by_id(&db, &image.id).unwrap().unwrap();
    assert_eq!(stored, image);
}

#[test]
fn pool_opens_lazily() {
    let db = Db::open("file:birthday_lazy?mode=memory&cache=shared");
    assert_eq!(db.open_connections(), 0);
    db.run_migrations().unwrap();
    assert!(db.open_connections() >= 1);
}

#[test]
fn query_errors_become_values() {
    let db = test_db();
    let result = db.query("SELECT * FROM no_such_table", [], |r| r.get::<_, i64>(0));
    match result {
        Err(DbError::Query(msg)) => assert!(msg.contains("no_such_table")),
        other => panic!("expected query error, got {:?}", other.map(|v| v.len())),
    }
}

// ═══════════════════════════════════════════════════════════
// Gallery
// ═══════════════════════════════════════════════════════════

#[test]
fn gallery_ids_are_unique() {
    let db = test_db();
    let ids: HashSet<String> = (0..25)
        .map(|i| GalleryImage::create(&db, &image_form(&format!("{}.jpg", i))).unwrap().id)
        .collect();
    assert_eq!(ids.len(), 25);
}

#[test]
fn gallery_create_fills_defaults() {
    let db = test_db();
    let form = GalleryForm {
        width: Some(1920),
        height: Some(1080),
        metadata: Some(json!({"category": "party"})),
        ..image_form("party.jpg")
    };
    let image = GalleryImage::create(&db, &form).unwrap();
    assert_eq!(image.alt, "");
    assert!(image.is_active);
    assert_eq!(image.aspect_ratio, Some(1.78));

    let stored = GalleryImage::find_by_id(&db, &image.id).unwrap().unwrap();
    assert_eq!(stored.metadata["category"], "party");
    assert_eq!(stored.aspect_ratio, Some(1.78));
}

#[test]
fn gallery_soft_then_permanent_delete() {
    let db = test_db();
    let image = GalleryImage::create(&db, &image_form("x.jpg")).unwrap();

    GalleryImage::soft_delete(&db, &image.id).unwrap();
    assert!(GalleryImage::list_active(&db).unwrap().is_empty());
    assert!(GalleryImage::find_by_id(&db, &image.id).unwrap().is_none());
    let stored = GalleryImage::find_stored(&db, &image.id).unwrap().unwrap();
    assert!(!stored.is_active);

    let summary = GalleryImage::permanent_delete(&db, &image.id).unwrap();
    assert_eq!(summary.affected, 1);
    assert!(GalleryImage::find_stored(&db, &image.id).unwrap().is_none());
}

#[test]
fn gallery_by_category_and_stats() {
    let db = test_db();
    let party = GalleryForm {
        metadata: Some(json!({"category": "party"})),
        mime_type: Some("image/jpeg".to_string()),
        file_size: Some(1000),
        ..image_form("a.jpg")
    };
    let other = GalleryForm {
        mime_type: Some("image/png".to_string()),
        file_size: Some(3000),
        ..image_form("b.png")
    };
    GalleryImage::create(&db, &party).unwrap();
    GalleryImage::create(&db, &other).unwrap();

    let found = GalleryImage::by_category(&db, "party").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].src, "a.jpg");

    let stats = GalleryImage::stats(&db).unwrap();
    assert_eq!(stats.total_images, 2);
    assert_eq!(stats.active_images, 2);
    assert_eq!(stats.jpeg_count, 1);
    assert_eq!(stats.png_count, 1);
    assert_eq!(stats.total_size, Some(4000));
    assert_eq!(stats.avg_file_size, Some(2000.0));
}

// ═══════════════════════════════════════════════════════════
// Messages, wishes, moderation
// ═══════════════════════════════════════════════════════════

#[test]
fn message_create_trims_and_defaults_author() {
    let db = test_db();
    let form = MessageForm {
        author: Some("   ".to_string()),
        ..message_form("  Happy birthday!  ", true)
    };
    let message = BirthdayMessage::create(&db, &form).unwrap();
    assert_eq!(message.message, "Happy birthday!");
    assert_eq!(message.author, "Anonymous");
    assert_eq!(message.likes, 0);
    assert_eq!(message.message_length, 15);
}

#[test]
fn random_message_is_always_approved() {
    let db = test_db();
    let approved = BirthdayMessage::create(&db, &message_form("visible", true)).unwrap();
    for i in 0..5 {
        BirthdayMessage::create(&db, &message_form(&format!("hidden {}", i), false)).unwrap();
    }
    for _ in 0..20 {
        let picked = BirthdayMessage::random_approved(&db).unwrap().unwrap();
        assert_eq!(picked.id, approved.id);
        assert!(picked.is_approved);
    }
}

#[test]
fn random_message_none_without_approved() {
    let db = test_db();
    BirthdayMessage::create(&db, &message_form("pending", false)).unwrap();
    assert!(BirthdayMessage::random_approved(&db).unwrap().is_none());
}

#[test]
fn public_listing_hides_pending_and_provenance() {
    let db = test_db();
    let form = MessageForm {
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: Some("test-agent".to_string()),
        ..message_form("hello", true)
    };
    BirthdayMessage::create(&db, &form).unwrap();
    BirthdayMessage::create(&db, &message_form("waiting", false)).unwrap();

    let public = BirthdayMessage::list_approved(&db).unwrap();
    assert_eq!(public.len(), 1);
    assert!(public[0].ip_address.is_none());

    let all = BirthdayMessage::list_all(&db).unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|m| m.ip_address.as_deref() == Some("203.0.113.7")));
}

#[test]
fn message_search_and_author_filter() {
    let db = test_db();
    let sarah = MessageForm {
        author: Some("Sarah".to_string()),
        ..message_form("Have an amazing day", true)
    };
    BirthdayMessage::create(&db, &sarah).unwrap();
    BirthdayMessage::create(&db, &message_form("Cake time!", true)).unwrap();

    assert_eq!(BirthdayMessage::by_author(&db, "Sarah").unwrap().len(), 1);
    let found = BirthdayMessage::search(&db, "cake").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "Cake time!");
}

#[test]
fn search_takes_wildcards_literally() {
    let db = test_db();
    BirthdayMessage::create(&db, &message_form("Have an amazing day", true)).unwrap();
    BirthdayMessage::create(&db, &message_form("Cake time!", true)).unwrap();

    assert!(BirthdayMessage::search(&db, "%").unwrap().is_empty());
    assert!(BirthdayMessage::search(&db, "_").unwrap().is_empty());
    assert!(BirthdayWish::search(&db, "%").unwrap().is_empty());

    BirthdayMessage::create(&db, &message_form("50% more cake", true)).unwrap();
    let found = BirthdayMessage::search(&db, "50%").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "50% more cake");
}

#[test]
fn find_approved_skips_pending() {
    let db = test_db();
    let pending = BirthdayMessage::create(&db, &message_form("waiting", false)).unwrap();
    let shown = BirthdayMessage::create(&db, &message_form("hello", true)).unwrap();

    assert!(BirthdayMessage::find_approved(&db, &pending.id).unwrap().is_none());
    assert!(BirthdayMessage::find_by_id(&db, &pending.id).unwrap().is_some());
    let found = BirthdayMessage::find_approved(&db, &shown.id).unwrap().unwrap();
    assert_eq!(found.message, "hello");
}

#[test]
fn message_like_and_update() {
    let db = test_db();
    let message = BirthdayMessage::create(&db, &message_form("hi", false)).unwrap();

    assert_eq!(BirthdayMessage::like(&db, &message.id).unwrap().affected, 0);
    let patch = MessagePatch {
        is_approved: Some(true),
        ..MessagePatch::default()
    };
    assert_eq!(BirthdayMessage::update(&db, &message.id, &patch).unwrap().affected, 1);
    BirthdayMessage::like(&db, &message.id).unwrap();
    BirthdayMessage::like(&db, &message.id).unwrap();

    let stored = BirthdayMessage::find_by_id(&db, &message.id).unwrap().unwrap();
    assert_eq!(stored.likes, 2);
    assert!(stored.is_approved);
}

#[test]
fn unknown_ids_update_nothing() {
    let db = test_db();
    let message = MessagePatch {
        message: Some("x".to_string()),
        ..MessagePatch::default()
    };
    let wish = WishPatch {
        wish: Some("x".to_string()),
        ..WishPatch::default()
    };
    let visitor = VisitorPatch {
        city: Some("Lyon".to_string()),
        ..VisitorPatch::default()
    };
    assert_eq!(BirthdayMessage::update(&db, "missing", &message).unwrap().affected, 0);
    assert_eq!(BirthdayWish::update(&db, "missing", &wish).unwrap().affected, 0);
    assert_eq!(Visitor::update(&db, "missing", &visitor).unwrap().affected, 0);
    assert!(BirthdayMessage::find_by_id(&db, "missing").unwrap().is_none());
}

#[test]
fn wish_create_normalizes_email() {
    let db = test_db();
    let form = WishForm {
        name: " Mike ".to_string(),
        wish: "More cake".to_string(),
        email: Some("  ".to_string()),
        is_approved: true,
        ..WishForm::default()
    };
    let wish = BirthdayWish::create(&db, &form).unwrap();
    assert_eq!(wish.name, "Mike");
    assert!(wish.email.is_none());
    assert_eq!(wish.wish_length, 9);
    assert_eq!(BirthdayWish::by_name(&db, "Mike").unwrap().len(), 1);
    assert_eq!(BirthdayWish::search(&db, "cake").unwrap().len(), 1);
}

#[test]
fn pending_items_cover_messages_and_wishes() {
    let db = test_db();
    BirthdayMessage::create(&db, &message_form("waiting", false)).unwrap();
    BirthdayMessage::create(&db, &message_form("live", true)).unwrap();
    let wish = WishForm {
        name: "Emma".to_string(),
        wish: "Travel far".to_string(),
        ..WishForm::default()
    };
    BirthdayWish::create(&db, &wish).unwrap();

    let pending = moderation::pending_items(&db).unwrap();
    assert_eq!(pending.len(), 2);
    let kinds: HashSet<&str> = pending.iter().map(|p| p.kind.as_str()).collect();
    assert!(kinds.contains("message") && kinds.contains("wish"));

    let stats = moderation::board_stats(&db).unwrap();
    assert_eq!(stats.total_messages, 1);
    assert_eq!(stats.pending_messages, 1);
    assert_eq!(stats.pending_wishes, 1);
    assert_eq!(stats.today_messages, 2);
}

// ═══════════════════════════════════════════════════════════
// Visitors
// ═══════════════════════════════════════════════════════════

#[test]
fn visitor_record_defaults_name() {
    let db = test_db();
    let visitor = Visitor::record(&db, &VisitorForm::default()).unwrap();
    assert_eq!(visitor.name, "Anonymous Visitor");
    assert_eq!(Visitor::find_by_id(&db, &visitor.id).unwrap().unwrap(), visitor);
}

#[test]
fn visitor_stats_and_breakdowns() {
    let db = test_db();
    for (ip, session, device) in [
        ("10.0.0.1", "s1", "mobile"),
        ("10.0.0.1", "s1", "mobile"),
        ("10.0.0.2", "s2", "desktop"),
    ] {
        let form = VisitorForm {
            ip_address: Some(ip.to_string()),
            session_id: Some(session.to_string()),
            device_type: Some(device.to_string()),
            country: Some("FR".to_string()),
            ..VisitorForm::default()
        };
        Visitor::record(&db, &form).unwrap();
    }

    let stats = Visitor::stats(&db).unwrap();
    assert_eq!(stats.total_visitors, 3);
    assert_eq!(stats.unique_visitors, 2);
    assert_eq!(stats.unique_sessions, 2);
    assert_eq!(stats.today_visitors, 3);

    let daily = Visitor::daily(&db, 7).unwrap();
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0].daily_visitors, 3);

    let countries = Visitor::by_country(&db).unwrap();
    assert_eq!(countries[0].country, "FR");
    assert_eq!(countries[0].visitor_count, 3);

    assert_eq!(Visitor::recent(&db, 2).unwrap().len(), 2);
    assert_eq!(Visitor::unique_by_ip(&db).unwrap().len(), 2);
    assert_eq!(Visitor::sessions(&db).unwrap().len(), 2);
    assert_eq!(Visitor::dashboard(&db).unwrap().device_types, 2);
}

#[test]
fn visitor_cleanup_removes_old_rows() {
    let db = test_db();
    db.command(
        "INSERT INTO visitors (id, name, visited_at) VALUES ('old', 'Old', DATETIME('now', '-400 days'))",
        [],
    )
    .unwrap();
    Visitor::record(&db, &VisitorForm::default()).unwrap();

    let summary = Visitor::cleanup_older_than(&db, 180).unwrap();
    assert_eq!(summary.affected, 1);
    assert_eq!(count(&db, "visitors"), 1);
    assert!(Visitor::find_by_id(&db, "old").unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════
// Analytics
// ═══════════════════════════════════════════════════════════

#[test]
fn metric_upsert_keeps_one_row_per_day() {
    let db = test_db();
    AnalyticsMetric::upsert(&db, "page_views", 10.0).unwrap();
    AnalyticsMetric::upsert(&db, "page_views", 12.5).unwrap();

    let current = AnalyticsMetric::current(&db).unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].metric_value, 12.5);
}

#[test]
fn refresh_totals_counts_sources() {
    let db = test_db();
    GalleryImage::create(&db, &image_form("x.jpg")).unwrap();
    BirthdayMessage::create(&db, &message_form("hi", true)).unwrap();

    assert_eq!(AnalyticsMetric::refresh_totals(&db).unwrap(), 4);
    let current = AnalyticsMetric::current(&db).unwrap();
    let value = |name: &str| {
        current
            .iter()
            .find(|m| m.metric_name == name)
            .map(|m| m.metric_value)
    };
    assert_eq!(value("total_images"), Some(1.0));
    assert_eq!(value("total_messages"), Some(1.0));
    assert_eq!(value("total_wishes"), Some(0.0));
}

#[test]
fn analytics_cleanup_drops_old_metrics() {
    let db = test_db();
    db.command(
        "INSERT INTO analytics (metric_name, metric_value, metric_date)
         VALUES ('old', 1, DATE('now', '-500 days'))",
        [],
    )
    .unwrap();
    AnalyticsMetric::upsert(&db, "fresh", 1.0).unwrap();

    assert_eq!(AnalyticsMetric::cleanup_older_than(&db, 365).unwrap().affected, 1);
    assert_eq!(AnalyticsMetric::all(&db).unwrap().len(), 1);
}

#[test]
fn analytics_dashboard_counts_public_content() {
    let db = test_db();
    BirthdayMessage::create(&db, &message_form("live", true)).unwrap();
    BirthdayMessage::create(&db, &message_form("pending", false)).unwrap();
    Visitor::record(&db, &VisitorForm::default()).unwrap();

    let dashboard = analytics::dashboard(&db).unwrap();
    assert_eq!(dashboard.total_messages, 1);
    assert_eq!(dashboard.total_visitors, 1);
    assert_eq!(dashboard.today_visitors, 1);
    assert_eq!(analytics::growth(&db).unwrap().len(), 3);
    assert_eq!(analytics::top_content(&db, 5).unwrap().len(), 1);
    assert_eq!(analytics::system_health(&db).unwrap()[1].status, "fresh");
}

// ═══════════════════════════════════════════════════════════
// Request details and config
// ═══════════════════════════════════════════════════════════

#[test]
fn user_agent_parsing() {
    let iphone = parse_user_agent(
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
         (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    );
    assert_eq!(iphone.device_type, "mobile");
    assert_eq!(iphone.browser, "Safari");
    assert_eq!(iphone.os, "iOS");

    let edge = parse_user_agent(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0 Safari/537.36 Edg/120.0",
    );
    assert_eq!(edge.device_type, "desktop");
    assert_eq!(edge.browser, "Edge");
    assert_eq!(edge.os, "Windows");

    let ipad = parse_user_agent("Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X) Mobile Safari");
    assert_eq!(ipad.device_type, "tablet");

    assert_eq!(parse_user_agent("curl/8.0").browser, "Other");
}

#[test]
fn referrer_domain_extraction() {
    assert_eq!(extract_domain("https://www.example.com/a/b?c=d"), "www.example.com");
    assert_eq!(extract_domain("not a url"), "not a url");
}

#[test]
fn config_origins_and_environment() {
    let mut config = AppConfig::default();
    assert!(config.allows_origin("http://localhost:5173"));
    assert!(!config.allows_origin("http://evil.test"));
    assert!(!config.is_production());

    config.cors_origins = vec!["*".to_string()];
    config.environment = "Production".to_string();
    assert!(config.allows_origin("http://anything.test"));
    assert!(config.is_production());
}

// ═══════════════════════════════════════════════════════════
// HTTP API
// ═══════════════════════════════════════════════════════════

#[test]
fn http_gallery_add_then_list() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client
        .post("/api/gallery")
        .header(ContentType::JSON)
        .body(r#"{"src": "x.jpg", "alt": "y"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Created);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Image added successfully");

    let resp = client.get("/api/gallery").dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["images"][0]["src"], "x.jpg");
    assert_eq!(body["images"][0]["alt"], "y");
}

#[test]
fn http_gallery_validation() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client
        .post("/api/gallery")
        .header(ContentType::JSON)
        .body(r#"{"alt": "no source"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::BadRequest);
    assert_eq!(count(&db, "gallery_images"), 0);

    let image = GalleryImage::create(&db, &image_form("x.jpg")).unwrap();
    let resp = client
        .put(format!("/api/gallery/{}", image.id))
        .header(ContentType::JSON)
        .body("{}")
        .dispatch();
    assert_eq!(resp.status(), Status::BadRequest);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["error"], "No fields to update");

    let resp = client
        .put("/api/gallery/unknown")
        .header(ContentType::JSON)
        .body(r#"{"alt": "z"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::NotFound);
}

#[test]
fn http_gallery_update_and_delete() {
    let db = test_db();
    let client = client_with(test_config(), &db);
    let image = GalleryImage::create(&db, &image_form("x.jpg")).unwrap();

    let resp = client
        .put(format!("/api/gallery/{}", image.id))
        .header(ContentType::JSON)
        .body(r#"{"alt": "updated", "metadata": {"category": "family"}}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["image"]["alt"], "updated");
    assert_eq!(body["image"]["metadata"]["category"], "family");

    let resp = client.delete(format!("/api/gallery/{}", image.id)).dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let resp = client.get(format!("/api/gallery/{}", image.id)).dispatch();
    assert_eq!(resp.status(), Status::NotFound);
    assert_eq!(count(&db, "gallery_images"), 1);
}

#[test]
fn http_gallery_update_keeps_source() {
    let db = test_db();
    let client = client_with(test_config(), &db);
    let image = GalleryImage::create(&db, &image_form("x.jpg")).unwrap();

    let resp = client
        .put(format!("/api/gallery/{}", image.id))
        .header(ContentType::JSON)
        .body(r#"{"src": "   "}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::BadRequest);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["error"], "Image source cannot be empty");

    let stored = GalleryImage::find_by_id(&db, &image.id).unwrap().unwrap();
    assert_eq!(stored.src, "x.jpg");
}

#[test]
fn http_gallery_delete_unknown_id() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client.delete("/api/gallery/nope").dispatch();
    assert_eq!(resp.status(), Status::NotFound);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["error"], "Image not found");
}

#[test]
fn http_message_rejects_blank_text() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    for body in [r#"{"message": ""}"#, r#"{"message": "   "}"#, r#"{"author": "Sarah"}"#] {
        let resp = client
            .post("/api/birthday/messages")
            .header(ContentType::JSON)
            .body(body)
            .dispatch();
        assert_eq!(resp.status(), Status::BadRequest);
        let json: Value = resp.into_json().unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Message is required");
    }
    assert_eq!(count(&db, "birthday_messages"), 0);
}

#[test]
fn http_message_rejects_overlong_text() {
    let db = test_db();
    let config = AppConfig {
        max_message_length: 10,
        ..test_config()
    };
    let client = client_with(config, &db);

    let resp = client
        .post("/api/birthday/messages")
        .header(ContentType::JSON)
        .body(r#"{"message": "this is far too long"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::BadRequest);
    assert_eq!(count(&db, "birthday_messages"), 0);
}

#[test]
fn http_message_records_provenance() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client
        .post("/api/birthday/messages")
        .header(ContentType::JSON)
        .header(Header::new("X-Forwarded-For", "203.0.113.9, 10.0.0.1"))
        .header(Header::new("User-Agent", "birthday-test"))
        .body(r#"{"message": "Happy birthday!", "author": "Sarah"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Created);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["data"]["author"], "Sarah");
    assert!(body["data"].get("ip_address").is_none());

    let stored = BirthdayMessage::list_all(&db).unwrap();
    assert_eq!(stored[0].ip_address.as_deref(), Some("203.0.113.9"));
    assert_eq!(stored[0].user_agent.as_deref(), Some("birthday-test"));
    assert!(stored[0].is_approved);
}

#[test]
fn http_message_moderation_off_keeps_pending() {
    let db = test_db();
    let config = AppConfig {
        auto_approve: false,
        ..test_config()
    };
    let client = client_with(config, &db);

    let resp = client
        .post("/api/birthday/messages")
        .header(ContentType::JSON)
        .body(r#"{"message": "waiting"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Created);

    let body: Value = client.get("/api/birthday/messages").dispatch().into_json().unwrap();
    assert_eq!(body["count"], 0);
    let body: Value = client.get("/api/birthday/pending").dispatch().into_json().unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(
        client.get("/api/birthday/random-message").dispatch().status(),
        Status::NotFound
    );
}

#[test]
fn http_pending_content_is_hidden_by_id() {
    let db = test_db();
    let config = AppConfig {
        auto_approve: false,
        ..test_config()
    };
    let client = client_with(config, &db);

    let resp = client
        .post("/api/birthday/messages")
        .header(ContentType::JSON)
        .body(r#"{"message": "secret pending"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Created);
    let resp = client
        .post("/api/wishes")
        .header(ContentType::JSON)
        .body(r#"{"name": "Emma", "wish": "secret wish"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Created);

    let message = &BirthdayMessage::list_all(&db).unwrap()[0];
    let wish = &BirthdayWish::list_all(&db).unwrap()[0];

    let resp = client.get(format!("/api/birthday/messages/{}", message.id)).dispatch();
    assert_eq!(resp.status(), Status::NotFound);
    let resp = client.post(format!("/api/birthday/messages/{}/like", message.id)).dispatch();
    assert_eq!(resp.status(), Status::NotFound);
    let resp = client.get(format!("/api/wishes/{}", wish.id)).dispatch();
    assert_eq!(resp.status(), Status::NotFound);
    assert_eq!(BirthdayMessage::find_by_id(&db, &message.id).unwrap().unwrap().likes, 0);

    let resp = client
        .put(format!("/api/birthday/messages/{}", message.id))
        .header(ContentType::JSON)
        .body(r#"{"is_approved": true}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = client
        .get(format!("/api/birthday/messages/{}", message.id))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(body["message"]["message"], "secret pending");
    let body: Value = client
        .post(format!("/api/birthday/messages/{}/like", message.id))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(body["likes"], 1);
}

#[test]
fn http_message_blank_author_becomes_anonymous() {
    let db = test_db();
    let client = client_with(test_config(), &db);
    let form = MessageForm {
        author: Some("Sarah".to_string()),
        ..message_form("hello", true)
    };
    let message = BirthdayMessage::create(&db, &form).unwrap();

    let resp = client
        .put(format!("/api/birthday/messages/{}", message.id))
        .header(ContentType::JSON)
        .body(r#"{"author": "   "}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["data"]["author"], "Anonymous");

    let stored = BirthdayMessage::find_by_id(&db, &message.id).unwrap().unwrap();
    assert_eq!(stored.author, "Anonymous");
}

#[test]
fn http_unknown_ids_are_not_found() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let cases = [
        ("/api/birthday/messages/nope", r#"{"message": "x"}"#),
        ("/api/wishes/nope", r#"{"wish": "x"}"#),
        ("/api/visitors/nope", r#"{"city": "Lyon"}"#),
    ];
    for (path, body) in cases {
        let resp = client.put(path).header(ContentType::JSON).body(body).dispatch();
        assert_eq!(resp.status(), Status::NotFound, "{}", path);
    }
    assert_eq!(
        client.post("/api/birthday/messages/nope/like").dispatch().status(),
        Status::NotFound
    );
}

#[test]
fn http_wish_requires_name_and_text() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client
        .post("/api/wishes")
        .header(ContentType::JSON)
        .body(r#"{"wish": "only a wish"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::BadRequest);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["error"], "Name and wish are required");

    let resp = client
        .post("/api/wishes")
        .header(ContentType::JSON)
        .body(r#"{"name": "Emma", "wish": "Many happy returns"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Created);
    let body: Value = client.get("/api/wishes").dispatch().into_json().unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["wishes"][0]["name"], "Emma");
}

#[test]
fn http_visitor_derives_device() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client
        .post("/api/visitors")
        .header(ContentType::JSON)
        .header(Header::new(
            "User-Agent",
            "Mozilla/5.0 (Linux; Android 14) AppleWebKit/537.36 Chrome/120.0 Mobile Safari/537.36",
        ))
        .header(Header::new("Referer", "https://friends.example.org/invite"))
        .body(r#"{"name": "Birthday App User", "session_id": "s-1"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Created);
    let body: Value = resp.into_json().unwrap();
    let visitor = &body["visitor"];
    assert_eq!(visitor["name"], "Birthday App User");
    assert_eq!(visitor["device_type"], "mobile");
    assert_eq!(visitor["browser"], "Chrome");
    assert_eq!(visitor["os"], "Android");
    assert_eq!(visitor["referrer"], "friends.example.org");

    // A visit without a body is still recorded.
    let resp = client.post("/api/visitors").dispatch();
    assert_eq!(resp.status(), Status::Created);
    assert_eq!(count(&db, "visitors"), 2);
}

#[test]
fn http_visitor_range_validates_dates() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client.get("/api/visitors/range?from=yesterday&to=today").dispatch();
    assert_eq!(resp.status(), Status::BadRequest);
    let resp = client.get("/api/visitors/range?from=2020-01-01&to=2099-12-31").dispatch();
    assert_eq!(resp.status(), Status::Ok);
}

#[test]
fn http_analytics_reads_are_identical() {
    let db = test_db();
    GalleryImage::create(&db, &image_form("x.jpg")).unwrap();
    BirthdayMessage::create(&db, &message_form("hi", true)).unwrap();
    let client = client_with(test_config(), &db);

    let first = client.get("/api/analytics").dispatch().into_string().unwrap();
    let second = client.get("/api/analytics").dispatch().into_string().unwrap();
    assert_eq!(first, second);

    let body: Value = serde_json::from_str(&first).unwrap();
    assert_eq!(body["analytics"]["total_images"], 1);
    assert_eq!(body["analytics"]["total_messages"], 1);
}

#[test]
fn http_metric_recording() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client
        .post("/api/analytics/metrics")
        .header(ContentType::JSON)
        .body(r#"{"metric_name": "cake_slices"}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::BadRequest);

    let resp = client
        .post("/api/analytics/metrics")
        .header(ContentType::JSON)
        .body(r#"{"metric_name": "cake_slices", "metric_value": 8}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = client.get("/api/analytics/current").dispatch().into_json().unwrap();
    assert_eq!(body["metrics"][0]["metric_name"], "cake_slices");
}

#[test]
fn http_unmatched_route_echoes_request() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client.get("/api/nowhere").dispatch();
    assert_eq!(resp.status(), Status::NotFound);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Endpoint not found");
    assert_eq!(body["path"], "/api/nowhere");
    assert_eq!(body["method"], "GET");
}

#[test]
fn http_malformed_body_uses_envelope() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client
        .post("/api/birthday/messages")
        .header(ContentType::JSON)
        .body("{not json")
        .dispatch();
    assert_eq!(resp.status(), Status::BadRequest);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["success"], false);

    let resp = client
        .post("/api/birthday/messages")
        .header(ContentType::JSON)
        .body(r#"{"message": 42}"#)
        .dispatch();
    assert_eq!(resp.status(), Status::UnprocessableEntity);
}

#[test]
fn http_status_endpoints() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let body: Value = client.get("/api/health").dispatch().into_json().unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let body: Value = client.get("/api/status").dispatch().into_json().unwrap();
    assert_eq!(body["server"], "Birthday Board");
    assert_eq!(body["environment"], "development");

    let body: Value = client.get("/").dispatch().into_json().unwrap();
    assert_eq!(body["endpoints"]["gallery"], "/api/gallery");
}

#[test]
fn http_cors_for_allowed_origins() {
    let db = test_db();
    let client = client_with(test_config(), &db);

    let resp = client
        .get("/api/health")
        .header(Header::new("Origin", "http://localhost:5173"))
        .dispatch();
    assert_eq!(
        resp.headers().get_one("Access-Control-Allow-Origin"),
        Some("http://localhost:5173")
    );

    let resp = client
        .get("/api/health")
        .header(Header::new("Origin", "http://evil.test"))
        .dispatch();
    assert!(resp.headers().get_one("Access-Control-Allow-Origin").is_none());

    let resp = client
        .options("/api/gallery")
        .header(Header::new("Origin", "http://localhost:5173"))
        .dispatch();
    assert_eq!(resp.status(), Status::NoContent);
    assert!(resp.headers().get_one("Access-Control-Allow-Methods").is_some());
}

#[test]
fn http_failure_detail_hidden_in_production() {
    // The schema is never applied, so every query fails.
    let db = Db::open("file:birthday_no_schema?mode=memory&cache=shared");

    let client = client_with(test_config(), &db);
    let body: Value = client.get("/api/gallery").dispatch().into_json().unwrap();
    assert_eq!(body["error"], "Failed to fetch gallery images");
    assert!(body["message"].is_string());
    drop(client);

    let config = AppConfig {
        environment: "production".to_string(),
        ..test_config()
    };
    let client = client_with(config, &db);
    let resp = client.get("/api/gallery").dispatch();
    assert_eq!(resp.status(), Status::InternalServerError);
    let body: Value = resp.into_json().unwrap();
    assert!(body.get("message").is_none());
}

// ═══════════════════════════════════════════════════════════
// API client
// ═══════════════════════════════════════════════════════════

#[test]
fn client_joins_endpoints_onto_base() {
    let client = ApiClient::new("http://localhost:3000").unwrap();
    assert_eq!(
        client.url_for("/api/gallery").unwrap().as_str(),
        "http://localhost:3000/api/gallery"
    );

    let prefixed = ApiClient::new("http://example.test/board/").unwrap();
    assert_eq!(
        prefixed.url_for("api/wishes").unwrap().as_str(),
        "http://example.test/board/api/wishes"
    );

    assert!(matches!(ApiClient::new("not a url"), Err(ClientError::Url(_))));
}

#[test]
fn client_error_message_extraction() {
    assert_eq!(
        error_message(400, Some(&json!({"message": "Bad things"}))),
        "Bad things"
    );
    assert_eq!(
        error_message(400, Some(&json!({"success": false, "error": "Message is required"}))),
        "Message is required"
    );
    assert_eq!(error_message(502, None), "HTTP error! status: 502");
    assert_eq!(error_message(500, Some(&json!([]))), "HTTP error! status: 500");
}

#[test]
fn client_falls_back_when_unreachable() {
    // Nothing listens on port 1.
    let client = ApiClient::new("http://127.0.0.1:1").unwrap();
    assert!(!client.is_online());
    assert!(matches!(client.gallery_images(), Err(ClientError::Network(_))));

    let messages = client.message_texts();
    assert!(messages.is_fallback());
    assert_eq!(messages.into_inner(), fallback::messages());

    let random = client.random_message_text();
    assert!(random.is_fallback());
    assert!(fallback::MESSAGES.contains(&random.into_inner().as_str()));
}

#[test]
fn fallback_keeps_remote_values() {
    let remote = or_fallback(Ok(vec![1, 2]), Vec::new);
    assert_eq!(remote, Content::Remote(vec![1, 2]));

    let fallen = or_fallback(Err(ClientError::Network("down".into())), || vec![0]);
    assert_eq!(fallen, Content::Fallback(vec![0]));
}

use chrono::{NaiveDateTime, SubsecRound, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{CommandSummary, Db, DbResult, Patch, SqlValue};

const COLUMNS: &str = "id, name, visited_at, ip_address, user_agent, session_id, referrer,
     country, city, device_type, browser, os, updated_at";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Visitor {
    pub id: String,
    pub name: String,
    pub visited_at: NaiveDateTime,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Default, Clone)]
pub struct VisitorForm {
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct VisitorPatch {
    pub name: Option<String>,
    pub session_id: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
}

impl Patch for VisitorPatch {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let fields: [(&'static str, &Option<String>); 7] = [
            ("name", &self.name),
            ("session_id", &self.session_id),
            ("country", &self.country),
            ("city", &self.city),
            ("device_type", &self.device_type),
            ("browser", &self.browser),
            ("os", &self.os),
        ];
        fields
            .into_iter()
            .filter_map(|(column, value)| {
                value
                    .as_ref()
                    .map(|v| (column, Box::new(v.clone()) as SqlValue))
            })
            .collect()
    }
}

#[derive(Debug, Serialize, PartialEq, Default)]
pub struct VisitorStats {
    pub total_visitors: i64,
    pub unique_visitors: i64,
    pub unique_sessions: i64,
    pub today_visitors: i64,
    pub weekly_visitors: i64,
    pub monthly_visitors: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DailyVisitors {
    pub visit_date: String,
    pub daily_visitors: i64,
    pub unique_visitors: i64,
    pub unique_sessions: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MonthlyVisitors {
    pub year: i64,
    pub month: i64,
    pub total_visitors: i64,
    pub unique_visitors: i64,
    pub unique_sessions: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TopVisitor {
    pub name: String,
    pub ip_address: Option<String>,
    pub visit_count: i64,
    pub last_visit: NaiveDateTime,
    pub first_visit: NaiveDateTime,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DeviceBreakdown {
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CountryCount {
    pub country: String,
    pub visitor_count: i64,
    pub unique_visitors: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct IpSummary {
    pub ip_address: Option<String>,
    pub visit_count: i64,
    pub last_visit: NaiveDateTime,
    pub first_visit: NaiveDateTime,
    pub names: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub page_views: i64,
    pub session_start: NaiveDateTime,
    pub session_end: NaiveDateTime,
    pub session_duration_minutes: i64,
}

#[derive(Debug, Serialize, PartialEq, Default)]
pub struct VisitorDashboard {
    pub today_visitors: i64,
    pub total_visitors: i64,
    pub unique_visitors: i64,
    pub weekly_visitors: i64,
    pub monthly_visitors: i64,
    pub device_types: i64,
    pub browsers: i64,
    pub countries: i64,
}

impl Visitor {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Visitor {
            id: row.get("id")?,
            name: row.get("name")?,
            visited_at: row.get("visited_at")?,
            ip_address: row.get("ip_address")?,
            user_agent: row.get("user_agent")?,
            session_id: row.get("session_id")?,
            referrer: row.get("referrer")?,
            country: row.get("country")?,
            city: row.get("city")?,
            device_type: row.get("device_type")?,
            browser: row.get("browser")?,
            os: row.get("os")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn list(db: &Db) -> DbResult<Vec<Self>> {
        db.query(
            &format!(
                "SELECT {} FROM visitors ORDER BY visited_at DESC, rowid DESC",
                COLUMNS
            ),
            [],
            Self::from_row,
        )
    }

    pub fn recent(db: &Db, limit: i64) -> DbResult<Vec<Self>> {
        db.query(
            &format!(
                "SELECT {} FROM visitors ORDER BY visited_at DESC, rowid DESC LIMIT ?1",
                COLUMNS
            ),
            params![limit],
            Self::from_row,
        )
    }

    pub fn find_by_id(db: &Db, id: &str) -> DbResult<Option<Self>> {
        db.single(
            &format!("SELECT {} FROM visitors WHERE id = ?1", COLUMNS),
            params![id],
            Self::from_row,
        )
    }

    /// `from` and `to` are inclusive calendar days (`YYYY-MM-DD`).
    pub fn by_date_range(db: &Db, from: &str, to: &str) -> DbResult<Vec<Self>> {
        db.query(
            &format!(
                "SELECT {} FROM visitors
                 WHERE DATE(visited_at) BETWEEN ?1 AND ?2
                 ORDER BY visited_at DESC, rowid DESC",
                COLUMNS
            ),
            params![from, to],
            Self::from_row,
        )
    }

    pub fn record(db: &Db, form: &VisitorForm) -> DbResult<Self> {
        let now = Utc::now().naive_utc().trunc_subsecs(0);
        let name = form
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Anonymous Visitor");
        let visitor = Visitor {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            visited_at: now,
            ip_address: form.ip_address.clone(),
            user_agent: form.user_agent.clone(),
            session_id: form.session_id.clone(),
            referrer: form.referrer.clone(),
            country: form.country.clone(),
            city: form.city.clone(),
            device_type: form.device_type.clone(),
            browser: form.browser.clone(),
            os: form.os.clone(),
            updated_at: now,
        };

        db.command(
            "INSERT INTO visitors (id, name, visited_at, ip_address, user_agent, session_id, referrer,
             country, city, device_type, browser, os, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                visitor.id,
                visitor.name,
                visitor.visited_at,
                visitor.ip_address,
                visitor.user_agent,
                visitor.session_id,
                visitor.referrer,
                visitor.country,
                visitor.city,
                visitor.device_type,
                visitor.browser,
                visitor.os,
                visitor.updated_at,
            ],
        )?;

        Ok(visitor)
    }

    pub fn update(db: &Db, id: &str, patch: &VisitorPatch) -> DbResult<CommandSummary> {
        db.update_by_id("visitors", id, patch)
    }

    pub fn stats(db: &Db) -> DbResult<VisitorStats> {
        let stats = db.single(
            "SELECT
                COUNT(*) AS total_visitors,
                COUNT(DISTINCT ip_address) AS unique_visitors,
                COUNT(DISTINCT session_id) AS unique_sessions,
                COUNT(CASE WHEN DATE(visited_at) = DATE('now') THEN 1 END) AS today_visitors,
                COUNT(CASE WHEN visited_at >= DATETIME('now', '-7 days') THEN 1 END) AS weekly_visitors,
                COUNT(CASE WHEN visited_at >= DATETIME('now', '-30 days') THEN 1 END) AS monthly_visitors
             FROM visitors",
            [],
            |row| {
                Ok(VisitorStats {
                    total_visitors: row.get("total_visitors")?,
                    unique_visitors: row.get("unique_visitors")?,
                    unique_sessions: row.get("unique_sessions")?,
                    today_visitors: row.get("today_visitors")?,
                    weekly_visitors: row.get("weekly_visitors")?,
                    monthly_visitors: row.get("monthly_visitors")?,
                })
            },
        )?;
        Ok(stats.unwrap_or_default())
    }

    pub fn daily(db: &Db, days: i64) -> DbResult<Vec<DailyVisitors>> {
        db.query(
            "SELECT
                DATE(visited_at) AS visit_date,
                COUNT(*) AS daily_visitors,
                COUNT(DISTINCT ip_address) AS unique_visitors,
                COUNT(DISTINCT session_id) AS unique_sessions
             FROM visitors
             WHERE visited_at >= DATETIME('now', ?1)
             GROUP BY DATE(visited_at)
             ORDER BY visit_date DESC",
            params![days_ago(days)],
            |row| {
                Ok(DailyVisitors {
                    visit_date: row.get("visit_date")?,
                    daily_visitors: row.get("daily_visitors")?,
                    unique_visitors: row.get("unique_visitors")?,
                    unique_sessions: row.get("unique_sessions")?,
                })
            },
        )
    }

    pub fn monthly(db: &Db) -> DbResult<Vec<MonthlyVisitors>> {
        db.query(
            "SELECT
                CAST(strftime('%Y', visited_at) AS INTEGER) AS year,
                CAST(strftime('%m', visited_at) AS INTEGER) AS month,
                COUNT(*) AS total_visitors,
                COUNT(DISTINCT ip_address) AS unique_visitors,
                COUNT(DISTINCT session_id) AS unique_sessions
             FROM visitors
             GROUP BY year, month
             ORDER BY year DESC, month DESC",
            [],
            |row| {
                Ok(MonthlyVisitors {
                    year: row.get("year")?,
                    month: row.get("month")?,
                    total_visitors: row.get("total_visitors")?,
                    unique_visitors: row.get("unique_visitors")?,
                    unique_sessions: row.get("unique_sessions")?,
                })
            },
        )
    }

    pub fn top(db: &Db, limit: i64) -> DbResult<Vec<TopVisitor>> {
        db.query(
            "SELECT
                name,
                ip_address,
                COUNT(*) AS visit_count,
                MAX(visited_at) AS last_visit,
                MIN(visited_at) AS first_visit
             FROM visitors
             GROUP BY name, ip_address
             ORDER BY visit_count DESC
             LIMIT ?1",
            params![limit],
            |row| {
                Ok(TopVisitor {
                    name: row.get("name")?,
                    ip_address: row.get("ip_address")?,
                    visit_count: row.get("visit_count")?,
                    last_visit: row.get("last_visit")?,
                    first_visit: row.get("first_visit")?,
                })
            },
        )
    }

    pub fn device_breakdown(db: &Db) -> DbResult<Vec<DeviceBreakdown>> {
        db.query(
            "SELECT
                device_type,
                browser,
                os,
                COUNT(*) AS count,
                ROUND(COUNT(*) * 100.0 / (SELECT COUNT(*) FROM visitors), 2) AS percentage
             FROM visitors
             GROUP BY device_type, browser, os
             ORDER BY count DESC",
            [],
            |row| {
                Ok(DeviceBreakdown {
                    device_type: row.get("device_type")?,
                    browser: row.get("browser")?,
                    os: row.get("os")?,
                    count: row.get("count")?,
                    percentage: row.get("percentage")?,
                })
            },
        )
    }

    pub fn by_country(db: &Db) -> DbResult<Vec<CountryCount>> {
        db.query(
            "SELECT
                country,
                COUNT(*) AS visitor_count,
                COUNT(DISTINCT ip_address) AS unique_visitors
             FROM visitors
             WHERE country IS NOT NULL
             GROUP BY country
             ORDER BY visitor_count DESC",
            [],
            |row| {
                Ok(CountryCount {
                    country: row.get("country")?,
                    visitor_count: row.get("visitor_count")?,
                    unique_visitors: row.get("unique_visitors")?,
                })
            },
        )
    }

    pub fn unique_by_ip(db: &Db) -> DbResult<Vec<IpSummary>> {
        db.query(
            "SELECT
                ip_address,
                COUNT(*) AS visit_count,
                MAX(visited_at) AS last_visit,
                MIN(visited_at) AS first_visit,
                GROUP_CONCAT(DISTINCT name) AS names
             FROM visitors
             GROUP BY ip_address
             ORDER BY visit_count DESC",
            [],
            |row| {
                Ok(IpSummary {
                    ip_address: row.get("ip_address")?,
                    visit_count: row.get("visit_count")?,
                    last_visit: row.get("last_visit")?,
                    first_visit: row.get("first_visit")?,
                    names: row.get("names")?,
                })
            },
        )
    }

    pub fn sessions(db: &Db) -> DbResult<Vec<SessionSummary>> {
        db.query(
            "SELECT
                session_id,
                COUNT(*) AS page_views,
                MIN(visited_at) AS session_start,
                MAX(visited_at) AS session_end,
                CAST((julianday(MAX(visited_at)) - julianday(MIN(visited_at))) * 1440 AS INTEGER)
                    AS session_duration_minutes
             FROM visitors
             WHERE session_id IS NOT NULL
             GROUP BY session_id
             ORDER BY session_start DESC",
            [],
            |row| {
                Ok(SessionSummary {
                    session_id: row.get("session_id")?,
                    page_views: row.get("page_views")?,
                    session_start: row.get("session_start")?,
                    session_end: row.get("session_end")?,
                    session_duration_minutes: row.get("session_duration_minutes")?,
                })
            },
        )
    }

    pub fn dashboard(db: &Db) -> DbResult<VisitorDashboard> {
        let dashboard = db.single(
            "SELECT
                (SELECT COUNT(*) FROM visitors WHERE DATE(visited_at) = DATE('now')) AS today_visitors,
                (SELECT COUNT(*) FROM visitors) AS total_visitors,
                (SELECT COUNT(DISTINCT ip_address) FROM visitors) AS unique_visitors,
                (SELECT COUNT(*) FROM visitors WHERE visited_at >= DATETIME('now', '-7 days')) AS weekly_visitors,
                (SELECT COUNT(*) FROM visitors WHERE visited_at >= DATETIME('now', '-30 days')) AS monthly_visitors,
                (SELECT COUNT(DISTINCT device_type) FROM visitors) AS device_types,
                (SELECT COUNT(DISTINCT browser) FROM visitors) AS browsers,
                (SELECT COUNT(DISTINCT country) FROM visitors WHERE country IS NOT NULL) AS countries",
            [],
            |row| {
                Ok(VisitorDashboard {
                    today_visitors: row.get("today_visitors")?,
                    total_visitors: row.get("total_visitors")?,
                    unique_visitors: row.get("unique_visitors")?,
                    weekly_visitors: row.get("weekly_visitors")?,
                    monthly_visitors: row.get("monthly_visitors")?,
                    device_types: row.get("device_types")?,
                    browsers: row.get("browsers")?,
                    countries: row.get("countries")?,
                })
            },
        )?;
        Ok(dashboard.unwrap_or_default())
    }

    /// Deletes visits older than `days` days.
    pub fn cleanup_older_than(db: &Db, days: i64) -> DbResult<CommandSummary> {
        db.command(
            "DELETE FROM visitors WHERE visited_at < DATETIME('now', ?1)",
            params![days_ago(days)],
        )
    }
}

/// SQLite date modifier for "`days` days ago".
pub(crate) fn days_ago(days: i64) -> String {
    format!("-{} days", days.max(0))
}

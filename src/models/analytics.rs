use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::{CommandSummary, Db, DbResult};
use crate::models::visitor::days_ago;

/// One stored metric value for one day.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnalyticsMetric {
    pub metric_name: String,
    pub metric_value: f64,
    pub metric_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, PartialEq, Default)]
pub struct Dashboard {
    pub today_visitors: i64,
    pub total_visitors: i64,
    pub total_messages: i64,
    pub total_wishes: i64,
    pub total_images: i64,
    pub weekly_visitors: i64,
    pub weekly_messages: i64,
    pub weekly_wishes: i64,
    pub monthly_visitors: i64,
    pub monthly_messages: i64,
    pub monthly_wishes: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct GrowthRow {
    pub metric_type: String,
    pub today: i64,
    pub yesterday: i64,
    pub this_week: i64,
    pub last_week: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct HourlyCount {
    pub hour: i64,
    pub visitor_count: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct WeekdayCount {
    pub day_name: String,
    /// 1 = Sunday ... 7 = Saturday
    pub day_number: i64,
    pub visitor_count: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ContentStats {
    pub content_type: String,
    pub total_count: i64,
    pub avg_length: Option<f64>,
    pub max_length: Option<i64>,
    pub min_length: Option<i64>,
    pub avg_likes: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TopContent {
    pub content_type: String,
    pub id: String,
    pub content: String,
    pub author: String,
    pub likes: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct HealthMetric {
    pub metric: String,
    pub status: String,
    pub timestamp: Option<String>,
}

// Each statement recomputes one of today's totals from its source table.
const REFRESH_STATEMENTS: [(&str, &str); 4] = [
    ("total_visitors", "SELECT COUNT(*) FROM visitors"),
    (
        "total_messages",
        "SELECT COUNT(*) FROM birthday_messages WHERE is_approved = 1",
    ),
    (
        "total_wishes",
        "SELECT COUNT(*) FROM birthday_wishes WHERE is_approved = 1",
    ),
    (
        "total_images",
        "SELECT COUNT(*) FROM gallery_images WHERE is_active = 1",
    ),
];

impl AnalyticsMetric {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(AnalyticsMetric {
            metric_name: row.get("metric_name")?,
            metric_value: row.get("metric_value")?,
            metric_date: row.get("metric_date")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn all(db: &Db) -> DbResult<Vec<Self>> {
        db.query(
            "SELECT metric_name, metric_value, metric_date, created_at
             FROM analytics ORDER BY metric_date DESC, metric_name",
            [],
            Self::from_row,
        )
    }

    pub fn by_date_range(db: &Db, from: &str, to: &str) -> DbResult<Vec<Self>> {
        db.query(
            "SELECT metric_name, metric_value, metric_date, created_at
             FROM analytics
             WHERE metric_date BETWEEN ?1 AND ?2
             ORDER BY metric_date DESC, metric_name",
            params![from, to],
            Self::from_row,
        )
    }

    pub fn current(db: &Db) -> DbResult<Vec<Self>> {
        db.query(
            "SELECT metric_name, metric_value, metric_date, created_at
             FROM analytics WHERE metric_date = DATE('now') ORDER BY metric_name",
            [],
            Self::from_row,
        )
    }

    /// Sets today's value for `name`, replacing any earlier value from today.
    pub fn upsert(db: &Db, name: &str, value: f64) -> DbResult<CommandSummary> {
        db.command(
            "INSERT INTO analytics (metric_name, metric_value, metric_date)
             VALUES (?1, ?2, DATE('now'))
             ON CONFLICT(metric_name, metric_date) DO UPDATE SET
                metric_value = excluded.metric_value,
                created_at = CURRENT_TIMESTAMP",
            params![name, value],
        )
    }

    /// Recomputes today's totals, one statement per metric. A failure stops the
    /// sequence; metrics refreshed before it keep their new values.
    pub fn refresh_totals(db: &Db) -> DbResult<usize> {
        let mut refreshed = 0;
        for (name, source) in REFRESH_STATEMENTS {
            let sql = format!(
                "INSERT INTO analytics (metric_name, metric_value, metric_date)
                 VALUES (?1, ({}), DATE('now'))
                 ON CONFLICT(metric_name, metric_date) DO UPDATE SET
                    metric_value = excluded.metric_value,
                    created_at = CURRENT_TIMESTAMP",
                source
            );
            refreshed += db.command(&sql, params![name])?.affected;
        }
        Ok(refreshed)
    }

    pub fn cleanup_older_than(db: &Db, days: i64) -> DbResult<CommandSummary> {
        db.command(
            "DELETE FROM analytics WHERE metric_date < DATE('now', ?1)",
            params![days_ago(days)],
        )
    }
}

pub fn dashboard(db: &Db) -> DbResult<Dashboard> {
    let dashboard = db.single(
        "SELECT
            (SELECT COUNT(*) FROM visitors WHERE DATE(visited_at) = DATE('now')) AS today_visitors,
            (SELECT COUNT(*) FROM visitors) AS total_visitors,
            (SELECT COUNT(*) FROM birthday_messages WHERE is_approved = 1) AS total_messages,
            (SELECT COUNT(*) FROM birthday_wishes WHERE is_approved = 1) AS total_wishes,
            (SELECT COUNT(*) FROM gallery_images WHERE is_active = 1) AS total_images,
            (SELECT COUNT(*) FROM visitors WHERE visited_at >= DATETIME('now', '-7 days')) AS weekly_visitors,
            (SELECT COUNT(*) FROM birthday_messages WHERE created_at >= DATETIME('now', '-7 days')) AS weekly_messages,
            (SELECT COUNT(*) FROM birthday_wishes WHERE created_at >= DATETIME('now', '-7 days')) AS weekly_wishes,
            (SELECT COUNT(*) FROM visitors WHERE visited_at >= DATETIME('now', '-30 days')) AS monthly_visitors,
            (SELECT COUNT(*) FROM birthday_messages WHERE created_at >= DATETIME('now', '-30 days')) AS monthly_messages,
            (SELECT COUNT(*) FROM birthday_wishes WHERE created_at >= DATETIME('now', '-30 days')) AS monthly_wishes",
        [],
        |row| {
            Ok(Dashboard {
                today_visitors: row.get("today_visitors")?,
                total_visitors: row.get("total_visitors")?,
                total_messages: row.get("total_messages")?,
                total_wishes: row.get("total_wishes")?,
                total_images: row.get("total_images")?,
                weekly_visitors: row.get("weekly_visitors")?,
                weekly_messages: row.get("weekly_messages")?,
                weekly_wishes: row.get("weekly_wishes")?,
                monthly_visitors: row.get("monthly_visitors")?,
                monthly_messages: row.get("monthly_messages")?,
                monthly_wishes: row.get("monthly_wishes")?,
            })
        },
    )?;
    Ok(dashboard.unwrap_or_default())
}

pub fn growth(db: &Db) -> DbResult<Vec<GrowthRow>> {
    db.query(
        "SELECT
            'visitors' AS metric_type,
            COUNT(CASE WHEN DATE(visited_at) = DATE('now') THEN 1 END) AS today,
            COUNT(CASE WHEN DATE(visited_at) = DATE('now', '-1 day') THEN 1 END) AS yesterday,
            COUNT(CASE WHEN visited_at >= DATETIME('now', '-7 days') THEN 1 END) AS this_week,
            COUNT(CASE WHEN visited_at BETWEEN DATETIME('now', '-14 days') AND DATETIME('now', '-7 days') THEN 1 END) AS last_week
         FROM visitors

         UNION ALL

         SELECT
            'messages' AS metric_type,
            COUNT(CASE WHEN DATE(created_at) = DATE('now') THEN 1 END),
            COUNT(CASE WHEN DATE(created_at) = DATE('now', '-1 day') THEN 1 END),
            COUNT(CASE WHEN created_at >= DATETIME('now', '-7 days') THEN 1 END),
            COUNT(CASE WHEN created_at BETWEEN DATETIME('now', '-14 days') AND DATETIME('now', '-7 days') THEN 1 END)
         FROM birthday_messages
         WHERE is_approved = 1

         UNION ALL

         SELECT
            'wishes' AS metric_type,
            COUNT(CASE WHEN DATE(created_at) = DATE('now') THEN 1 END),
            COUNT(CASE WHEN DATE(created_at) = DATE('now', '-1 day') THEN 1 END),
            COUNT(CASE WHEN created_at >= DATETIME('now', '-7 days') THEN 1 END),
            COUNT(CASE WHEN created_at BETWEEN DATETIME('now', '-14 days') AND DATETIME('now', '-7 days') THEN 1 END)
         FROM birthday_wishes
         WHERE is_approved = 1",
        [],
        |row| {
            Ok(GrowthRow {
                metric_type: row.get(0)?,
                today: row.get(1)?,
                yesterday: row.get(2)?,
                this_week: row.get(3)?,
                last_week: row.get(4)?,
            })
        },
    )
}

pub fn hourly_today(db: &Db) -> DbResult<Vec<HourlyCount>> {
    db.query(
        "SELECT
            CAST(strftime('%H', visited_at) AS INTEGER) AS hour,
            COUNT(*) AS visitor_count
         FROM visitors
         WHERE DATE(visited_at) = DATE('now')
         GROUP BY hour
         ORDER BY hour",
        [],
        |row| {
            Ok(HourlyCount {
                hour: row.get("hour")?,
                visitor_count: row.get("visitor_count")?,
            })
        },
    )
}

pub fn weekly(db: &Db) -> DbResult<Vec<WeekdayCount>> {
    db.query(
        "SELECT
            CASE CAST(strftime('%w', visited_at) AS INTEGER)
                WHEN 0 THEN 'Sunday'
                WHEN 1 THEN 'Monday'
                WHEN 2 THEN 'Tuesday'
                WHEN 3 THEN 'Wednesday'
                WHEN 4 THEN 'Thursday'
                WHEN 5 THEN 'Friday'
                ELSE 'Saturday'
            END AS day_name,
            CAST(strftime('%w', visited_at) AS INTEGER) + 1 AS day_number,
            COUNT(*) AS visitor_count
         FROM visitors
         WHERE visited_at >= DATETIME('now', '-7 days')
         GROUP BY day_number
         ORDER BY day_number",
        [],
        |row| {
            Ok(WeekdayCount {
                day_name: row.get("day_name")?,
                day_number: row.get("day_number")?,
                visitor_count: row.get("visitor_count")?,
            })
        },
    )
}

pub fn content_stats(db: &Db) -> DbResult<Vec<ContentStats>> {
    db.query(
        "SELECT
            'messages' AS content_type,
            COUNT(*) AS total_count,
            AVG(LENGTH(message)) AS avg_length,
            MAX(LENGTH(message)) AS max_length,
            MIN(LENGTH(message)) AS min_length,
            AVG(likes) AS avg_likes
         FROM birthday_messages
         WHERE is_approved = 1

         UNION ALL

         SELECT
            'wishes',
            COUNT(*),
            AVG(LENGTH(wish)),
            MAX(LENGTH(wish)),
            MIN(LENGTH(wish)),
            NULL
         FROM birthday_wishes
         WHERE is_approved = 1",
        [],
        |row| {
            Ok(ContentStats {
                content_type: row.get(0)?,
                total_count: row.get(1)?,
                avg_length: row.get(2)?,
                max_length: row.get(3)?,
                min_length: row.get(4)?,
                avg_likes: row.get(5)?,
            })
        },
    )
}

/// Most liked messages followed by the newest wishes, `limit` of each.
pub fn top_content(db: &Db, limit: i64) -> DbResult<Vec<TopContent>> {
    db.query(
        "SELECT * FROM (
            SELECT 'message' AS content_type, id, message AS content, author, likes, created_at
            FROM birthday_messages
            WHERE is_approved = 1
            ORDER BY likes DESC, created_at DESC
            LIMIT ?1
         )
         UNION ALL
         SELECT * FROM (
            SELECT 'wish' AS content_type, id, wish AS content, name AS author, 0 AS likes, created_at
            FROM birthday_wishes
            WHERE is_approved = 1
            ORDER BY created_at DESC
            LIMIT ?1
         )",
        params![limit],
        |row| {
            Ok(TopContent {
                content_type: row.get("content_type")?,
                id: row.get("id")?,
                content: row.get("content")?,
                author: row.get("author")?,
                likes: row.get("likes")?,
                created_at: row.get("created_at")?,
            })
        },
    )
}

pub fn system_health(db: &Db) -> DbResult<Vec<HealthMetric>> {
    db.query(
        "SELECT 'database_health' AS metric, 'ok' AS status, CURRENT_TIMESTAMP AS timestamp
         UNION ALL
         SELECT
            'data_freshness',
            CASE
                WHEN MAX(visited_at) > DATETIME('now', '-1 hour') THEN 'fresh'
                WHEN MAX(visited_at) > DATETIME('now', '-1 day') THEN 'stale'
                ELSE 'old'
            END,
            MAX(visited_at)
         FROM visitors",
        [],
        |row| {
            Ok(HealthMetric {
                metric: row.get(0)?,
                status: row.get(1)?,
                timestamp: row.get(2)?,
            })
        },
    )
}

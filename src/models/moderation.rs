use chrono::NaiveDateTime;
use serde::Serialize;

use crate::db::{Db, DbResult};

/// A message or wish still waiting for approval.
#[derive(Debug, Serialize, PartialEq)]
pub struct PendingItem {
    /// "message" or "wish"
    pub kind: String,
    pub id: String,
    pub content: String,
    pub author: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, PartialEq, Default)]
pub struct BoardStats {
    pub total_messages: i64,
    pub total_wishes: i64,
    pub pending_messages: i64,
    pub pending_wishes: i64,
    pub avg_likes: Option<f64>,
    pub today_messages: i64,
    pub today_wishes: i64,
}

pub fn pending_items(db: &Db) -> DbResult<Vec<PendingItem>> {
    db.query(
        "SELECT 'message' AS kind, id, message AS content, author, created_at
         FROM birthday_messages WHERE is_approved = 0
         UNION ALL
         SELECT 'wish' AS kind, id, wish AS content, name AS author, created_at
         FROM birthday_wishes WHERE is_approved = 0
         ORDER BY created_at DESC",
        [],
        |row| {
            Ok(PendingItem {
                kind: row.get("kind")?,
                id: row.get("id")?,
                content: row.get("content")?,
                author: row.get("author")?,
                created_at: row.get("created_at")?,
            })
        },
    )
}

pub fn board_stats(db: &Db) -> DbResult<BoardStats> {
    let stats = db.single(
        "SELECT
            (SELECT COUNT(*) FROM birthday_messages WHERE is_approved = 1) AS total_messages,
            (SELECT COUNT(*) FROM birthday_wishes WHERE is_approved = 1) AS total_wishes,
            (SELECT COUNT(*) FROM birthday_messages WHERE is_approved = 0) AS pending_messages,
            (SELECT COUNT(*) FROM birthday_wishes WHERE is_approved = 0) AS pending_wishes,
            (SELECT AVG(likes) FROM birthday_messages WHERE is_approved = 1) AS avg_likes,
            (SELECT COUNT(*) FROM birthday_messages WHERE DATE(created_at) = DATE('now')) AS today_messages,
            (SELECT COUNT(*) FROM birthday_wishes WHERE DATE(created_at) = DATE('now')) AS today_wishes",
        [],
        |row| {
            Ok(BoardStats {
                total_messages: row.get("total_messages")?,
                total_wishes: row.get("total_wishes")?,
                pending_messages: row.get("pending_messages")?,
                pending_wishes: row.get("pending_wishes")?,
                avg_likes: row.get("avg_likes")?,
                today_messages: row.get("today_messages")?,
                today_wishes: row.get("today_wishes")?,
            })
        },
    )?;
    Ok(stats.unwrap_or_default())
}

use chrono::{NaiveDateTime, SubsecRound, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{like_pattern, CommandSummary, Db, DbResult, Patch, SqlValue};

const COLUMNS: &str = "id, message, author, likes, is_approved, ip_address, user_agent,
     created_at, updated_at, LENGTH(message) AS message_length";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BirthdayMessage {
    pub id: String,
    pub message: String,
    pub author: String,
    pub likes: i64,
    pub is_approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub message_length: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Default)]
pub struct MessageForm {
    pub message: String,
    pub author: Option<String>,
    pub is_approved: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MessagePatch {
    pub message: Option<String>,
    pub author: Option<String>,
    pub is_approved: Option<bool>,
}

impl Patch for MessagePatch {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out: Vec<(&'static str, SqlValue)> = Vec::new();
        if let Some(ref v) = self.message {
            out.push(("message", Box::new(v.clone())));
        }
        if let Some(ref v) = self.author {
            out.push(("author", Box::new(v.clone())));
        }
        if let Some(v) = self.is_approved {
            out.push(("is_approved", Box::new(v)));
        }
        out
    }
}

impl BirthdayMessage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(BirthdayMessage {
            id: row.get("id")?,
            message: row.get("message")?,
            author: row.get("author")?,
            likes: row.get("likes")?,
            is_approved: row.get("is_approved")?,
            ip_address: row.get("ip_address")?,
            user_agent: row.get("user_agent")?,
            message_length: row.get("message_length")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Strips provenance before the message goes on the public board.
    pub fn public(mut self) -> Self {
        self.ip_address = None;
        self.user_agent = None;
        self
    }

    pub fn list_approved(db: &Db) -> DbResult<Vec<Self>> {
        db.query(
            &format!(
                "SELECT {} FROM birthday_messages WHERE is_approved = 1 ORDER BY created_at DESC",
                COLUMNS
            ),
            [],
            Self::from_row,
        )
        .map(|rows| rows.into_iter().map(Self::public).collect())
    }

    /// Every message, pending ones included, with provenance.
    pub fn list_all(db: &Db) -> DbResult<Vec<Self>> {
        db.query(
            &format!(
                "SELECT {} FROM birthday_messages ORDER BY created_at DESC",
                COLUMNS
            ),
            [],
            Self::from_row,
        )
    }

    pub fn find_by_id(db: &Db, id: &str) -> DbResult<Option<Self>> {
        db.single(
            &format!("SELECT {} FROM birthday_messages WHERE id = ?1", COLUMNS),
            params![id],
            Self::from_row,
        )
    }

    /// Like `find_by_id`, but only approved rows and without provenance.
    pub fn find_approved(db: &Db, id: &str) -> DbResult<Option<Self>> {
        db.single(
            &format!(
                "SELECT {} FROM birthday_messages WHERE id = ?1 AND is_approved = 1",
                COLUMNS
            ),
            params![id],
            Self::from_row,
        )
        .map(|row| row.map(Self::public))
    }

    pub fn by_author(db: &Db, author: &str) -> DbResult<Vec<Self>> {
        db.query(
            &format!(
                "SELECT {} FROM birthday_messages
                 WHERE is_approved = 1 AND author = ?1
                 ORDER BY created_at DESC",
                COLUMNS
            ),
            params![author],
            Self::from_row,
        )
        .map(|rows| rows.into_iter().map(Self::public).collect())
    }

    /// Case-insensitive substring search over approved messages.
    pub fn search(db: &Db, keyword: &str) -> DbResult<Vec<Self>> {
        let pattern = like_pattern(keyword);
        db.query(
            &format!(
                "SELECT {} FROM birthday_messages
                 WHERE is_approved = 1 AND message LIKE ?1 ESCAPE '\\'
                 ORDER BY created_at DESC",
                COLUMNS
            ),
            params![pattern],
            Self::from_row,
        )
        .map(|rows| rows.into_iter().map(Self::public).collect())
    }

    pub fn random_approved(db: &Db) -> DbResult<Option<Self>> {
        db.single(
            &format!(
                "SELECT {} FROM birthday_messages WHERE is_approved = 1 ORDER BY RANDOM() LIMIT 1",
                COLUMNS
            ),
            [],
            Self::from_row,
        )
        .map(|m| m.map(Self::public))
    }

    pub fn create(db: &Db, form: &MessageForm) -> DbResult<Self> {
        let now = Utc::now().naive_utc().trunc_subsecs(0);
        let author = form
            .author
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or("Anonymous");
        let message = BirthdayMessage {
            id: Uuid::new_v4().to_string(),
            message: form.message.trim().to_string(),
            author: author.to_string(),
            likes: 0,
            is_approved: form.is_approved,
            ip_address: form.ip_address.clone(),
            user_agent: form.user_agent.clone(),
            message_length: form.message.trim().chars().count() as i64,
            created_at: now,
            updated_at: now,
        };

        db.command(
            "INSERT INTO birthday_messages (id, message, author, likes, is_approved, ip_address,
             user_agent, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.id,
                message.message,
                message.author,
                message.is_approved,
                message.ip_address,
                message.user_agent,
                message.created_at,
                message.updated_at,
            ],
        )?;

        Ok(message)
    }

    pub fn update(db: &Db, id: &str, patch: &MessagePatch) -> DbResult<CommandSummary> {
        db.update_by_id("birthday_messages", id, patch)
    }

    pub fn delete(db: &Db, id: &str) -> DbResult<CommandSummary> {
        db.command("DELETE FROM birthday_messages WHERE id = ?1", params![id])
    }

    pub fn like(db: &Db, id: &str) -> DbResult<CommandSummary> {
        db.command(
            "UPDATE birthday_messages SET likes = likes + 1 WHERE id = ?1 AND is_approved = 1",
            params![id],
        )
    }
}

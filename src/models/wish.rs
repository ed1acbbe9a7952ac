use chrono::{NaiveDateTime, SubsecRound, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{like_pattern, CommandSummary, Db, DbResult, Patch, SqlValue};

const COLUMNS: &str = "id, name, wish, email, is_approved, ip_address, user_agent,
     created_at, updated_at, LENGTH(wish) AS wish_length";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BirthdayWish {
    pub id: String,
    pub name: String,
    pub wish: String,
    pub email: Option<String>,
    pub is_approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub wish_length: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Default)]
pub struct WishForm {
    pub name: String,
    pub wish: String,
    pub email: Option<String>,
    pub is_approved: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WishPatch {
    pub name: Option<String>,
    pub wish: Option<String>,
    pub email: Option<String>,
    pub is_approved: Option<bool>,
}

impl Patch for WishPatch {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out: Vec<(&'static str, SqlValue)> = Vec::new();
        if let Some(ref v) = self.name {
            out.push(("name", Box::new(v.clone())));
        }
        if let Some(ref v) = self.wish {
            out.push(("wish", Box::new(v.clone())));
        }
        if let Some(ref v) = self.email {
            out.push(("email", Box::new(v.clone())));
        }
        if let Some(v) = self.is_approved {
            out.push(("is_approved", Box::new(v)));
        }
        out
    }
}

impl BirthdayWish {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(BirthdayWish {
            id: row.get("id")?,
            name: row.get("name")?,
            wish: row.get("wish")?,
            email: row.get("email")?,
            is_approved: row.get("is_approved")?,
            ip_address: row.get("ip_address")?,
            user_agent: row.get("user_agent")?,
            wish_length: row.get("wish_length")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn public(mut self) -> Self {
        self.ip_address = None;
        self.user_agent = None;
        self
    }

    pub fn list_approved(db: &Db) -> DbResult<Vec<Self>> {
        db.query(
            &format!(
                "SELECT {} FROM birthday_wishes WHERE is_approved = 1 ORDER BY created_at DESC",
                COLUMNS
            ),
            [],
            Self::from_row,
        )
        .map(|rows| rows.into_iter().map(Self::public).collect())
    }

    pub fn list_all(db: &Db) -> DbResult<Vec<Self>> {
        db.query(
            &format!("SELECT {} FROM birthday_wishes ORDER BY created_at DESC", COLUMNS),
            [],
            Self::from_row,
        )
    }

    pub fn find_by_id(db: &Db, id: &str) -> DbResult<Option<Self>> {
        db.single(
            &format!("SELECT {} FROM birthday_wishes WHERE id = ?1", COLUMNS),
            params![id],
            Self::from_row,
        )
    }

    /// Like `find_by_id`, but only approved rows and without provenance.
    pub fn find_approved(db: &Db, id: &str) -> DbResult<Option<Self>> {
        db.single(
            &format!(
                "SELECT {} FROM birthday_wishes WHERE id = ?1 AND is_approved = 1",
                COLUMNS
            ),
            params![id],
            Self::from_row,
        )
        .map(|row| row.map(Self::public))
    }

    pub fn by_name(db: &Db, name: &str) -> DbResult<Vec<Self>> {
        db.query(
            &format!(
                "SELECT {} FROM birthday_wishes
                 WHERE is_approved = 1 AND name = ?1
                 ORDER BY created_at DESC",
                COLUMNS
            ),
            params![name],
            Self::from_row,
        )
        .map(|rows| rows.into_iter().map(Self::public).collect())
    }

    pub fn search(db: &Db, keyword: &str) -> DbResult<Vec<Self>> {
        let pattern = like_pattern(keyword);
        db.query(
            &format!(
                "SELECT {} FROM birthday_wishes
                 WHERE is_approved = 1 AND wish LIKE ?1 ESCAPE '\\'
                 ORDER BY created_at DESC",
                COLUMNS
            ),
            params![pattern],
            Self::from_row,
        )
        .map(|rows| rows.into_iter().map(Self::public).collect())
    }

    pub fn create(db: &Db, form: &WishForm) -> DbResult<Self> {
        let now = Utc::now().naive_utc().trunc_subsecs(0);
        let wish_text = form.wish.trim().to_string();
        let wish = BirthdayWish {
            id: Uuid::new_v4().to_string(),
            name: form.name.trim().to_string(),
            wish_length: wish_text.chars().count() as i64,
            wish: wish_text,
            email: form
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            is_approved: form.is_approved,
            ip_address: form.ip_address.clone(),
            user_agent: form.user_agent.clone(),
            created_at: now,
            updated_at: now,
        };

        db.command(
            "INSERT INTO birthday_wishes (id, name, wish, email, is_approved, ip_address, user_agent,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                wish.id,
                wish.name,
                wish.wish,
                wish.email,
                wish.is_approved,
                wish.ip_address,
                wish.user_agent,
                wish.created_at,
                wish.updated_at,
            ],
        )?;

        Ok(wish)
    }

    pub fn update(db: &Db, id: &str, patch: &WishPatch) -> DbResult<CommandSummary> {
        db.update_by_id("birthday_wishes", id, patch)
    }

    pub fn delete(db: &Db, id: &str) -> DbResult<CommandSummary> {
        db.command("DELETE FROM birthday_wishes WHERE id = ?1", params![id])
    }
}

use chrono::{NaiveDateTime, SubsecRound, Utc};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::db::{CommandSummary, Db, DbResult, Patch, SqlValue};

const COLUMNS: &str = "id, src, alt, metadata, display_order, file_size, mime_type, width, height,
     is_active, created_at, updated_at,
     CASE WHEN width > 0 AND height > 0 THEN ROUND(CAST(width AS REAL) / height, 2) ELSE NULL END AS aspect_ratio";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GalleryImage {
    pub id: String,
    pub src: String,
    pub alt: String,
    pub metadata: Value,
    pub display_order: i64,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub aspect_ratio: Option<f64>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Default)]
pub struct GalleryForm {
    pub src: String,
    pub alt: Option<String>,
    pub metadata: Option<Value>,
    pub display_order: Option<i64>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// Updatable gallery fields. `None` leaves the column untouched.
#[derive(Debug, Deserialize, Default)]
pub struct GalleryPatch {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub metadata: Option<Value>,
    pub display_order: Option<i64>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

impl Patch for GalleryPatch {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)> {
        let mut out: Vec<(&'static str, SqlValue)> = Vec::new();
        if let Some(ref v) = self.src {
            out.push(("src", Box::new(v.clone())));
        }
        if let Some(ref v) = self.alt {
            out.push(("alt", Box::new(v.clone())));
        }
        if let Some(ref v) = self.metadata {
            out.push(("metadata", Box::new(v.to_string())));
        }
        if let Some(v) = self.display_order {
            out.push(("display_order", Box::new(v)));
        }
        if let Some(v) = self.file_size {
            out.push(("file_size", Box::new(v)));
        }
        if let Some(ref v) = self.mime_type {
            out.push(("mime_type", Box::new(v.clone())));
        }
        if let Some(v) = self.width {
            out.push(("width", Box::new(v)));
        }
        if let Some(v) = self.height {
            out.push(("height", Box::new(v)));
        }
        out
    }
}

#[derive(Debug, Serialize, PartialEq, Default)]
pub struct GalleryStats {
    pub total_images: i64,
    pub active_images: i64,
    pub avg_file_size: Option<f64>,
    pub total_size: Option<i64>,
    pub jpeg_count: i64,
    pub png_count: i64,
    pub gif_count: i64,
}

impl GalleryImage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let raw_metadata: String = row.get("metadata")?;
        Ok(GalleryImage {
            id: row.get("id")?,
            src: row.get("src")?,
            alt: row.get("alt")?,
            metadata: serde_json::from_str(&raw_metadata)
                .unwrap_or_else(|_| Value::Object(Default::default())),
            display_order: row.get("display_order")?,
            file_size: row.get("file_size")?,
            mime_type: row.get("mime_type")?,
            width: row.get("width")?,
            height: row.get("height")?,
            aspect_ratio: row.get("aspect_ratio")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn list_active(db: &Db) -> DbResult<Vec<Self>> {
        db.query(
            &format!(
                "SELECT {} FROM gallery_images WHERE is_active = 1 ORDER BY display_order, created_at",
                COLUMNS
            ),
            [],
            Self::from_row,
        )
    }

    /// Active images only; a soft-deleted image resolves to `None`.
    pub fn find_by_id(db: &Db, id: &str) -> DbResult<Option<Self>> {
        db.single(
            &format!(
                "SELECT {} FROM gallery_images WHERE id = ?1 AND is_active = 1",
                COLUMNS
            ),
            params![id],
            Self::from_row,
        )
    }

    /// Any stored row, hidden or not.
    pub fn find_stored(db: &Db, id: &str) -> DbResult<Option<Self>> {
        db.single(
            &format!("SELECT {} FROM gallery_images WHERE id = ?1", COLUMNS),
            params![id],
            Self::from_row,
        )
    }

    pub fn by_category(db: &Db, category: &str) -> DbResult<Vec<Self>> {
        db.query(
            &format!(
                "SELECT {} FROM gallery_images
                 WHERE is_active = 1 AND json_extract(metadata, '$.category') = ?1
                 ORDER BY display_order, created_at",
                COLUMNS
            ),
            params![category],
            Self::from_row,
        )
    }

    pub fn create(db: &Db, form: &GalleryForm) -> DbResult<Self> {
        let now = Utc::now().naive_utc().trunc_subsecs(0);
        let image = GalleryImage {
            id: Uuid::new_v4().to_string(),
            src: form.src.clone(),
            alt: form.alt.clone().unwrap_or_default(),
            metadata: form
                .metadata
                .clone()
                .unwrap_or_else(|| Value::Object(Default::default())),
            display_order: form.display_order.unwrap_or(0),
            file_size: form.file_size,
            mime_type: form.mime_type.clone(),
            width: form.width,
            height: form.height,
            aspect_ratio: aspect_ratio(form.width, form.height),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        db.command(
            "INSERT INTO gallery_images (id, src, alt, metadata, display_order, file_size, mime_type,
             width, height, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?11)",
            params![
                image.id,
                image.src,
                image.alt,
                image.metadata.to_string(),
                image.display_order,
                image.file_size,
                image.mime_type,
                image.width,
                image.height,
                image.created_at,
                image.updated_at,
            ],
        )?;

        Ok(image)
    }

    pub fn update(db: &Db, id: &str, patch: &GalleryPatch) -> DbResult<CommandSummary> {
        db.update_by_id("gallery_images", id, patch)
    }

    /// Hides the image from listings; the row stays.
    pub fn soft_delete(db: &Db, id: &str) -> DbResult<CommandSummary> {
        db.command(
            "UPDATE gallery_images SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
            params![id],
        )
    }

    pub fn permanent_delete(db: &Db, id: &str) -> DbResult<CommandSummary> {
        db.command("DELETE FROM gallery_images WHERE id = ?1", params![id])
    }

    pub fn stats(db: &Db) -> DbResult<GalleryStats> {
        let stats = db.single(
            "SELECT
                COUNT(*) AS total_images,
                COUNT(CASE WHEN is_active = 1 THEN 1 END) AS active_images,
                AVG(file_size) AS avg_file_size,
                SUM(file_size) AS total_size,
                COUNT(CASE WHEN mime_type LIKE 'image/jpeg' THEN 1 END) AS jpeg_count,
                COUNT(CASE WHEN mime_type LIKE 'image/png' THEN 1 END) AS png_count,
                COUNT(CASE WHEN mime_type LIKE 'image/gif' THEN 1 END) AS gif_count
             FROM gallery_images",
            [],
            |row| {
                Ok(GalleryStats {
                    total_images: row.get("total_images")?,
                    active_images: row.get("active_images")?,
                    avg_file_size: row.get("avg_file_size")?,
                    total_size: row.get("total_size")?,
                    jpeg_count: row.get("jpeg_count")?,
                    png_count: row.get("png_count")?,
                    gif_count: row.get("gif_count")?,
                })
            },
        )?;
        // An aggregate without GROUP BY always yields one row.
        Ok(stats.unwrap_or_default())
    }
}

fn aspect_ratio(width: Option<i64>, height: Option<i64>) -> Option<f64> {
    match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some((w as f64 / h as f64 * 100.0).round() / 100.0),
        _ => None,
    }
}

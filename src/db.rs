use std::fmt;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Params, Row};
use serde::Serialize;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Boxed statement parameter, used where the parameter list is built at runtime.
pub type SqlValue = Box<dyn ToSql>;

/// Failure value returned by every data access call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// An update request named no recognized field.
    EmptyUpdate,
    /// Pool or driver failure, carrying the driver's message.
    Query(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::EmptyUpdate => write!(f, "No fields to update"),
            DbError::Query(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DbError {}

pub type DbResult<T> = Result<T, DbError>;

/// Outcome of an INSERT / UPDATE / DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandSummary {
    pub affected: usize,
    pub inserted_rowid: i64,
}

/// A partial update: the columns to assign, in a fixed order.
/// Fields left as `None` are not part of the statement.
pub trait Patch {
    fn assignments(&self) -> Vec<(&'static str, SqlValue)>;
}

/// Shared handle over the SQLite pool. Built once at startup and handed to
/// Rocket as managed state.
#[derive(Clone)]
pub struct Db {
    pool: DbPool,
}

impl Db {
    /// Builds the pool without opening a connection. The first query opens it.
    pub fn open(path: &str) -> Self {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|c| c.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"));
        let pool = Pool::builder()
            .max_size(10)
            .min_idle(Some(0))
            .build_unchecked(manager);
        Db { pool }
    }

    /// Number of connections currently opened by the pool.
    pub fn open_connections(&self) -> u32 {
        self.pool.state().connections
    }

    fn with_conn<T>(
        &self,
        op: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> DbResult<T> {
        let conn = self.pool.get().map_err(|e| failure(&e))?;
        op(&conn).map_err(|e| failure(&e))
    }

    /// Statement returning zero or more rows.
    pub fn query<T, P, F>(&self, sql: &str, params: P, map: F) -> DbResult<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params, map)?;
            rows.collect::<rusqlite::Result<Vec<T>>>()
        })
    }

    /// Statement returning at most one row.
    pub fn single<T, P, F>(&self, sql: &str, params: P, map: F) -> DbResult<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_conn(|conn| conn.query_row(sql, params, map).optional())
    }

    /// INSERT / UPDATE / DELETE.
    pub fn command<P: Params>(&self, sql: &str, params: P) -> DbResult<CommandSummary> {
        self.with_conn(|conn| {
            let affected = conn.execute(sql, params)?;
            Ok(CommandSummary {
                affected,
                inserted_rowid: conn.last_insert_rowid(),
            })
        })
    }

    /// Applies a partial update to the row with `id`, stamping `updated_at`.
    /// An empty patch is rejected before a connection is taken.
    pub fn update_by_id(
        &self,
        table: &str,
        id: &str,
        patch: &impl Patch,
    ) -> DbResult<CommandSummary> {
        let (sql, values) = update_statement(table, id, patch)?;
        let params_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
        self.command(&sql, params_refs.as_slice())
    }

    pub fn run_migrations(&self) -> DbResult<()> {
        self.with_conn(|conn| conn.execute_batch(SCHEMA))
    }
}

/// Builds `UPDATE <table> SET a = ?1, ..., updated_at = CURRENT_TIMESTAMP WHERE id = ?N`.
pub fn update_statement(
    table: &str,
    id: &str,
    patch: &impl Patch,
) -> DbResult<(String, Vec<SqlValue>)> {
    let assignments = patch.assignments();
    if assignments.is_empty() {
        return Err(DbError::EmptyUpdate);
    }

    let mut sets = Vec::with_capacity(assignments.len() + 1);
    let mut values: Vec<SqlValue> = Vec::with_capacity(assignments.len() + 1);
    for (i, (column, value)) in assignments.into_iter().enumerate() {
        sets.push(format!("{} = ?{}", column, i + 1));
        values.push(value);
    }
    sets.push("updated_at = CURRENT_TIMESTAMP".to_string());
    values.push(Box::new(id.to_string()));

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        table,
        sets.join(", "),
        values.len()
    );
    Ok((sql, values))
}

/// `%keyword%` for a `LIKE ... ESCAPE '\'` clause, with the keyword's own
/// wildcards taken literally.
pub fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

// Only the driver message is logged. Statement text and bound values stay out
// of shared logs.
fn failure(err: &dyn fmt::Display) -> DbError {
    let msg = err.to_string();
    log::error!("[db] operation failed: {}", msg);
    DbError::Query(msg)
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS gallery_images (
        id TEXT PRIMARY KEY,
        src TEXT NOT NULL,
        alt TEXT NOT NULL DEFAULT '',
        metadata TEXT NOT NULL DEFAULT '{}',
        display_order INTEGER NOT NULL DEFAULT 0,
        file_size INTEGER,
        mime_type TEXT,
        width INTEGER,
        height INTEGER,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_gallery_active ON gallery_images(is_active, display_order);

    CREATE TABLE IF NOT EXISTS birthday_messages (
        id TEXT PRIMARY KEY,
        message TEXT NOT NULL,
        author TEXT NOT NULL DEFAULT 'Anonymous',
        likes INTEGER NOT NULL DEFAULT 0,
        is_approved INTEGER NOT NULL DEFAULT 0,
        ip_address TEXT,
        user_agent TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_messages_approved ON birthday_messages(is_approved, created_at);

    CREATE TABLE IF NOT EXISTS birthday_wishes (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        wish TEXT NOT NULL,
        email TEXT,
        is_approved INTEGER NOT NULL DEFAULT 0,
        ip_address TEXT,
        user_agent TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_wishes_approved ON birthday_wishes(is_approved, created_at);

    CREATE TABLE IF NOT EXISTS visitors (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL DEFAULT 'Anonymous Visitor',
        visited_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        ip_address TEXT,
        user_agent TEXT,
        session_id TEXT,
        referrer TEXT,
        country TEXT,
        city TEXT,
        device_type TEXT,
        browser TEXT,
        os TEXT,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_visitors_date ON visitors(visited_at);
    CREATE INDEX IF NOT EXISTS idx_visitors_ip ON visitors(ip_address);
    CREATE INDEX IF NOT EXISTS idx_visitors_session ON visitors(session_id);

    CREATE TABLE IF NOT EXISTS analytics (
        id INTEGER PRIMARY KEY,
        metric_name TEXT NOT NULL,
        metric_value REAL NOT NULL DEFAULT 0,
        metric_date DATE NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(metric_name, metric_date)
    );
";

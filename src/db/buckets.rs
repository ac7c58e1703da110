//! Knowledge bucket blobs

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};

pub fn get_bucket(conn: &Connection, key: &str) -> Result<Option<String>> {
  conn
    .query_row(
      "SELECT value FROM knowledge_buckets WHERE key = ?1",
      params![key],
      |row| row.get(0),
    )
    .optional()
}

pub fn put_bucket(conn: &Connection, key: &str, value: &str) -> Result<()> {
  conn.execute(
    "INSERT OR REPLACE INTO knowledge_buckets (key, value, updated_at) VALUES (?1, ?2, ?3)",
    params![key, value, Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

/// When a bucket was last written. Rows from before timestamps were kept
/// have none.
pub fn bucket_updated_at(conn: &Connection, key: &str) -> Result<Option<DateTime<Utc>>> {
  let raw: Option<Option<String>> = conn
    .query_row(
      "SELECT updated_at FROM knowledge_buckets WHERE key = ?1",
      params![key],
      |row| row.get(0),
    )
    .optional()?;

  Ok(raw.flatten().and_then(|s| {
    DateTime::parse_from_rfc3339(&s)
      .map(|dt| dt.with_timezone(&Utc))
      .ok()
  }))
}

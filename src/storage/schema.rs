//! Database schema for the staging loader
//!
//! One `podcasts` row per staged item and one `tracks` row per stored audio
//! track, in the item's track order.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS podcasts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    staging_key TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    poster TEXT NOT NULL,
    original_url TEXT NOT NULL,
    date_created TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tracks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    podcast_id INTEGER NOT NULL REFERENCES podcasts(id),
    position INTEGER NOT NULL,
    path TEXT NOT NULL,
    date_created TEXT NOT NULL,
    UNIQUE(podcast_id, position)
);

CREATE INDEX IF NOT EXISTS idx_tracks_podcast ON tracks(podcast_id);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

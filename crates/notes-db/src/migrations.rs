use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const SCHEMA_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version = current_version(conn)?;

    if version < 1 {
        info!("Running migration v1 (users, notes, note_owners)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL
            );

            CREATE TABLE notes (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                date        TEXT NOT NULL,
                date_millis INTEGER NOT NULL DEFAULT 0,
                color       TEXT NOT NULL,
                created_at  INTEGER NOT NULL DEFAULT 0,
                updated_at  INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE note_owners (
                note_id     TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (note_id, user_id)
            );

            CREATE INDEX idx_note_owners_user ON note_owners(user_id);

            -- A note never outlives its last owner, whichever way the
            -- ownership row went away.
            CREATE TRIGGER note_owners_drop_orphan
            AFTER DELETE ON note_owners
            WHEN NOT EXISTS (SELECT 1 FROM note_owners WHERE note_id = OLD.note_id)
            BEGIN
                DELETE FROM notes WHERE id = OLD.note_id;
            END;

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", SCHEMA_VERSION);
    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

use crate::Database;
use crate::error::{StoreError, StoreResult, is_unique_violation};
use crate::models::{NoteRow, UserRow};
use crate::source::{DeleteOutcome, distinct_owners};
use notes_types::{Note, User};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::collections::HashMap;
use tracing::debug;

const NOTE_COLUMNS: &str =
    "n.id, n.title, n.content, n.date, n.date_millis, n.color, n.created_at, n.updated_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &User) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (&user.id, &user.email, &user.password),
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("user {} already exists", user.email))
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Notes --

    pub fn get_note(&self, note_id: &str) -> StoreResult<Option<Note>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let Some(row) = query_note(&tx, note_id)? else {
                return Ok(None);
            };
            let owners = query_owners(&tx, note_id)?;
            Ok(Some(row.into_note(owners)))
        })
    }

    /// Notes owned by the user with `email`, oldest first.
    pub fn get_notes_for_email(&self, email: &str) -> StoreResult<Vec<Note>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let Some(user) = query_user(&tx, "email", email)? else {
                return Ok(vec![]);
            };

            let mut stmt = tx.prepare(&format!(
                "SELECT {NOTE_COLUMNS}
                 FROM notes n
                 JOIN note_owners o ON o.note_id = n.id
                 WHERE o.user_id = ?1
                 ORDER BY n.created_at, n.id"
            ))?;
            let rows = stmt
                .query_map([&user.id], map_note_row)?
                .collect::<Result<Vec<_>, _>>()?;

            let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            let mut owners = query_owners_for_notes(&tx, &ids)?;

            Ok(rows
                .into_iter()
                .map(|row| {
                    let note_owners = owners.remove(&row.id).unwrap_or_default();
                    row.into_note(note_owners)
                })
                .collect())
        })
    }

    /// Insert-or-update in one IMMEDIATE transaction. `note.id` must already
    /// be resolved.
    /// Insert or update a note. `clock` is read once the write transaction
    /// holds the lock, so timestamps follow commit order.
    pub fn upsert_note(
        &self,
        id: &str,
        note: &Note,
        clock: impl FnOnce() -> i64,
    ) -> StoreResult<Note> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = clock();

            let exists = tx
                .query_row("SELECT 1 FROM notes WHERE id = ?1", [id], |_| Ok(()))
                .optional()?
                .is_some();

            if exists {
                tx.execute(
                    "UPDATE notes
                     SET title = ?2, content = ?3, date = ?4, date_millis = ?5, color = ?6, updated_at = ?7
                     WHERE id = ?1",
                    params![id, note.title, note.content, note.date, note.date_millis, note.color, now],
                )?;
                debug!("Updated note {}", id);
            } else {
                let owners = distinct_owners(&note.owners);
                if owners.is_empty() {
                    return Err(StoreError::Constraint(format!("note {} has no owners", id)));
                }

                tx.execute(
                    "INSERT INTO notes (id, title, content, date, date_millis, color, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
                    params![id, note.title, note.content, note.date, note.date_millis, note.color, now],
                )?;

                let mut insert_owner =
                    tx.prepare("INSERT INTO note_owners (note_id, user_id) VALUES (?1, ?2)")?;
                for owner in &owners {
                    insert_owner.execute([id, owner.as_str()]).map_err(|e| match e.sqlite_error_code() {
                        Some(rusqlite::ErrorCode::ConstraintViolation) => {
                            StoreError::Constraint(format!("owner {} is not a registered user", owner))
                        }
                        _ => e.into(),
                    })?;
                }
                drop(insert_owner);
                debug!("Created note {} with {} owner(s)", id, owners.len());
            }

            let saved = query_note(&tx, id)?
                .ok_or_else(|| StoreError::NotFound(format!("note {}", id)))?
                .into_note(query_owners(&tx, id)?);
            tx.commit()?;
            Ok(saved)
        })
    }

    pub fn delete_note_for_user(&self, user_id: &str, note_id: &str) -> StoreResult<DeleteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let owners = query_owners(&tx, note_id)?;
            if !owners.iter().any(|o| o == user_id) {
                return Err(StoreError::not_owner(user_id, note_id));
            }

            let outcome = if owners.len() == 1 {
                // note_owners rows go with it (ON DELETE CASCADE)
                tx.execute("DELETE FROM notes WHERE id = ?1", [note_id])?;
                DeleteOutcome::NoteDeleted
            } else {
                tx.execute(
                    "DELETE FROM note_owners WHERE note_id = ?1 AND user_id = ?2",
                    [note_id, user_id],
                )?;
                DeleteOutcome::OwnershipRemoved
            };

            tx.commit()?;
            debug!("delete_note_for_user({}, {}) -> {:?}", user_id, note_id, outcome);
            Ok(outcome)
        })
    }

    pub fn add_owner(&self, user_id: &str, note_id: &str) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if query_note(&tx, note_id)?.is_none() {
                return Err(StoreError::NotFound(format!("note {}", note_id)));
            }
            if query_user(&tx, "id", user_id)?.is_none() {
                return Err(StoreError::NotFound(format!("user {}", user_id)));
            }

            tx.execute(
                "INSERT OR IGNORE INTO note_owners (note_id, user_id) VALUES (?1, ?2)",
                [note_id, user_id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn is_owner(&self, user_id: &str, note_id: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM note_owners WHERE note_id = ?1 AND user_id = ?2",
                    [note_id, user_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<UserRow>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT id, email, password FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        date: row.get(3)?,
        date_millis: row.get(4)?,
        color: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn query_note(conn: &Connection, note_id: &str) -> StoreResult<Option<NoteRow>> {
    let mut stmt = conn.prepare_cached(&format!("SELECT {NOTE_COLUMNS} FROM notes n WHERE n.id = ?1"))?;
    Ok(stmt.query_row([note_id], map_note_row).optional()?)
}

/// Owners in the order they were granted access.
fn query_owners(conn: &Connection, note_id: &str) -> StoreResult<Vec<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT user_id FROM note_owners WHERE note_id = ?1 ORDER BY rowid")?;
    let owners = stmt
        .query_map([note_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(owners)
}

/// Batch-fetch owners for a set of note ids.
fn query_owners_for_notes(
    conn: &Connection,
    note_ids: &[String],
) -> StoreResult<HashMap<String, Vec<String>>> {
    if note_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (1..=note_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT note_id, user_id FROM note_owners WHERE note_id IN ({}) ORDER BY rowid",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut owners: HashMap<String, Vec<String>> = HashMap::new();
    let rows = stmt.query_map(rusqlite::params_from_iter(note_ids), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (note_id, user_id) = row?;
        owners.entry(note_id).or_default().push(user_id);
    }

    Ok(owners)
}

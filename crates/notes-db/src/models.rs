//! Database row types — these map directly to SQLite rows.
//! Owners are not part of `NoteRow`; they live in `note_owners` and are
//! joined in when a `Note` is assembled.

use notes_types::{Note, User};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password: row.password,
        }
    }
}

pub struct NoteRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub date: String,
    pub date_millis: i64,
    pub color: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NoteRow {
    pub fn into_note(self, owners: Vec<String>) -> Note {
        Note {
            id: Some(self.id),
            title: self.title,
            content: self.content,
            date: self.date,
            date_millis: self.date_millis,
            owners,
            color: self.color,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

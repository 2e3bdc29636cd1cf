use serde::{Deserialize, Serialize};

/// A registered account.
///
/// `password` holds the stored credential: an argon2 PHC string for every
/// account created through registration, or a plaintext value for accounts
/// imported from before hashing existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Empty until the data source assigns one.
    #[serde(default)]
    pub id: String,
    pub email: String,
    pub password: String,
}

impl User {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// A shared note. `owners` is always computed from the ownership relation
/// when a note is read back, never trusted from a stored copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// `None` asks the data source to generate an id on save.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub date: String,
    #[serde(default)]
    pub date_millis: i64,
    pub owners: Vec<String>,
    pub color: String,
    /// Epoch millis, 0 until first persisted.
    #[serde(default)]
    pub created_at: i64,
    /// Epoch millis, 0 until the first update.
    #[serde(default)]
    pub updated_at: i64,
}

impl Note {
    /// A fresh, unsaved note owned by `owners`.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        owners: Vec<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            date: String::new(),
            date_millis: 0,
            owners,
            color: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owners.iter().any(|owner| owner == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_json_uses_camel_case() {
        let mut note = Note::new("shopping", "milk", vec!["u1".into()]);
        note.date_millis = 42;

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["dateMillis"], 42);
        assert_eq!(json["createdAt"], 0);
        assert!(json["id"].is_null());
    }

    #[test]
    fn note_without_id_or_timestamps_deserializes() {
        let note: Note = serde_json::from_str(
            r#"{"title":"t","content":"c","date":"today","owners":["u1"],"color":"FFA500"}"#,
        )
        .unwrap();
        assert_eq!(note.id, None);
        assert_eq!(note.created_at, 0);
        assert!(note.is_owned_by("u1"));
        assert!(!note.is_owned_by("u2"));
    }

    #[test]
    fn user_id_defaults_to_empty() {
        let user: User = serde_json::from_str(r#"{"email":"a@b.c","password":"pw"}"#).unwrap();
        assert!(user.id.is_empty());
        assert_eq!(user, User::new("a@b.c", "pw"));
    }
}

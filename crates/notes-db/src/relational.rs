use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use notes_types::{Note, User};
use tracing::{info, warn};

use crate::Database;
use crate::error::StoreResult;
use crate::source::{DeleteOutcome, NotesDataSource, check_credential, new_id, now_millis};

/// `NotesDataSource` over SQLite. Ownership is the `note_owners` table and a
/// note's `owners` is always read back from it.
#[derive(Clone)]
pub struct RelationalDataSource {
    db: Arc<Database>,
}

impl RelationalDataSource {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Run blocking DB work off the async runtime. The closure runs to
    /// completion even if the caller stops waiting, so a transaction is
    /// never cut in half.
    async fn blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&*db)).await?
    }
}

#[async_trait]
impl NotesDataSource for RelationalDataSource {
    async fn register_user(&self, user: User) -> StoreResult<User> {
        let mut user = user;
        if user.id.is_empty() {
            user.id = new_id();
        }

        let result = self
            .blocking(move |db| db.create_user(&user).map(|_| user))
            .await;
        if let Err(e) = &result {
            warn!("register_user failed: {}", e);
        } else {
            info!("Registered user");
        }
        result
    }

    async fn user_email_exists(&self, email: &str) -> StoreResult<bool> {
        let email = email.to_string();
        self.blocking(move |db| Ok(db.get_user_by_email(&email)?.is_some()))
            .await
    }

    async fn user_id_exists(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.blocking(move |db| Ok(db.get_user_by_id(&id)?.is_some()))
            .await
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_string();
        self.blocking(move |db| Ok(db.get_user_by_email(&email)?.map(User::from)))
            .await
    }

    async fn get_email_for_user_id(&self, user_id: &str) -> StoreResult<Option<String>> {
        let user_id = user_id.to_string();
        self.blocking(move |db| Ok(db.get_user_by_id(&user_id)?.map(|u| u.email)))
            .await
    }

    async fn check_password_for_email(&self, email: &str, candidate: &str) -> StoreResult<bool> {
        let Some(user) = self.get_user_by_email(email).await? else {
            return Ok(false);
        };
        check_credential(email, candidate, user.password).await
    }

    async fn get_notes_for_user_by_email(&self, email: &str) -> StoreResult<Vec<Note>> {
        let email = email.to_string();
        self.blocking(move |db| db.get_notes_for_email(&email)).await
    }

    async fn save_note(&self, note: Note) -> StoreResult<Note> {
        let id = note.id.clone().unwrap_or_else(new_id);
        let result = self
            .blocking(move |db| db.upsert_note(&id, &note, now_millis))
            .await;
        if let Err(e) = &result {
            warn!("save_note failed: {}", e);
        }
        result
    }

    async fn delete_note_for_user(
        &self,
        user_id: &str,
        note_id: &str,
    ) -> StoreResult<DeleteOutcome> {
        let (user_id, note_id) = (user_id.to_string(), note_id.to_string());
        self.blocking(move |db| db.delete_note_for_user(&user_id, &note_id))
            .await
    }

    async fn get_note(&self, note_id: &str) -> StoreResult<Option<Note>> {
        let note_id = note_id.to_string();
        self.blocking(move |db| db.get_note(&note_id)).await
    }

    async fn add_owner_to_note(&self, user_id: &str, note_id: &str) -> StoreResult<()> {
        let (user_id, note_id) = (user_id.to_string(), note_id.to_string());
        self.blocking(move |db| db.add_owner(&user_id, &note_id))
            .await
    }

    async fn is_owner_of_note(&self, user_id: &str, note_id: &str) -> StoreResult<bool> {
        let (user_id, note_id) = (user_id.to_string(), note_id.to_string());
        self.blocking(move |db| db.is_owner(&user_id, &note_id))
            .await
    }
}

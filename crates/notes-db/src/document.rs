//! Embedded document store backend.
//!
//! Users and notes are kept as documents in two collections keyed by `_id`.
//! A note document embeds its owner list, so ownership changes are edits to
//! one document. Every check-then-act sequence runs inside a single
//! write-lock critical section that never awaits.
//!
//! With a path configured, writes are serialized: each one edits a copy of
//! the collections, writes that copy as a JSON snapshot (temp file, then
//! rename), and only then replaces the live collections. A failed snapshot
//! leaves the store as it was.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use notes_types::{Note, User};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::source::{
    DeleteOutcome, NotesDataSource, check_credential, distinct_owners, new_id, now_millis,
};

trait Document {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    email: String,
    password: String,
}

impl Document for UserDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

impl From<User> for UserDocument {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            password: user.password,
        }
    }
}

impl From<&UserDocument> for User {
    fn from(doc: &UserDocument) -> Self {
        User {
            id: doc.id.clone(),
            email: doc.email.clone(),
            password: doc.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    content: String,
    date: String,
    date_millis: i64,
    color: String,
    owners: Vec<String>,
    created_at: i64,
    updated_at: i64,
}

impl Document for NoteDocument {
    fn id(&self) -> &str {
        &self.id
    }
}

impl NoteDocument {
    fn to_note(&self) -> Note {
        Note {
            id: Some(self.id.clone()),
            title: self.title.clone(),
            content: self.content.clone(),
            date: self.date.clone(),
            date_millis: self.date_millis,
            owners: self.owners.clone(),
            color: self.color.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn is_owned_by(&self, user_id: &str) -> bool {
        self.owners.iter().any(|o| o == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
struct Collection<D> {
    docs: BTreeMap<String, D>,
}

impl<D> Default for Collection<D> {
    fn default() -> Self {
        Self {
            docs: BTreeMap::new(),
        }
    }
}

impl<D: Document> Collection<D> {
    fn find_by_id(&self, id: &str) -> Option<&D> {
        self.docs.get(id)
    }

    fn find_by_id_mut(&mut self, id: &str) -> Option<&mut D> {
        self.docs.get_mut(id)
    }

    fn find_one(&self, filter: impl Fn(&D) -> bool) -> Option<&D> {
        self.docs.values().find(|doc| filter(doc))
    }

    fn find<'a>(&'a self, filter: impl Fn(&D) -> bool + 'a) -> impl Iterator<Item = &'a D> + 'a {
        self.docs.values().filter(move |doc| filter(doc))
    }

    /// Fails on a duplicate `_id`, like a primary key.
    fn insert_one(&mut self, doc: D) -> StoreResult<()> {
        if self.docs.contains_key(doc.id()) {
            return Err(StoreError::Conflict(format!("duplicate _id {}", doc.id())));
        }
        self.docs.insert(doc.id().to_string(), doc);
        Ok(())
    }

    fn delete_one(&mut self, id: &str) -> Option<D> {
        self.docs.remove(id)
    }

    fn len(&self) -> usize {
        self.docs.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    users: Collection<UserDocument>,
    #[serde(default)]
    notes: Collection<NoteDocument>,
}

struct Snapshot {
    path: PathBuf,
    /// Held from copy to swap, so writers never build on a stale copy.
    writer: Arc<tokio::sync::Mutex<()>>,
}

impl Snapshot {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

fn write_snapshot(path: &Path, collections: &Collections) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(collections)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    debug!("Document snapshot written to {}", path.display());
    Ok(())
}

/// `NotesDataSource` over the embedded document store.
pub struct DocumentDataSource {
    state: Arc<RwLock<Collections>>,
    snapshot: Option<Snapshot>,
}

impl DocumentDataSource {
    /// A store that lives only as long as this value.
    pub fn in_memory() -> Self {
        info!("In-memory document store opened");
        Self {
            state: Arc::new(RwLock::new(Collections::default())),
            snapshot: None,
        }
    }

    /// Load the snapshot at `path` if there is one, and keep it up to date
    /// after every write.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let collections = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice::<Collections>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::default(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Document store opened at {} ({} users, {} notes)",
            path.display(),
            collections.users.len(),
            collections.notes.len()
        );
        Ok(Self {
            state: Arc::new(RwLock::new(collections)),
            snapshot: Some(Snapshot::new(path)),
        })
    }

    fn read<T>(&self, f: impl FnOnce(&Collections) -> T) -> StoreResult<T> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(f(&state))
    }

    /// Apply `f` atomically. `f` must validate before it mutates anything:
    /// an `Err` return leaves the collections as they were.
    ///
    /// Persistent stores apply `f` to a copy. The snapshot write and the swap
    /// run on a blocking task that owns the writer guard, so dropping the
    /// caller cannot leave disk and memory disagreeing.
    async fn write<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Collections) -> StoreResult<T>,
    {
        let Some(snapshot) = &self.snapshot else {
            let mut state = self.state.write().map_err(poisoned)?;
            return f(&mut state);
        };

        let guard = Arc::clone(&snapshot.writer).lock_owned().await;
        let mut draft = self.read(Collections::clone)?;
        let value = f(&mut draft)?;

        let state = Arc::clone(&self.state);
        let path = snapshot.path.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            write_snapshot(&path, &draft)?;
            *state.write().map_err(poisoned)? = draft;
            Ok::<_, StoreError>(())
        })
        .await??;
        Ok(value)
    }
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Transient("document store lock poisoned".into())
}

#[async_trait]
impl NotesDataSource for DocumentDataSource {
    async fn register_user(&self, user: User) -> StoreResult<User> {
        let mut user = user;
        if user.id.is_empty() {
            user.id = new_id();
        }

        let result = self
            .write(move |c| {
                if c.users.find_one(|u| u.email == user.email).is_some() {
                    return Err(StoreError::Conflict(format!(
                        "user {} already exists",
                        user.email
                    )));
                }
                c.users.insert_one(UserDocument::from(user.clone()))?;
                Ok(user)
            })
            .await;
        if let Err(e) = &result {
            warn!("register_user failed: {}", e);
        } else {
            info!("Registered user");
        }
        result
    }

    async fn user_email_exists(&self, email: &str) -> StoreResult<bool> {
        self.read(|c| c.users.find_one(|u| u.email == email).is_some())
    }

    async fn user_id_exists(&self, id: &str) -> StoreResult<bool> {
        self.read(|c| c.users.find_by_id(id).is_some())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.read(|c| c.users.find_one(|u| u.email == email).map(User::from))
    }

    async fn get_email_for_user_id(&self, user_id: &str) -> StoreResult<Option<String>> {
        self.read(|c| c.users.find_by_id(user_id).map(|u| u.email.clone()))
    }

    async fn check_password_for_email(&self, email: &str, candidate: &str) -> StoreResult<bool> {
        let Some(user) = self.get_user_by_email(email).await? else {
            return Ok(false);
        };
        check_credential(email, candidate, user.password).await
    }

    async fn get_notes_for_user_by_email(&self, email: &str) -> StoreResult<Vec<Note>> {
        self.read(|c| {
            let Some(user) = c.users.find_one(|u| u.email == email) else {
                return vec![];
            };
            let mut notes: Vec<Note> = c
                .notes
                .find(|n| n.is_owned_by(&user.id))
                .map(NoteDocument::to_note)
                .collect();
            notes.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
            notes
        })
    }

    async fn save_note(&self, note: Note) -> StoreResult<Note> {
        let id = note.id.clone().unwrap_or_else(new_id);

        let result = self
            .write(move |c| {
                let now = now_millis();
                if let Some(doc) = c.notes.find_by_id_mut(&id) {
                    doc.title = note.title;
                    doc.content = note.content;
                    doc.date = note.date;
                    doc.date_millis = note.date_millis;
                    doc.color = note.color;
                    doc.updated_at = now;
                    debug!("Updated note {}", id);
                    return Ok(doc.to_note());
                }

                let owners = distinct_owners(&note.owners);
                if owners.is_empty() {
                    return Err(StoreError::Constraint(format!("note {} has no owners", id)));
                }
                if let Some(missing) = owners.iter().find(|o| c.users.find_by_id(o).is_none()) {
                    return Err(StoreError::Constraint(format!(
                        "owner {} is not a registered user",
                        missing
                    )));
                }

                let doc = NoteDocument {
                    id: id.clone(),
                    title: note.title,
                    content: note.content,
                    date: note.date,
                    date_millis: note.date_millis,
                    color: note.color,
                    owners,
                    created_at: now,
                    updated_at: 0,
                };
                let saved = doc.to_note();
                c.notes.insert_one(doc)?;
                debug!("Created note {} with {} owner(s)", id, saved.owners.len());
                Ok(saved)
            })
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
        let outcome = self
            .write(|c| {
                let Some(doc) = c
                    .notes
                    .find_by_id_mut(note_id)
                    .filter(|doc| doc.is_owned_by(user_id))
                else {
                    return Err(StoreError::not_owner(user_id, note_id));
                };

                if doc.owners.len() > 1 {
                    doc.owners.retain(|o| o != user_id);
                    return Ok(DeleteOutcome::OwnershipRemoved);
                }

                c.notes.delete_one(note_id);
                Ok(DeleteOutcome::NoteDeleted)
            })
            .await?;

        debug!("delete_note_for_user({}, {}) -> {:?}", user_id, note_id, outcome);
        Ok(outcome)
    }

    async fn get_note(&self, note_id: &str) -> StoreResult<Option<Note>> {
        self.read(|c| c.notes.find_by_id(note_id).map(NoteDocument::to_note))
    }

    async fn add_owner_to_note(&self, user_id: &str, note_id: &str) -> StoreResult<()> {
        self.write(|c| {
            if c.notes.find_by_id(note_id).is_none() {
                return Err(StoreError::NotFound(format!("note {}", note_id)));
            }
            if c.users.find_by_id(user_id).is_none() {
                return Err(StoreError::NotFound(format!("user {}", user_id)));
            }

            // $addToSet
            if let Some(doc) = c.notes.find_by_id_mut(note_id) {
                if !doc.is_owned_by(user_id) {
                    doc.owners.push(user_id.to_string());
                }
            }
            Ok(())
        })
        .await
    }

    async fn is_owner_of_note(&self, user_id: &str, note_id: &str) -> StoreResult<bool> {
        self.read(|c| {
            c.notes
                .find_by_id(note_id)
                .is_some_and(|doc| doc.is_owned_by(user_id))
        })
    }
}

use async_trait::async_trait;
use notes_types::{Note, User};
use tracing::warn;
use uuid::Uuid;

use crate::error::StoreResult;

/// What `delete_note_for_user` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The caller was the last owner; the note and its ownership are gone.
    NoteDeleted,
    /// Only the caller's ownership was removed; the note lives on.
    OwnershipRemoved,
}

/// Storage contract shared by every backend.
///
/// Backends must be observably identical: the same sequence of calls yields
/// the same values and the same error kinds whichever backend serves it.
/// Each multi-step write (`save_note`, `delete_note_for_user`,
/// `add_owner_to_note`) runs as one atomic unit.
#[async_trait]
pub trait NotesDataSource: Send + Sync {
    /// Stores `user` as given, generating an id when it is empty. The
    /// credential is stored verbatim; hashing is the caller's job.
    async fn register_user(&self, user: User) -> StoreResult<User>;

    async fn user_email_exists(&self, email: &str) -> StoreResult<bool>;

    async fn user_id_exists(&self, id: &str) -> StoreResult<bool>;

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn get_email_for_user_id(&self, user_id: &str) -> StoreResult<Option<String>>;

    /// `false` for unknown emails as well as wrong passwords.
    async fn check_password_for_email(&self, email: &str, candidate: &str) -> StoreResult<bool>;

    /// Notes the user owns, ordered by creation time. Unknown email gives
    /// an empty list.
    async fn get_notes_for_user_by_email(&self, email: &str) -> StoreResult<Vec<Note>>;

    /// Upsert keyed by id. Creating writes the initial owners; updating
    /// only touches content fields and `updated_at`.
    async fn save_note(&self, note: Note) -> StoreResult<Note>;

    async fn delete_note_for_user(&self, user_id: &str, note_id: &str)
    -> StoreResult<DeleteOutcome>;

    async fn get_note(&self, note_id: &str) -> StoreResult<Option<Note>>;

    /// Idempotent: adding an existing owner succeeds without a second row.
    async fn add_owner_to_note(&self, user_id: &str, note_id: &str) -> StoreResult<()>;

    async fn is_owner_of_note(&self, user_id: &str, note_id: &str) -> StoreResult<bool>;
}

/// Verify `candidate` against a stored credential on the blocking pool,
/// since argon2 is deliberately slow.
pub(crate) async fn check_credential(
    email: &str,
    candidate: &str,
    stored: String,
) -> StoreResult<bool> {
    let candidate = candidate.to_string();
    let (matched, legacy) = tokio::task::spawn_blocking(move || {
        (
            notes_crypto::verify_password(&candidate, &stored),
            !notes_crypto::is_hashed(&stored),
        )
    })
    .await?;

    if matched && legacy {
        warn!("Plaintext credential accepted for {}; account predates hashing", email);
    }
    Ok(matched)
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Owner ids in first-seen order without repeats.
pub(crate) fn distinct_owners(owners: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(owners.len());
    for owner in owners {
        if !seen.contains(owner) {
            seen.push(owner.clone());
        }
    }
    seen
}

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::Response,
};
use notes_db::{DeleteOutcome, StoreError};
use notes_types::api::DeleteNoteRequest;
use notes_types::{Note, User};
use tracing::{info, warn};

use crate::auth::AppState;
use crate::middleware::AuthUser;
use crate::response::{message, store_failure, success};

/// Resolve the authenticated email to its user record. Credentials were
/// already checked, so a miss means the account vanished mid-request.
pub(crate) async fn caller(state: &AppState, auth: &AuthUser) -> Result<User, Response> {
    match state.source.get_user_by_email(&auth.email).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(message(StatusCode::BAD_REQUEST, "User not found")),
        Err(e) => Err(store_failure("caller lookup", e)),
    }
}

pub async fn get_notes(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> Response {
    match state.source.get_notes_for_user_by_email(&auth.email).await {
        Ok(notes) => {
            let plural = if notes.len() == 1 { "" } else { "s" };
            success(StatusCode::OK, format!("{} note{} found", notes.len(), plural), notes)
        }
        Err(e) => store_failure("get_notes", e),
    }
}

pub async fn save_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(note): Json<Note>,
) -> Response {
    let user = match caller(&state, &auth).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    // Only owners may overwrite an existing note.
    let mut is_update = false;
    if let Some(id) = &note.id {
        match state.source.get_note(id).await {
            Ok(Some(existing)) if !existing.is_owned_by(&user.id) => {
                warn!("User {} tried to modify note {} without owning it", user.id, id);
                return message(StatusCode::FORBIDDEN, "Note not saved (Owner not authorized)");
            }
            Ok(existing) => is_update = existing.is_some(),
            Err(e) => return store_failure("save_note", e),
        }
    }

    match state.source.save_note(note).await {
        Ok(saved) => {
            let verb = if is_update { "updated" } else { "added" };
            info!("Note {:?} {} by {}", saved.id, verb, user.id);
            success(StatusCode::OK, format!("Note {}", verb), saved)
        }
        Err(e) => store_failure("save_note", e),
    }
}

pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DeleteNoteRequest>,
) -> Response {
    let user = match caller(&state, &auth).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match state.source.delete_note_for_user(&user.id, &req.id).await {
        Ok(DeleteOutcome::NoteDeleted) => message(StatusCode::OK, "Note deleted"),
        Ok(DeleteOutcome::OwnershipRemoved) => match state.source.get_note(&req.id).await {
            Ok(Some(note)) => success(StatusCode::OK, "Owner removed from note", note),
            // The remaining owners deleted it in the meantime.
            Ok(None) => message(StatusCode::OK, "Owner removed from note"),
            Err(e) => store_failure("delete_note", e),
        },
        Err(StoreError::NotOwner { .. }) => message(
            StatusCode::FORBIDDEN,
            "Note not deleted (Owner not authorized)",
        ),
        Err(e) => store_failure("delete_note", e),
    }
}

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use notes_types::api::{AddOwnerIdToNoteIdRequest, EmailQuery, OwnerIdQuery};
use tracing::warn;

use crate::auth::AppState;
use crate::middleware::AuthUser;
use crate::notes::caller;
use crate::response::{message, refused, store_failure, success};

pub async fn add_owner_to_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<AddOwnerIdToNoteIdRequest>,
) -> Response {
    let source = &state.source;

    match source.user_id_exists(&req.owner_id_to_add).await {
        Ok(true) => {}
        Ok(false) => {
            return message(
                StatusCode::BAD_REQUEST,
                "User was not found - Can't add owner to note",
            );
        }
        Err(e) => return store_failure("add_owner", e),
    }

    let user = match caller(&state, &auth).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    match source.is_owner_of_note(&user.id, &req.note_id).await {
        Ok(true) => {}
        Ok(false) => {
            return message(
                StatusCode::FORBIDDEN,
                "Note not updated (Owner not authorized)",
            );
        }
        Err(e) => return store_failure("add_owner", e),
    }

    let email = match source.get_email_for_user_id(&req.owner_id_to_add).await {
        Ok(Some(email)) => email,
        Ok(None) => req.owner_id_to_add.clone(),
        Err(e) => {
            warn!("Email lookup for {} failed, using id: {}", req.owner_id_to_add, e);
            req.owner_id_to_add.clone()
        }
    };

    match source.is_owner_of_note(&req.owner_id_to_add, &req.note_id).await {
        Ok(false) => {}
        Ok(true) => {
            return match source.get_note(&req.note_id).await {
                Ok(note) => refused(
                    StatusCode::OK,
                    format!("{} is already an owner of this note", email),
                    note,
                ),
                Err(e) => store_failure("add_owner", e),
            };
        }
        Err(e) => return store_failure("add_owner", e),
    }

    if let Err(e) = source.add_owner_to_note(&req.owner_id_to_add, &req.note_id).await {
        return store_failure("add_owner", e);
    }

    match source.get_note(&req.note_id).await {
        Ok(Some(note)) => success(
            StatusCode::OK,
            format!("Owner added to note, {} can now access this note", email),
            note,
        ),
        Ok(None) => message(
            StatusCode::NOT_FOUND,
            "Note not updated - cant find note",
        ),
        Err(e) => store_failure("add_owner", e),
    }
}

pub async fn get_owner_id_for_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Response {
    match state.source.get_user_by_email(&query.email).await {
        Ok(Some(user)) => success(StatusCode::OK, "User found", user.id),
        Ok(None) => message(StatusCode::BAD_REQUEST, "User not found"),
        Err(e) => store_failure("get_owner_id_for_email", e),
    }
}

pub async fn get_email_for_owner_id(
    State(state): State<AppState>,
    Query(query): Query<OwnerIdQuery>,
) -> Response {
    match state.source.get_email_for_user_id(&query.owner_id).await {
        Ok(Some(email)) => success(StatusCode::OK, "User found", email),
        Ok(None) => message(StatusCode::BAD_REQUEST, "User not found"),
        Err(e) => store_failure("get_email_for_owner_id", e),
    }
}

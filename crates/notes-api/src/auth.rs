use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::Response};
use notes_db::{NotesDataSource, StoreError};
use notes_types::User;
use notes_types::api::AccountRequest;
use tracing::{error, info};

use crate::response::{message, store_failure};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub source: Arc<dyn NotesDataSource>,
}

pub async fn register(State(state): State<AppState>, Json(req): Json<AccountRequest>) -> Response {
    if req.email.trim().is_empty() || req.password.trim().is_empty() {
        return message(
            StatusCode::PRECONDITION_FAILED,
            "Error: Email or password is blank",
        );
    }

    match state.source.user_email_exists(&req.email).await {
        Ok(false) => {}
        Ok(true) => return message(StatusCode::CONFLICT, "Error: User/Email already exists"),
        Err(e) => return store_failure("register", e),
    }

    // Hash password with Argon2id off the async runtime
    let password = req.password;
    let password_hash =
        match tokio::task::spawn_blocking(move || notes_crypto::hash_password(&password)).await {
            Ok(Ok(hash)) => hash,
            Ok(Err(e)) => {
                error!("password hashing failed: {}", e);
                return message(StatusCode::INTERNAL_SERVER_ERROR, "Error: User could not be registered");
            }
            Err(e) => {
                error!("spawn_blocking join error: {}", e);
                return message(StatusCode::INTERNAL_SERVER_ERROR, "Error: User could not be registered");
            }
        };

    match state.source.register_user(User::new(req.email, password_hash)).await {
        Ok(user) => {
            info!("Registered user {}", user.id);
            message(StatusCode::CREATED, "User registered successfully")
        }
        // Lost a race with a concurrent registration of the same email.
        Err(StoreError::Conflict(_)) => message(StatusCode::CONFLICT, "Error: User/Email already exists"),
        Err(e) => store_failure("register", e),
    }
}

//! HTTP routes over a `NotesDataSource`. Handlers only translate requests
//! and responses; every rule about users, notes and ownership lives in the
//! data source.

pub mod auth;
pub mod middleware;
pub mod notes;
pub mod owners;
pub mod response;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use notes_db::NotesDataSource;

use crate::auth::{AppState, AppStateInner};
use crate::middleware::require_auth;

pub fn router(source: Arc<dyn NotesDataSource>) -> Router {
    let state: AppState = Arc::new(AppStateInner { source });

    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/getOwnerIdForEmail", get(owners::get_owner_id_for_email))
        .route("/getEmailForOwnerId", get(owners::get_email_for_owner_id))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/getNotes", get(notes::get_notes))
        .route("/saveNote", post(notes::save_note))
        .route("/deleteNote", post(notes::delete_note))
        .route("/addOwnerIdToNoteId", post(owners::add_owner_to_note))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Router tests: requests go through the full axum stack (extractors, Basic
/// auth middleware, handlers) against an in-memory document store.
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum_extra::headers::{Authorization, HeaderMapExt};
use http_body_util::BodyExt;
use async_trait::async_trait;
use notes_db::{
    BackendKind, DataSourceConfig, DeleteOutcome, NotesDataSource, StoreError, StoreResult,
    open_data_source,
};
use notes_types::{Note, User};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app(kind: BackendKind) -> (Router, Arc<dyn NotesDataSource>) {
    let source = open_data_source(&DataSourceConfig::in_memory(kind))
        .await
        .unwrap();
    (notes_api::router(source.clone()), source)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, auth: Option<(&str, &str)>, body: Value) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    if let Some((email, password)) = auth {
        req.headers_mut()
            .typed_insert(Authorization::basic(email, password));
    }
    req
}

fn get_request(uri: &str, auth: Option<(&str, &str)>) -> Request<Body> {
    let mut req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    if let Some((email, password)) = auth {
        req.headers_mut()
            .typed_insert(Authorization::basic(email, password));
    }
    req
}

async fn register(app: &Router, email: &str, password: &str) -> StatusCode {
    let (status, _) = send(
        app,
        json_request("POST", "/register", None, json!({ "email": email, "password": password })),
    )
    .await;
    status
}

#[tokio::test]
async fn register_hashes_and_rejects_duplicates() {
    let (app, source) = app(BackendKind::Relational).await;

    assert_eq!(register(&app, "alice@example.com", "pw1").await, StatusCode::CREATED);
    assert_eq!(register(&app, "alice@example.com", "pw1").await, StatusCode::CONFLICT);
    assert_eq!(register(&app, " ", "pw1").await, StatusCode::PRECONDITION_FAILED);

    let stored = source.get_user_by_email("alice@example.com").await.unwrap().unwrap();
    assert_ne!(stored.password, "pw1");
    assert!(notes_crypto::is_hashed(&stored.password));
}

#[tokio::test]
async fn protected_routes_require_valid_credentials() {
    let (app, _) = app(BackendKind::Document).await;
    register(&app, "alice@example.com", "pw1").await;

    let resp = app.clone().oneshot(get_request("/getNotes", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

    let (status, _) = send(&app, get_request("/getNotes", Some(("alice@example.com", "wrong")))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, get_request("/getNotes", Some(("alice@example.com", "pw1")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "0 notes found");
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn legacy_plaintext_account_can_log_in() {
    let (app, source) = app(BackendKind::Relational).await;
    source
        .register_user(User::new("old@example.com", "abc"))
        .await
        .unwrap();

    let (status, _) = send(&app, get_request("/getNotes", Some(("old@example.com", "abc")))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn share_and_delete_flow() {
    for kind in [BackendKind::Document, BackendKind::Relational] {
        let (app, _) = app(kind).await;
        register(&app, "alice@example.com", "pw1").await;
        register(&app, "bob@example.com", "pw2").await;
        let alice = Some(("alice@example.com", "pw1"));
        let bob = Some(("bob@example.com", "pw2"));

        let (_, body) = send(&app, get_request("/getOwnerIdForEmail?email=alice@example.com", None)).await;
        let alice_id = body["data"].as_str().unwrap().to_string();
        let (_, body) = send(&app, get_request("/getOwnerIdForEmail?email=bob@example.com", None)).await;
        let bob_id = body["data"].as_str().unwrap().to_string();

        let (_, body) = send(&app, get_request(&format!("/getEmailForOwnerId?ownerId={bob_id}"), None)).await;
        assert_eq!(body["data"], "bob@example.com", "{kind}");

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/saveNote",
                alice,
                json!({
                    "title": "shopping",
                    "content": "eggs",
                    "date": "today",
                    "owners": [alice_id],
                    "color": "FFA500"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{kind}");
        assert_eq!(body["message"], "Note added");
        let note_id = body["data"]["id"].as_str().unwrap().to_string();

        // Bob cannot share or edit a note he does not own.
        let (status, _) = send(
            &app,
            json_request("POST", "/addOwnerIdToNoteId", bob, json!({ "ownerIdToAdd": bob_id, "noteId": note_id })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{kind}");

        let (status, body) = send(
            &app,
            json_request("POST", "/addOwnerIdToNoteId", alice, json!({ "ownerIdToAdd": bob_id, "noteId": note_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{kind}");
        assert_eq!(body["isSuccessful"], true);
        assert_eq!(body["data"]["owners"], json!([alice_id, bob_id]));

        let (_, body) = send(
            &app,
            json_request("POST", "/addOwnerIdToNoteId", alice, json!({ "ownerIdToAdd": bob_id, "noteId": note_id })),
        )
        .await;
        assert_eq!(body["isSuccessful"], false, "{kind}");
        assert_eq!(body["message"], "bob@example.com is already an owner of this note");

        let (status, body) = send(&app, json_request("POST", "/deleteNote", alice, json!({ "id": note_id }))).await;
        assert_eq!(status, StatusCode::OK, "{kind}");
        assert_eq!(body["message"], "Owner removed from note");
        assert_eq!(body["data"]["owners"], json!([bob_id]));

        let (status, _) = send(&app, json_request("POST", "/deleteNote", alice, json!({ "id": note_id }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{kind}");

        let (status, body) = send(&app, json_request("POST", "/deleteNote", bob, json!({ "id": note_id }))).await;
        assert_eq!(status, StatusCode::OK, "{kind}");
        assert_eq!(body["message"], "Note deleted");
        assert!(body.get("data").is_none());

        let (_, body) = send(&app, get_request("/getNotes", bob)).await;
        assert_eq!(body["data"], json!([]), "{kind}");
    }
}

#[tokio::test]
async fn non_owner_cannot_overwrite_note() {
    let (app, _) = app(BackendKind::Document).await;
    register(&app, "alice@example.com", "pw1").await;
    register(&app, "mallory@example.com", "pw3").await;

    let (_, body) = send(&app, get_request("/getOwnerIdForEmail?email=alice@example.com", None)).await;
    let alice_id = body["data"].as_str().unwrap().to_string();

    let note = json!({
        "id": "n1",
        "title": "secret",
        "content": "x",
        "date": "today",
        "owners": [alice_id],
        "color": "000000"
    });
    let (status, _) = send(&app, json_request("POST", "/saveNote", Some(("alice@example.com", "pw1")), note.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let mut edit = note;
    edit["title"] = json!("defaced");
    let (status, _) = send(&app, json_request("POST", "/saveNote", Some(("mallory@example.com", "pw3")), edit.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, json_request("POST", "/saveNote", Some(("alice@example.com", "pw1")), edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note updated");
    assert_eq!(body["data"]["title"], "defaced");
}

#[tokio::test]
async fn unknown_lookups_are_bad_requests() {
    let (app, _) = app(BackendKind::Relational).await;

    let (status, body) = send(&app, get_request("/getOwnerIdForEmail?email=ghost@example.com", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccessful"], false);

    let (status, _) = send(&app, get_request("/getEmailForOwnerId?ownerId=ghost", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Delegates to a real store but fails every email-by-id lookup.
struct EmailLookupDown(Arc<dyn NotesDataSource>);

#[async_trait]
impl NotesDataSource for EmailLookupDown {
    async fn register_user(&self, user: User) -> StoreResult<User> {
        self.0.register_user(user).await
    }
    async fn user_email_exists(&self, email: &str) -> StoreResult<bool> {
        self.0.user_email_exists(email).await
    }
    async fn user_id_exists(&self, id: &str) -> StoreResult<bool> {
        self.0.user_id_exists(id).await
    }
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.0.get_user_by_email(email).await
    }
    async fn get_email_for_user_id(&self, _user_id: &str) -> StoreResult<Option<String>> {
        Err(StoreError::Transient("lookup unavailable".into()))
    }
    async fn check_password_for_email(&self, email: &str, candidate: &str) -> StoreResult<bool> {
        self.0.check_password_for_email(email, candidate).await
    }
    async fn get_notes_for_user_by_email(&self, email: &str) -> StoreResult<Vec<Note>> {
        self.0.get_notes_for_user_by_email(email).await
    }
    async fn save_note(&self, note: Note) -> StoreResult<Note> {
        self.0.save_note(note).await
    }
    async fn delete_note_for_user(&self, user_id: &str, note_id: &str) -> StoreResult<DeleteOutcome> {
        self.0.delete_note_for_user(user_id, note_id).await
    }
    async fn get_note(&self, note_id: &str) -> StoreResult<Option<Note>> {
        self.0.get_note(note_id).await
    }
    async fn add_owner_to_note(&self, user_id: &str, note_id: &str) -> StoreResult<()> {
        self.0.add_owner_to_note(user_id, note_id).await
    }
    async fn is_owner_of_note(&self, user_id: &str, note_id: &str) -> StoreResult<bool> {
        self.0.is_owner_of_note(user_id, note_id).await
    }
}

#[tokio::test]
async fn add_owner_falls_back_to_id_when_email_lookup_fails() {
    let (_, inner) = app(BackendKind::Relational).await;
    let app = notes_api::router(Arc::new(EmailLookupDown(inner.clone())));
    register(&app, "alice@example.com", "pw1").await;
    register(&app, "bob@example.com", "pw2").await;
    let alice = inner.get_user_by_email("alice@example.com").await.unwrap().unwrap();
    let bob = inner.get_user_by_email("bob@example.com").await.unwrap().unwrap();

    let note = inner
        .save_note(Note::new("shared", "x", vec![alice.id.clone()]))
        .await
        .unwrap();
    let note_id = note.id.unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/addOwnerIdToNoteId",
            Some(("alice@example.com", "pw1")),
            json!({ "ownerIdToAdd": bob.id, "noteId": note_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        format!("Owner added to note, {} can now access this note", bob.id)
    );
    assert!(inner.is_owner_of_note(&bob.id, &note_id).await.unwrap());
}

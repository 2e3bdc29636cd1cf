use serde::{Deserialize, Serialize};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountRequest {
    pub email: String,
    pub password: String,
}

// -- Notes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteNoteRequest {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddOwnerIdToNoteIdRequest {
    pub owner_id_to_add: String,
    pub note_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerIdQuery {
    pub owner_id: String,
}

// -- Responses --

/// Envelope returned by every route. `data` is omitted when there is
/// nothing to attach.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResponse<T = ()> {
    pub is_successful: bool,
    pub status_code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl SimpleResponse<()> {
    pub fn message(is_successful: bool, status_code: u16, message: impl Into<String>) -> Self {
        Self {
            is_successful,
            status_code,
            message: message.into(),
            data: None,
        }
    }
}

impl<T> SimpleResponse<T> {
    pub fn with_data(
        is_successful: bool,
        status_code: u16,
        message: impl Into<String>,
        data: T,
    ) -> Self {
        Self {
            is_successful,
            status_code,
            message: message.into(),
            data: Some(data),
        }
    }
}

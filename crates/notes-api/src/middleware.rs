use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use tracing::{error, warn};

use crate::auth::AppState;

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
}

/// Check HTTP Basic credentials against the data source.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let credentials = req
        .headers()
        .typed_get::<Authorization<Basic>>()
        .ok_or_else(challenge)?;

    let email = credentials.username().to_string();
    let valid = state
        .source
        .check_password_for_email(&email, credentials.password())
        .await
        .map_err(|e| {
            error!("credential check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        })?;

    if !valid {
        warn!("Rejected credentials for {}", email);
        return Err(challenge());
    }

    req.extensions_mut().insert(AuthUser { email });
    Ok(next.run(req).await)
}

fn challenge() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"notes\"")],
    )
        .into_response()
}

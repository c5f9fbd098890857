use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use echo_types::api::{Claims, IdentityResponse};

use crate::AppState;
use crate::error::ApiError;

/// Anonymous identities are long-lived; clients keep the token instead of
/// an account.
const IDENTITY_TTL_DAYS: i64 = 365;

/// Mint a fresh anonymous identity. There is no account behind it; the
/// returned user id is what reactions and replies are attributed to.
pub async fn create_identity(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let user_id = Uuid::new_v4();
    let token = create_token(&state.jwt_secret, user_id)?;

    info!("Issued anonymous identity {}", user_id);
    Ok((StatusCode::CREATED, Json(IdentityResponse { user_id, token })))
}

pub fn create_token(secret: &str, user_id: Uuid) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::days(IDENTITY_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

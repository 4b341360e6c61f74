//! Session route handlers: attach a backend token, sign out.

use axum::{Json, extract::State};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, WithNotices, clear_sentry_user, set_sentry_user};
use crate::middleware::CurrentShop;
use crate::notify::Notice;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub count: u64,
    pub notices: Vec<Notice>,
}

/// Attach the shopper's backend token and load their saved cart.
#[instrument(skip_all, fields(session = %shop.id))]
pub async fn token(
    CurrentShop(shop): CurrentShop,
    Json(body): Json<TokenRequest>,
) -> std::result::Result<Json<TokenResponse>, WithNotices> {
    let token = body.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("token is required".to_string()).with_notices(Vec::new()));
    }

    let count = shop
        .cart
        .authenticate(SecretString::from(token.to_string()))
        .await
        .map_err(|e| AppError::from(e).with_notices(shop.notices.drain()))?;
    set_sentry_user(&shop.id);

    Ok(Json(TokenResponse {
        success: true,
        count,
        notices: shop.notices.drain(),
    }))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// End the shop session and clear the cookie session.
#[instrument(skip_all, fields(session = %shop.id))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    CurrentShop(shop): CurrentShop,
) -> Result<Json<LogoutResponse>> {
    state.sessions().end(shop.id).await;
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("session store: {e}")))?;
    clear_sentry_user();

    Ok(Json(LogoutResponse { success: true }))
}

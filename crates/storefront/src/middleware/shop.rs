//! Extractor resolving the shopper's [`ShopSession`].

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::session_keys;
use crate::session::ShopSession;
use crate::state::AppState;

/// The current shopper's session, created on first use.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentShop(shop): CurrentShop) -> impl IntoResponse {
///     Json(shop.cart.summary().await)
/// }
/// ```
pub struct CurrentShop(pub Arc<ShopSession>);

impl FromRequestParts<AppState> for CurrentShop {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let id: Option<Uuid> = session
            .get(session_keys::SHOP_SESSION_ID)
            .await
            .ok()
            .flatten();

        let shop = state.sessions().get_or_create(id).await;
        if id != Some(shop.id) {
            session
                .insert(session_keys::SHOP_SESSION_ID, shop.id)
                .await
                .map_err(|e| AppError::Internal(format!("session store: {e}")))?;
        }

        tracing::Span::current().record("shop_session", tracing::field::display(shop.id));
        Ok(Self(shop))
    }
}

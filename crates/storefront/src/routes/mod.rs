//! HTTP route handlers for storefront.
//!
//! All bodies are JSON; every response carries `success`.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Health check
//!
//! # Products
//! GET  /products                     - Catalog listing
//! GET  /products/{id}                - Product detail
//! GET  /products/{id}/stock          - Live stock (?size=M)
//! POST /products/{id}/stock-alert    - Back-in-stock email
//!
//! # Cart
//! GET  /cart                         - Summary and pending notices
//! POST /cart/add                     - Add one unit {itemId, size?}
//! POST /cart/update                  - Set quantity {itemId, size?, quantity}
//! GET  /cart/count                   - Badge count
//!
//! # Session
//! POST /session/token                - Attach backend token, load saved cart
//! POST /session/logout               - End the shop session
//!
//! # Filters
//! GET  /filters?categories=a,b       - Applicable filters and panel
//! POST /filters/toggle               - Apply a checkbox/radio change
//! POST /filters/clear                - Reset every filter
//! ```

pub mod cart;
pub mod filters;
pub mod products;
pub mod session;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/stock", get(products::stock))
        .route("/{id}/stock-alert", post(products::stock_alert))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/count", get(cart::count))
}

/// Create the session routes router.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/token", post(session::token))
        .route("/logout", post(session::logout))
}

/// Create the filter routes router.
pub fn filter_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(filters::panel))
        .route("/toggle", post(filters::toggle))
        .route("/clear", post(filters::clear))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/session", session_routes())
        .nest("/filters", filter_routes())
}

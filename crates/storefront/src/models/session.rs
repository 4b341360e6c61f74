//! Session keys.

/// Keys stored in the cookie session.
pub mod keys {
    /// Id of the shopper's entry in the session registry.
    pub const SHOP_SESSION_ID: &str = "shop_session_id";
}

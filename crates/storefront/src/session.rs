//! Shopper sessions.
//!
//! A [`ShopSession`] is the explicit per-shopper context: the cart
//! reconciler plus the notices waiting to be shown. Sessions live in a
//! [`SessionRegistry`] keyed by the id stored in the shopper's cookie; idle
//! sessions are evicted and their background refresh is cancelled on
//! eviction.

use std::sync::Arc;

use moka::future::Cache;
use moka::notification::RemovalCause;
use tracing::debug;
use uuid::Uuid;

use crate::backend::Backends;
use crate::cart::CartReconciler;
use crate::catalog::Catalog;
use crate::config::ShopConfig;
use crate::notify::NoticeBuffer;

/// One shopper's state.
pub struct ShopSession {
    pub id: Uuid,
    pub cart: CartReconciler,
    pub notices: Arc<NoticeBuffer>,
}

impl ShopSession {
    fn new(id: Uuid, shop: &ShopConfig, catalog: Catalog, backends: &Backends) -> Self {
        let notices = Arc::new(NoticeBuffer::default());
        let cart = CartReconciler::new(shop, catalog, backends, notices.clone());
        Self { id, cart, notices }
    }
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Live sessions with idle expiry.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Cache<Uuid, Arc<ShopSession>>,
    shop: ShopConfig,
    catalog: Catalog,
    backends: Backends,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(shop: ShopConfig, catalog: Catalog, backends: Backends) -> Self {
        let sessions = Cache::builder()
            .time_to_idle(shop.session_idle_timeout)
            .eviction_listener(|id: Arc<Uuid>, session: Arc<ShopSession>, cause: RemovalCause| {
                debug!(session = %id, ?cause, "shop session ended");
                session.cart.shutdown();
            })
            .build();

        Self {
            sessions,
            shop,
            catalog,
            backends,
        }
    }

    /// The session for `id`, or a new one under a fresh id when `id` is
    /// unknown or expired.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> Arc<ShopSession> {
        if let Some(session) = self.get(id).await {
            return session;
        }

        let id = Uuid::new_v4();
        let session = Arc::new(ShopSession::new(
            id,
            &self.shop,
            self.catalog.clone(),
            &self.backends,
        ));
        self.sessions.insert(id, Arc::clone(&session)).await;
        debug!(session = %id, "shop session started");
        session
    }

    pub async fn get(&self, id: Option<Uuid>) -> Option<Arc<ShopSession>> {
        match id {
            Some(id) => self.sessions.get(&id).await,
            None => None,
        }
    }

    /// Tear a session down: sign out, stop its refresher, forget it.
    pub async fn end(&self, id: Uuid) {
        if let Some(session) = self.sessions.remove(&id).await {
            session.cart.sign_out().await;
            session.cart.shutdown();
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> u64 {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count()
    }

    /// Tear every session down.
    pub async fn shutdown(&self) {
        for (_, session) in &self.sessions {
            session.cart.shutdown();
        }
        self.sessions.invalidate_all();
        self.sessions.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use threadline_core::{ProductId, Stock};

    use super::*;
    use crate::testing::{FakeBackends, product};

    fn registry() -> SessionRegistry {
        let products = vec![product("tee", 100, Stock::Flat(4))];
        let fakes = FakeBackends::new(products.clone(), Vec::new());
        SessionRegistry::new(ShopConfig::default(), Catalog::new(products), fakes.backends())
    }

    #[tokio::test]
    async fn test_unknown_id_gets_fresh_session() {
        let registry = registry();
        let stale = Uuid::new_v4();

        let session = registry.get_or_create(Some(stale)).await;
        assert_ne!(session.id, stale);

        let again = registry.get_or_create(Some(session.id)).await;
        assert!(Arc::ptr_eq(&session, &again));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_have_separate_carts() {
        let registry = registry();
        let a = registry.get_or_create(None).await;
        let b = registry.get_or_create(None).await;

        a.cart.add(&ProductId::new("tee"), None).await.unwrap();
        assert_eq!(a.cart.cart_count().await, 1);
        assert_eq!(b.cart.cart_count().await, 0);
    }

    #[tokio::test]
    async fn test_end_stops_refresh_and_forgets_session() {
        let registry = registry();
        let session = registry.get_or_create(None).await;
        session.cart.add(&ProductId::new("tee"), None).await.unwrap();
        assert!(session.cart.is_refreshing());

        registry.end(session.id).await;
        assert!(!session.cart.is_refreshing());
        assert!(registry.get(Some(session.id)).await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_stops_every_refresher() {
        let registry = registry();
        let session = registry.get_or_create(None).await;
        session.cart.add(&ProductId::new("tee"), None).await.unwrap();

        registry.shutdown().await;
        assert!(!session.cart.is_refreshing());
    }
}

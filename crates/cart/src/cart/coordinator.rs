//! Sync coordinator: "mutate memory, then persist" for every cart intent.
//!
//! Each intent runs in two steps:
//!
//! 1. The transition is applied to [`CartState`] under a short synchronous
//!    lock. Callers see the change immediately.
//! 2. The matching keyed write goes to the [`CartStore`]. The lock is not
//!    held across this `.await`.
//!
//! Intents on the same id are not serialized against each other. Writes are
//! idempotent upserts keyed by product id, so the store converges, but a
//! write issued before [`SyncCoordinator::clear_and_sync`] can land after it
//! and bring a row back.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use petshop_core::ProductId;

use super::state::{CartSnapshot, CartState};
use crate::error::CartError;
use crate::models::{CartLineItem, NewLineItem};
use crate::store::{CartStore, StoreError};

/// What happens to the in-memory cart when the store write behind an
/// intent fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistencePolicy {
    /// Keep the in-memory change and record the error. The next successful
    /// write for that id brings the store back in line.
    #[default]
    AcceptAndRecord,
    /// Put the affected line back to its value before the intent, unless
    /// another intent has changed it since, and record the error.
    Rollback,
}

impl FromStr for PersistencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accept" | "accept_and_record" => Ok(Self::AcceptAndRecord),
            "rollback" => Ok(Self::Rollback),
            other => Err(format!("expected `accept` or `rollback`, got `{other}`")),
        }
    }
}

/// Which store write an intent turned into.
#[derive(Debug)]
enum StoreWrite {
    Upsert(CartLineItem),
    SetQuantity(CartLineItem),
    Delete,
}

/// Sequences in-memory cart transitions with their durable writes and owns
/// the cart's loading flag and error slot.
pub struct SyncCoordinator {
    state: Mutex<CartState>,
    store: Arc<dyn CartStore>,
    policy: PersistencePolicy,
}

impl SyncCoordinator {
    /// Create a coordinator over an empty cart.
    ///
    /// Call [`Self::load_cart`] before accepting intents; hydration
    /// overwrites whatever is in memory.
    #[must_use]
    pub fn new(store: Arc<dyn CartStore>, policy: PersistencePolicy) -> Self {
        Self {
            state: Mutex::new(CartState::new()),
            store,
            policy,
        }
    }

    // =========================================================================
    // Intents
    // =========================================================================

    /// Add one unit of a product.
    ///
    /// A blank product id is rejected: the error is recorded and the cart is
    /// left untouched.
    #[instrument(skip(self, item), fields(id = %item.id))]
    pub async fn add_item(&self, item: NewLineItem) -> CartSnapshot {
        if item.id.is_blank() {
            let mut state = self.state.lock();
            state.record_error(Arc::new(CartError::Validation(
                "product id cannot be blank".to_string(),
            )));
            return state.snapshot();
        }

        let id = item.id.clone();
        self.apply(&id, true, |state| state.add_item(item)).await
    }

    /// Remove a product's line.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn remove_item(&self, id: &ProductId) -> CartSnapshot {
        self.apply(id, false, |state| state.remove_item(id)).await
    }

    /// Add one unit to an existing line.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn increment_quantity(&self, id: &ProductId) -> CartSnapshot {
        self.apply(id, false, |state| state.increment_quantity(id))
            .await
    }

    /// Take one unit off a line; the last unit removes it.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn decrement_quantity(&self, id: &ProductId) -> CartSnapshot {
        self.apply(id, false, |state| state.decrement_quantity(id))
            .await
    }

    /// Empty the cart in memory and in the store.
    ///
    /// Only call this once the order built from the cart has been accepted.
    /// A failed store clear is recorded but never rolled back.
    #[instrument(skip(self))]
    pub async fn clear_and_sync(&self) -> CartSnapshot {
        self.state.lock().clear();

        if let Err(e) = self.store.delete_all().await {
            self.record_store_error(e);
        } else {
            debug!("Cart cleared");
        }

        self.snapshot()
    }

    /// Hydrate the cart from the store.
    ///
    /// Replaces the in-memory lines unconditionally: anything added while
    /// the read was in flight is lost. On a failed read the lines are left
    /// as they were and the error is recorded.
    #[instrument(skip(self))]
    pub async fn load_cart(&self) -> CartSnapshot {
        self.state.lock().set_loading(true);

        let result = self.store.read_all().await;

        let mut state = self.state.lock();
        match result {
            Ok(items) => {
                info!(count = items.len(), "Cart hydrated from store");
                state.replace_all(items);
            }
            Err(e) => {
                warn!(error = %e, "Failed to hydrate cart");
                state.record_error(Arc::new(CartError::from(e)));
            }
        }
        state.set_loading(false);
        state.snapshot()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current lines, totals, loading flag and error slot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.state.lock().snapshot()
    }

    /// The last recorded error, if not yet cleared.
    #[must_use]
    pub fn error(&self) -> Option<Arc<CartError>> {
        self.state.lock().error()
    }

    /// Empty the error slot. Errors stay put until this is called.
    pub fn clear_error(&self) {
        self.state.lock().clear_error();
    }

    /// The configured failure policy.
    #[must_use]
    pub const fn policy(&self) -> PersistencePolicy {
        self.policy
    }

    /// Whether store writes survive a restart.
    #[must_use]
    pub fn persistence_available(&self) -> bool {
        self.store.capability().is_durable()
    }

    /// Fail unless the cart is backed by durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CapabilityUnavailable`] when the store is inert.
    pub fn require_durable(&self) -> Result<(), CartError> {
        if self.persistence_available() {
            Ok(())
        } else {
            Err(CartError::CapabilityUnavailable)
        }
    }

    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&CartState) -> T) -> T {
        f(&self.state.lock())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Apply `transition`, then write whatever the line for `id` became.
    ///
    /// `is_add` picks an upsert for a surviving line; otherwise the
    /// quantity is updated in place.
    async fn apply(
        &self,
        id: &ProductId,
        is_add: bool,
        transition: impl FnOnce(&mut CartState),
    ) -> CartSnapshot {
        let (prior, written, write) = {
            let mut state = self.state.lock();
            let prior = state.get(id).cloned();
            transition(&mut state);

            let written = state.get(id).cloned();
            let write = match &written {
                Some(line) if prior.as_ref() == Some(line) => None,
                Some(line) if is_add => Some(StoreWrite::Upsert(line.clone())),
                Some(line) => Some(StoreWrite::SetQuantity(line.clone())),
                None if prior.is_some() => Some(StoreWrite::Delete),
                None => None,
            };
            (prior, written, write)
        };

        let Some(write) = write else {
            debug!("Intent changed nothing, skipping store write");
            return self.snapshot();
        };

        if let Err(e) = self.persist(id, write).await {
            if self.policy == PersistencePolicy::Rollback {
                self.roll_back(id, written.as_ref(), prior);
            }
            self.record_store_error(e);
        }

        self.snapshot()
    }

    async fn persist(&self, id: &ProductId, write: StoreWrite) -> Result<(), StoreError> {
        match write {
            StoreWrite::Upsert(line) => self.store.upsert(&line).await,
            StoreWrite::SetQuantity(line) => {
                // A row missing here means an earlier write failed; write it whole.
                if self.store.update_quantity(&line.id, line.quantity).await? {
                    Ok(())
                } else {
                    self.store.upsert(&line).await
                }
            }
            StoreWrite::Delete => self.store.delete(id).await,
        }
    }

    /// Put the line back to `prior`, but only while it still holds what the
    /// failed write carried. A later intent on the same id owns the line
    /// once it has moved on, and its own write keeps the store in step.
    fn roll_back(
        &self,
        id: &ProductId,
        written: Option<&CartLineItem>,
        prior: Option<CartLineItem>,
    ) {
        let mut state = self.state.lock();
        if state.get(id) == written {
            debug!("Rolling back cart line after failed write");
            state.restore(id, prior);
        } else {
            debug!("Cart line changed since the failed write, leaving it");
        }
    }

    fn record_store_error(&self, error: StoreError) {
        warn!(error = %error, policy = ?self.policy, "Cart store write failed");
        self.state
            .lock()
            .record_error(Arc::new(CartError::from(error)));
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("state", &*self.state.lock())
            .field("capability", &self.store.capability())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use petshop_core::StoreCapability;

    use super::*;
    use crate::store::{NullCartStore, SqliteCartStore};

    fn product(id: &str, price: &str) -> NewLineItem {
        NewLineItem {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: price.parse().unwrap(),
            image_url: None,
        }
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id)
    }

    fn sorted_ids(items: &[CartLineItem]) -> Vec<(String, u32)> {
        let mut ids: Vec<(String, u32)> = items
            .iter()
            .map(|i| (i.id.to_string(), i.quantity))
            .collect();
        ids.sort();
        ids
    }

    /// Wraps a real store and fails every write while `failing` is set.
    struct FlakyStore {
        inner: SqliteCartStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        async fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: SqliteCartStore::connect("sqlite::memory:").await.unwrap(),
                failing: AtomicBool::new(false),
            })
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::DataCorruption("disk full".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CartStore for FlakyStore {
        fn capability(&self) -> StoreCapability {
            StoreCapability::Durable
        }

        async fn upsert(&self, item: &CartLineItem) -> Result<(), StoreError> {
            self.check()?;
            self.inner.upsert(item).await
        }

        async fn update_quantity(&self, id: &ProductId, quantity: u32) -> Result<bool, StoreError> {
            self.check()?;
            self.inner.update_quantity(id, quantity).await
        }

        async fn delete(&self, id: &ProductId) -> Result<(), StoreError> {
            self.check()?;
            self.inner.delete(id).await
        }

        async fn delete_all(&self) -> Result<(), StoreError> {
            self.check()?;
            self.inner.delete_all().await
        }

        async fn read_all(&self) -> Result<Vec<CartLineItem>, StoreError> {
            self.check()?;
            self.inner.read_all().await
        }
    }

    async fn sqlite_coordinator() -> (SyncCoordinator, Arc<SqliteCartStore>) {
        let store = Arc::new(SqliteCartStore::connect("sqlite::memory:").await.unwrap());
        let coordinator = SyncCoordinator::new(store.clone(), PersistencePolicy::default());
        (coordinator, store)
    }

    #[tokio::test]
    async fn test_intents_mirror_into_store() {
        let (cart, store) = sqlite_coordinator().await;

        cart.add_item(product("a", "10.00")).await;
        cart.add_item(product("b", "25.50")).await;
        let snapshot = cart.increment_quantity(&pid("a")).await;

        assert_eq!(snapshot.total_item_count, 3);
        assert_eq!(snapshot.total_amount, Decimal::new(4550, 2));
        assert_eq!(
            sorted_ids(&store.read_all().await.unwrap()),
            sorted_ids(&snapshot.items)
        );

        cart.decrement_quantity(&pid("a")).await;
        cart.decrement_quantity(&pid("a")).await;
        let snapshot = cart.remove_item(&pid("b")).await;
        assert!(snapshot.is_empty());
        assert!(store.read_all().await.unwrap().is_empty());
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_load_cart_round_trip() {
        let (cart, store) = sqlite_coordinator().await;
        cart.add_item(product("a", "10.00")).await;
        cart.add_item(product("b", "2.00")).await;
        cart.add_item(product("b", "2.00")).await;

        let fresh = SyncCoordinator::new(store, PersistencePolicy::default());
        let snapshot = fresh.load_cart().await;

        assert!(!snapshot.is_loading);
        assert_eq!(
            sorted_ids(&snapshot.items),
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_load_cart_overwrites_memory() {
        let (cart, _store) = sqlite_coordinator().await;
        cart.add_item(product("persisted", "1.00")).await;

        // Simulate an item that only ever reached memory.
        cart.state.lock().add_item(product("memory-only", "1.00"));
        let snapshot = cart.load_cart().await;

        assert!(snapshot.get(&pid("memory-only")).is_none());
        assert!(snapshot.get(&pid("persisted")).is_some());
    }

    #[tokio::test]
    async fn test_clear_and_sync_empties_both_layers() {
        let (cart, store) = sqlite_coordinator().await;
        cart.add_item(product("a", "1.00")).await;
        cart.add_item(product("b", "1.00")).await;

        let snapshot = cart.clear_and_sync().await;
        assert!(snapshot.is_empty());
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_id_is_rejected() {
        let (cart, store) = sqlite_coordinator().await;
        let snapshot = cart.add_item(product("  ", "1.00")).await;

        assert!(snapshot.is_empty());
        assert!(matches!(
            snapshot.error.as_deref(),
            Some(CartError::Validation(_))
        ));
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_policy_keeps_memory_and_records_error() {
        let store = FlakyStore::new().await;
        let cart = SyncCoordinator::new(store.clone(), PersistencePolicy::AcceptAndRecord);

        store.set_failing(true);
        let snapshot = cart.add_item(product("a", "3.00")).await;
        assert_eq!(snapshot.get(&pid("a")).unwrap().quantity, 1);
        assert!(snapshot.error.as_deref().unwrap().is_persistence());

        // Later intents still go through, and the error stays until cleared.
        store.set_failing(false);
        let snapshot = cart.increment_quantity(&pid("a")).await;
        assert_eq!(snapshot.get(&pid("a")).unwrap().quantity, 2);
        assert!(snapshot.error.is_some());

        // The missing row was written whole by the follow-up intent.
        let persisted = store.inner.read_all().await.unwrap();
        assert_eq!(sorted_ids(&persisted), vec![("a".to_string(), 2)]);

        cart.clear_error();
        assert!(cart.error().is_none());
    }

    #[tokio::test]
    async fn test_rollback_policy_restores_prior_line() {
        let store = FlakyStore::new().await;
        let cart = SyncCoordinator::new(store.clone(), PersistencePolicy::Rollback);
        cart.add_item(product("a", "3.00")).await;

        store.set_failing(true);
        let snapshot = cart.increment_quantity(&pid("a")).await;
        assert_eq!(snapshot.get(&pid("a")).unwrap().quantity, 1);
        assert!(snapshot.error.is_some());

        let snapshot = cart.remove_item(&pid("a")).await;
        assert_eq!(snapshot.get(&pid("a")).unwrap().quantity, 1);

        let snapshot = cart.add_item(product("b", "1.00")).await;
        assert!(snapshot.get(&pid("b")).is_none());
    }

    /// Holds the next quantity write for a while, then fails it. Every other
    /// call goes straight through.
    struct SlowFailStore {
        inner: SqliteCartStore,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl CartStore for SlowFailStore {
        fn capability(&self) -> StoreCapability {
            StoreCapability::Durable
        }

        async fn upsert(&self, item: &CartLineItem) -> Result<(), StoreError> {
            self.inner.upsert(item).await
        }

        async fn update_quantity(&self, id: &ProductId, quantity: u32) -> Result<bool, StoreError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(100)).await;
                return Err(StoreError::DataCorruption("write timed out".to_string()));
            }
            self.inner.update_quantity(id, quantity).await
        }

        async fn delete(&self, id: &ProductId) -> Result<(), StoreError> {
            self.inner.delete(id).await
        }

        async fn delete_all(&self) -> Result<(), StoreError> {
            self.inner.delete_all().await
        }

        async fn read_all(&self) -> Result<Vec<CartLineItem>, StoreError> {
            self.inner.read_all().await
        }
    }

    #[tokio::test]
    async fn test_rollback_keeps_line_changed_by_later_intent() {
        let store = Arc::new(SlowFailStore {
            inner: SqliteCartStore::connect("sqlite::memory:").await.unwrap(),
            fail_next: AtomicBool::new(false),
        });
        let cart = Arc::new(SyncCoordinator::new(store.clone(), PersistencePolicy::Rollback));
        cart.add_item(product("a", "1.00")).await;

        store.fail_next.store(true, Ordering::SeqCst);
        let slow = {
            let cart = Arc::clone(&cart);
            tokio::spawn(async move { cart.increment_quantity(&pid("a")).await })
        };
        // Let the first intent reach its stalled write.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let snapshot = cart.increment_quantity(&pid("a")).await;
        assert_eq!(snapshot.get(&pid("a")).unwrap().quantity, 3);

        let snapshot = slow.await.unwrap();
        assert!(snapshot.error.as_deref().unwrap().is_persistence());

        let in_memory = snapshot.get(&pid("a")).unwrap().quantity;
        let stored = store.inner.read_all().await.unwrap()[0].quantity;
        assert_eq!(in_memory, 3);
        assert_eq!(in_memory, stored);
    }

    #[tokio::test]
    async fn test_failed_clear_is_recorded_not_rolled_back() {
        for policy in [PersistencePolicy::AcceptAndRecord, PersistencePolicy::Rollback] {
            let store = FlakyStore::new().await;
            let cart = SyncCoordinator::new(store.clone(), policy);
            cart.add_item(product("a", "1.00")).await;
            cart.add_item(product("b", "2.00")).await;

            store.set_failing(true);
            let snapshot = cart.clear_and_sync().await;

            assert!(snapshot.is_empty(), "{policy:?}");
            assert!(snapshot.error.as_deref().unwrap().is_persistence());
            assert_eq!(store.inner.read_all().await.unwrap().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_failed_load_keeps_lines() {
        let store = FlakyStore::new().await;
        let cart = SyncCoordinator::new(store.clone(), PersistencePolicy::default());
        cart.add_item(product("a", "3.00")).await;

        store.set_failing(true);
        let snapshot = cart.load_cart().await;
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.items.len(), 1);
        assert!(snapshot.error.is_some());
    }

    #[tokio::test]
    async fn test_null_store_runs_memory_only() {
        let cart = SyncCoordinator::new(Arc::new(NullCartStore), PersistencePolicy::Rollback);
        assert!(!cart.persistence_available());
        assert!(matches!(
            cart.require_durable(),
            Err(CartError::CapabilityUnavailable)
        ));

        let snapshot = cart.add_item(product("a", "1.00")).await;
        assert_eq!(snapshot.total_item_count, 1);
        assert!(snapshot.error.is_none());

        // Hydrating from an inert store yields an empty cart.
        assert!(cart.load_cart().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_intents_converge() {
        let (cart, store) = sqlite_coordinator().await;
        let cart = Arc::new(cart);
        cart.add_item(product("a", "1.00")).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cart = Arc::clone(&cart);
            handles.push(tokio::spawn(async move {
                cart.increment_quantity(&pid("a")).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cart.snapshot().get(&pid("a")).unwrap().quantity, 9);
        // A final write pins the store to the in-memory value.
        cart.increment_quantity(&pid("a")).await;
        assert_eq!(store.read_all().await.unwrap()[0].quantity, 10);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "accept".parse::<PersistencePolicy>().unwrap(),
            PersistencePolicy::AcceptAndRecord
        );
        assert_eq!(
            "Rollback".parse::<PersistencePolicy>().unwrap(),
            PersistencePolicy::Rollback
        );
        assert!("retry".parse::<PersistencePolicy>().is_err());
    }
}

//! Shared handles every widget mounts against.

#[cfg(test)]
#[path = "tests/context.rs"]
mod tests;

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::BTreeMap;
use std::sync::Arc;

use storefront_client::CartApi;
use storefront_primitives::cart::{Cart, LineKey, LineRef, VariantId};
use storefront_primitives::events::{Affected, CartErrorEvent, EventSource, WidgetId};
use storefront_primitives::requests::{AddItem, UpdateRequest};
use tracing::{debug, warn};

use crate::bus::CartEventBus;
use crate::cache::CartSnapshotCache;
use crate::error::CartError;
use crate::settings::CartSettings;

/// The API client, snapshot cache, event bus and settings of one storefront.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct CartContext {
    api: Arc<dyn CartApi>,
    cache: CartSnapshotCache,
    bus: CartEventBus,
    settings: CartSettings,
    next_widget: Arc<AtomicU64>,
}

impl fmt::Debug for CartContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartContext")
            .field("cache", &self.cache)
            .field("bus", &self.bus)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CartContext {
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>, settings: CartSettings) -> Self {
        Self {
            cache: CartSnapshotCache::new(Arc::clone(&api)),
            bus: CartEventBus::new(settings.bus_capacity),
            api,
            settings,
            next_widget: Arc::default(),
        }
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn CartApi> {
        &self.api
    }

    #[must_use]
    pub const fn cache(&self) -> &CartSnapshotCache {
        &self.cache
    }

    #[must_use]
    pub const fn bus(&self) -> &CartEventBus {
        &self.bus
    }

    #[must_use]
    pub const fn settings(&self) -> CartSettings {
        self.settings
    }

    pub(crate) fn next_widget_id(&self) -> WidgetId {
        WidgetId::new(self.next_widget.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Stores an authoritative snapshot and tells everyone about it.
    pub fn commit(&self, cart: Cart, source: EventSource, affected: Affected) -> Arc<Cart> {
        let cart = Arc::new(cart);

        self.cache.set(Arc::clone(&cart));
        let _delivered = self
            .bus
            .publish_changed(Arc::clone(&cart), source, affected);

        cart
    }

    /// Publishes `err` on the error channel unless it is one that never surfaces.
    pub fn report(&self, source: EventSource, variant_id: Option<VariantId>, err: &CartError) {
        let Some(kind) = err.kind() else {
            return;
        };

        let _delivered = self.bus.publish_error(CartErrorEvent {
            source,
            variant_id,
            kind,
            message: err.to_string(),
        });
    }

    /// Re-reads the cart and broadcasts it to every widget.
    pub async fn refresh(&self) -> Result<Arc<Cart>, CartError> {
        match self.cache.refresh().await {
            Ok(cart) => {
                let _delivered = self.bus.publish_changed(
                    Arc::clone(&cart),
                    EventSource::Refresh,
                    Affected::Everything,
                );
                Ok(cart)
            }
            Err(err) => {
                let err = CartError::from(err);
                self.report(EventSource::Refresh, None, &err);
                Err(err)
            }
        }
    }

    /// Adds one unit of `variant_id` from outside any quantity widget.
    pub async fn add_one(&self, variant_id: VariantId) -> Result<Arc<Cart>, CartError> {
        self.add(variant_id, 1).await
    }

    /// Adds `quantity` units of `variant_id` on top of what the cart holds.
    pub async fn add(&self, variant_id: VariantId, quantity: u32) -> Result<Arc<Cart>, CartError> {
        debug!(%variant_id, quantity, "Quick add");

        let result = self
            .api
            .add(&[AddItem {
                id: variant_id,
                quantity,
            }])
            .await;

        match result {
            Ok(cart) => {
                let affected = lines_affected(&cart, vec![variant_id]);
                Ok(self.commit(cart, EventSource::QuickAdd, affected))
            }
            Err(err) => {
                let err = CartError::from(err);
                warn!(%variant_id, %err, "Quick add failed");
                self.report(EventSource::QuickAdd, Some(variant_id), &err);
                Err(err)
            }
        }
    }

    /// Sets absolute quantities for several variants in one request.
    pub async fn update_quantities(
        &self,
        updates: BTreeMap<VariantId, u32>,
    ) -> Result<Arc<Cart>, CartError> {
        if updates.is_empty() {
            return self.cache.get().await.map_err(CartError::from);
        }

        let request = UpdateRequest::quantities(updates);
        let variant_ids = request.variants();

        debug!(count = variant_ids.len(), "Bulk quantity update");

        match self.api.update(&request).await {
            Ok(cart) => {
                let affected = lines_affected(&cart, variant_ids);
                Ok(self.commit(cart, EventSource::BulkUpdate, affected))
            }
            Err(err) => {
                let err = CartError::from(err);
                warn!(%err, "Bulk quantity update failed");
                self.report(EventSource::BulkUpdate, None, &err);
                Err(err)
            }
        }
    }

    /// Changes a line addressed by its server key.
    ///
    /// The key has to exist in the last known snapshot; a stale key is
    /// reported without contacting the server.
    pub async fn change_line(&self, key: LineKey, quantity: u32) -> Result<Arc<Cart>, CartError> {
        let snapshot = self.cache.get().await?;

        let Some(line) = snapshot.line_by_key(&key) else {
            let err = CartError::MissingLineReference {
                line: LineRef::Key(key),
            };
            self.report(EventSource::BulkUpdate, None, &err);
            return Err(err);
        };
        let variant_id = line.variant_id;

        match self.api.change(&LineRef::Key(key), quantity).await {
            Ok(cart) => {
                let affected = lines_affected(&snapshot, vec![variant_id]);
                Ok(self.commit(cart, EventSource::BulkUpdate, affected))
            }
            Err(err) => {
                let err = CartError::from(err);
                warn!(%variant_id, %err, "Line change failed");
                self.report(EventSource::BulkUpdate, Some(variant_id), &err);
                Err(err)
            }
        }
    }
}

fn lines_affected(cart: &Cart, variant_ids: Vec<VariantId>) -> Affected {
    let mut product_ids: Vec<_> = cart.products_of(&variant_ids).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    Affected::Lines {
        variant_ids,
        product_ids,
    }
}

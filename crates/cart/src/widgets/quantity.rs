use storefront_primitives::events::CartEvent;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::bus::Subscription;
use crate::cache::CartSnapshotCache;
use crate::context::CartContext;
use crate::coordinator::{MutationHandle, RequestCoordinator, WidgetConfig};
use crate::error::CartError;
use crate::optimistic::WidgetView;

/// A quantity stepper (or bulk-add row) bound to one variant.
#[derive(Debug)]
pub struct QuantityControl {
    coordinator: RequestCoordinator,
    listener: JoinHandle<()>,
}

impl QuantityControl {
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn mount(ctx: &CartContext, config: WidgetConfig) -> Self {
        let coordinator = RequestCoordinator::new(ctx.clone(), config);
        let subscription = ctx.bus().subscribe(coordinator.interest());

        debug!(widget = %coordinator.id(), variant_id = %config.variant_id, "Mounted quantity control");

        let listener = tokio::spawn(listen(
            ctx.cache().clone(),
            coordinator.clone(),
            subscription,
        ));

        Self {
            coordinator,
            listener,
        }
    }

    #[must_use]
    pub const fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    pub fn increment(&self) -> Result<MutationHandle, CartError> {
        self.coordinator.increment()
    }

    pub fn decrement(&self) -> Result<MutationHandle, CartError> {
        self.coordinator.decrement()
    }

    pub fn set_quantity(&self, quantity: u32) -> Result<MutationHandle, CartError> {
        self.coordinator.set_quantity(quantity)
    }

    #[must_use]
    pub fn view(&self) -> WidgetView {
        self.coordinator.view()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WidgetView> {
        self.coordinator.watch()
    }

    /// Unsubscribes and cancels whatever mutation is still pending.
    pub async fn teardown(mut self) {
        self.listener.abort();
        let _ignored = (&mut self.listener).await;

        self.coordinator.cancel_pending();

        debug!(widget = %self.coordinator.id(), "Quantity control torn down");
    }
}

impl Drop for QuantityControl {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(
    cache: CartSnapshotCache,
    coordinator: RequestCoordinator,
    mut subscription: Subscription,
) {
    match cache.get().await {
        Ok(cart) => coordinator.observe(&cart),
        Err(err) => debug!(widget = %coordinator.id(), %err, "Initial cart read failed"),
    }

    while let Some(event) = subscription.recv().await {
        if let CartEvent::Changed(changed) = event {
            trace!(widget = %coordinator.id(), source = ?changed.source, "Re-deriving from broadcast");
            coordinator.observe(&changed.cart);
        }
    }
}

use storefront_primitives::events::CartEvent;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::bus::{Interest, Subscription};
use crate::cache::CartSnapshotCache;
use crate::context::CartContext;

/// Renders the cart's `item_count`.
///
/// Reads the snapshot once on mount, then only ever takes the count from
/// broadcast payloads.
#[derive(Debug)]
pub struct CartCountBadge {
    count: watch::Receiver<u32>,
    listener: JoinHandle<()>,
}

impl CartCountBadge {
    #[must_use]
    pub fn mount(ctx: &CartContext) -> Self {
        let initial = ctx.cache().peek().map_or(0, |cart| cart.item_count);
        let (sender, count) = watch::channel(initial);
        let subscription = ctx.bus().subscribe(Interest::All);

        let listener = tokio::spawn(listen(ctx.cache().clone(), sender, subscription));

        Self { count, listener }
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        *self.count.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.count.clone()
    }

    pub async fn teardown(mut self) {
        self.listener.abort();
        let _ignored = (&mut self.listener).await;
    }
}

impl Drop for CartCountBadge {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(cache: CartSnapshotCache, sender: watch::Sender<u32>, mut subscription: Subscription) {
    match cache.get().await {
        Ok(cart) => {
            let _previous = sender.send_replace(cart.item_count);
        }
        Err(err) => debug!(%err, "Initial cart read failed"),
    }

    while let Some(event) = subscription.recv().await {
        if let CartEvent::Changed(changed) = event {
            let _previous = sender.send_replace(changed.item_count);
        }
    }
}

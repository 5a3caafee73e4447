//! Publish/subscribe fan-out of cart notifications.
//!
//! Every broadcast carries the complete new snapshot, so a subscriber that
//! lags behind and misses events loses nothing: the next event it sees is
//! authoritative on its own.

#[cfg(test)]
#[path = "tests/bus.rs"]
mod tests;

use std::sync::Arc;

use async_stream::stream;
use futures_util::Stream;
use storefront_primitives::cart::{Cart, ProductId, VariantId};
use storefront_primitives::events::{
    Affected, CartChanged, CartErrorEvent, CartEvent, EventSource,
};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::settings::MAX_BUS_CAPACITY;
use tracing::{debug, trace};

/// What a subscriber wants to hear about.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Interest {
    All,
    Variant(VariantId),
    Product(ProductId),
}

impl Interest {
    #[must_use]
    pub fn matches(&self, event: &CartEvent) -> bool {
        match (self, event) {
            (Self::All, _) => true,
            (Self::Variant(variant_id), CartEvent::Changed(changed)) => {
                changed.affected.touches_variant(*variant_id)
            }
            (Self::Product(product_id), CartEvent::Changed(changed)) => {
                changed.affected.touches_product(*product_id)
            }
            (Self::Variant(variant_id), CartEvent::Error(error)) => {
                error.variant_id == Some(*variant_id)
            }
            (Self::Product(_), CartEvent::Error(_)) => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CartEventBus {
    sender: broadcast::Sender<CartEvent>,
}

impl CartEventBus {
    /// Buffers `capacity` events per subscriber, clamped to
    /// `1..=MAX_BUS_CAPACITY`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.clamp(1, MAX_BUS_CAPACITY));

        Self { sender }
    }

    /// Delivers `event` to every live subscription; returns how many.
    pub fn publish(&self, event: CartEvent) -> usize {
        // nobody listening is not an error
        self.sender.send(event).unwrap_or_else(|_| {
            trace!("Cart event dropped, no subscribers");
            0
        })
    }

    pub fn publish_changed(
        &self,
        cart: Arc<Cart>,
        source: EventSource,
        affected: Affected,
    ) -> usize {
        debug!(
            ?source,
            item_count = cart.item_count,
            "Broadcasting cart change"
        );

        self.publish(CartEvent::Changed(CartChanged::new(cart, source, affected)))
    }

    pub fn publish_error(&self, error: CartErrorEvent) -> usize {
        debug!(source = ?error.source, kind = ?error.kind, "Broadcasting cart error");

        self.publish(CartEvent::Error(error))
    }

    /// Registers a subscription; dropping it unsubscribes.
    #[must_use]
    pub fn subscribe(&self, interest: Interest) -> Subscription {
        Subscription {
            interest,
            receiver: self.sender.subscribe(),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Debug)]
pub struct Subscription {
    interest: Interest,
    receiver: broadcast::Receiver<CartEvent>,
}

impl Subscription {
    #[must_use]
    pub const fn interest(&self) -> Interest {
        self.interest
    }

    /// Next event this subscription is interested in, `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<CartEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.interest.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Closed) => return None,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Subscriber lagged behind cart events");
                }
            }
        }
    }

    /// Like [`Self::recv`] but without waiting.
    pub fn try_recv(&mut self) -> Option<CartEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.interest.matches(&event) => return Some(event),
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(mut self) -> impl Stream<Item = CartEvent> {
        stream! {
            while let Some(event) = self.recv().await {
                yield event;
            }
        }
    }

    pub fn unsubscribe(self) {
        trace!(interest = ?self.interest, "Unsubscribing from cart events");
    }
}

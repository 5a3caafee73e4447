//! Tentative display state of a single line widget.
//!
//! The updater tracks two quantities: the last one the server confirmed and
//! the one currently displayed. Optimistic changes only move the displayed
//! value; server responses overwrite both. Renders go out through a
//! [`watch`] channel so whatever draws the widget always sees the latest view.

#[cfg(test)]
#[path = "tests/optimistic.rs"]
mod tests;

use parking_lot::Mutex;
use storefront_primitives::cart::{Cart, LineKey, VariantId};
use storefront_primitives::events::ErrorKind;
use tokio::sync::watch;
use tracing::trace;

use crate::error::CartError;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WidgetError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Everything a renderer needs to draw a line widget.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WidgetView {
    pub quantity: u32,
    /// The variant has a line in the last confirmed snapshot.
    pub in_cart: bool,
    pub visible: bool,
    /// A request is in flight; affordances are disabled.
    pub busy: bool,
    pub can_increment: bool,
    pub can_decrement: bool,
    pub error: Option<WidgetError>,
}

#[derive(Debug)]
struct Tracked {
    confirmed: u32,
    displayed: u32,
    line_key: Option<LineKey>,
    busy: bool,
    error: Option<WidgetError>,
}

#[derive(Debug)]
pub struct OptimisticUpdater {
    variant_id: VariantId,
    max: Option<u32>,
    hide_when_empty: bool,
    tracked: Mutex<Tracked>,
    view: watch::Sender<WidgetView>,
}

impl OptimisticUpdater {
    #[must_use]
    pub fn new(
        variant_id: VariantId,
        initial_quantity: u32,
        max: Option<u32>,
        hide_when_empty: bool,
    ) -> Self {
        let tracked = Tracked {
            confirmed: initial_quantity,
            displayed: initial_quantity,
            line_key: None,
            busy: false,
            error: None,
        };

        let (view, _) = watch::channel(WidgetView::default());

        let updater = Self {
            variant_id,
            max,
            hide_when_empty,
            tracked: Mutex::new(tracked),
            view,
        };

        updater.render(&updater.tracked.lock());

        updater
    }

    #[must_use]
    pub const fn variant_id(&self) -> VariantId {
        self.variant_id
    }

    /// Moves the displayed quantity by `delta`, clamped at zero.
    pub fn apply_optimistic(&self, delta: i64) -> u32 {
        let mut tracked = self.tracked.lock();

        let next = i64::from(tracked.displayed).saturating_add(delta).max(0);
        tracked.displayed = u32::try_from(next).unwrap_or(u32::MAX);
        tracked.error = None;

        trace!(variant_id = %self.variant_id, delta, displayed = tracked.displayed, "Optimistic update");

        self.render(&tracked);

        tracked.displayed
    }

    /// Overwrites the optimistic value with the authoritative one.
    pub fn reconcile(&self, server_quantity: u32) {
        let mut tracked = self.tracked.lock();

        tracked.confirmed = server_quantity;
        tracked.displayed = server_quantity;
        tracked.busy = false;

        self.render(&tracked);
    }

    /// Reconciles against a mutation response and returns the new quantity.
    ///
    /// A variant absent from `cart` drops the tracked line key: keys of removed
    /// lines are never reused.
    pub fn reconcile_with(&self, cart: &Cart) -> u32 {
        let mut tracked = self.tracked.lock();

        Self::absorb(&mut tracked, cart, self.variant_id);
        tracked.displayed = tracked.confirmed;
        tracked.busy = false;
        tracked.error = None;

        self.render(&tracked);

        tracked.confirmed
    }

    /// Takes in a snapshot produced elsewhere. While `pending`, the displayed
    /// optimistic value is left alone and only the confirmed state moves.
    pub fn observe(&self, cart: &Cart, pending: bool) {
        let mut tracked = self.tracked.lock();

        Self::absorb(&mut tracked, cart, self.variant_id);

        if !pending {
            tracked.displayed = tracked.confirmed;
        }

        self.render(&tracked);
    }

    /// Reverts to the last known-good quantity and surfaces `error`.
    pub fn rollback(&self, error: &CartError) {
        let mut tracked = self.tracked.lock();

        tracked.displayed = tracked.confirmed;
        tracked.busy = false;
        tracked.error = error.kind().map(|kind| WidgetError {
            kind,
            message: error.to_string(),
        });

        self.render(&tracked);
    }

    pub fn set_busy(&self, busy: bool) {
        let mut tracked = self.tracked.lock();

        tracked.busy = busy;

        self.render(&tracked);
    }

    #[must_use]
    pub fn displayed(&self) -> u32 {
        self.tracked.lock().displayed
    }

    #[must_use]
    pub fn confirmed(&self) -> u32 {
        self.tracked.lock().confirmed
    }

    #[must_use]
    pub fn line_key(&self) -> Option<LineKey> {
        self.tracked.lock().line_key.clone()
    }

    #[must_use]
    pub fn view(&self) -> WidgetView {
        self.view.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WidgetView> {
        self.view.subscribe()
    }

    fn absorb(tracked: &mut Tracked, cart: &Cart, variant_id: VariantId) {
        match cart.line_for_variant(variant_id) {
            Some(line) => {
                tracked.confirmed = line.quantity;
                tracked.line_key = Some(line.key.clone());
            }
            None => {
                tracked.confirmed = 0;
                tracked.line_key = None;
            }
        }
    }

    fn render(&self, tracked: &Tracked) {
        let quantity = tracked.displayed;
        let below_max = self.max.map_or(true, |max| quantity < max);

        let view = WidgetView {
            quantity,
            in_cart: tracked.line_key.is_some(),
            visible: !self.hide_when_empty || quantity > 0,
            busy: tracked.busy,
            can_increment: !tracked.busy && below_max,
            can_decrement: !tracked.busy && quantity > 0,
            error: tracked.error.clone(),
        };

        let _previous = self.view.send_replace(view);
    }
}

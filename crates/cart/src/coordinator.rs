//! Per-widget mutation sequencing.
//!
//! A coordinator owns at most one [`PendingMutation`]. Submitting a new
//! operation cancels the pending one before any new network I/O: a request
//! still in its debounce window is simply dropped, a request on the wire is
//! aborted, and a response that arrives for a cancelled request is discarded
//! without touching any state.
//!
//! Requests for the same widget are therefore never concurrent. Requests from
//! different widgets on the same line are not ordered against each other; the
//! snapshot cache and the broadcast carry whatever the server applied last.

#[cfg(test)]
#[path = "tests/coordinator.rs"]
mod tests;

use core::fmt;
use core::time::Duration;
use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use storefront_client::ClientError;
use storefront_primitives::cart::{Cart, LineRef, ProductId, VariantId};
use storefront_primitives::events::{Affected, CartErrorEvent, EventSource, WidgetId};
use storefront_primitives::requests::{AddItem, UpdateRequest};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::bus::Interest;
use crate::context::CartContext;
use crate::error::CartError;
use crate::optimistic::{OptimisticUpdater, WidgetView};
use crate::settings::InFlightPolicy;

/// A user-level request against one line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Increment,
    Decrement,
    SetQuantity(u32),
}

impl Operation {
    #[must_use]
    pub const fn target(self, current: u32) -> u32 {
        match self {
            Self::Increment => current.saturating_add(1),
            Self::Decrement => current.saturating_sub(1),
            Self::SetQuantity(quantity) => quantity,
        }
    }
}

/// How a widget addresses its line in `cart-change`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LineIdentifierStrategy {
    /// Use the server-assigned line key once one has been observed.
    #[default]
    PreferKey,
    /// Always address the line by variant id.
    VariantOnly,
}

/// Per-widget configuration of the reconciliation core.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WidgetConfig {
    pub variant_id: VariantId,
    pub product_id: Option<ProductId>,
    pub initial_quantity: u32,
    pub strategy: LineIdentifierStrategy,
    pub max: Option<u32>,
    pub hide_when_empty: bool,
    pub debounce: Option<Duration>,
    pub in_flight: Option<InFlightPolicy>,
}

impl WidgetConfig {
    #[must_use]
    pub const fn new(variant_id: VariantId) -> Self {
        Self {
            variant_id,
            product_id: None,
            initial_quantity: 0,
            strategy: LineIdentifierStrategy::PreferKey,
            max: None,
            hide_when_empty: true,
            debounce: None,
            in_flight: None,
        }
    }

    /// A bulk-add row: variant addressed, bounded, visible at zero.
    #[must_use]
    pub const fn bulk_row(variant_id: VariantId, max: Option<u32>) -> Self {
        Self {
            strategy: LineIdentifierStrategy::VariantOnly,
            max,
            hide_when_empty: false,
            ..Self::new(variant_id)
        }
    }

    #[must_use]
    pub const fn with_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    #[must_use]
    pub const fn with_initial_quantity(mut self, quantity: u32) -> Self {
        self.initial_quantity = quantity;
        self
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: LineIdentifierStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub const fn with_max(mut self, max: u32) -> Self {
        self.max = Some(max);
        self
    }

    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = Some(debounce);
        self
    }

    #[must_use]
    pub const fn with_in_flight(mut self, policy: InFlightPolicy) -> Self {
        self.in_flight = Some(policy);
        self
    }
}

/// How a submitted mutation ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome<T = u32> {
    /// The server applied it; carries the authoritative result.
    Applied(T),
    /// Nothing needed sending.
    Unchanged(T),
    /// Dropped by [`InFlightPolicy::Ignore`].
    Ignored,
    /// Cancelled by a newer submission; its response, if any, was discarded.
    Superseded,
    Failed(CartError),
}

/// Awaitable result of a submission.
#[derive(Debug)]
pub struct MutationHandle<T = u32> {
    task: Option<JoinHandle<Outcome<T>>>,
    ready: Option<Outcome<T>>,
}

impl<T> MutationHandle<T> {
    pub(crate) const fn ready(outcome: Outcome<T>) -> Self {
        Self {
            task: None,
            ready: Some(outcome),
        }
    }

    pub(crate) const fn spawned(task: JoinHandle<Outcome<T>>) -> Self {
        Self {
            task: Some(task),
            ready: None,
        }
    }

    pub async fn outcome(self) -> Outcome<T> {
        if let Some(outcome) = self.ready {
            return outcome;
        }

        let Some(task) = self.task else {
            return Outcome::Superseded;
        };

        task.await.unwrap_or_else(|err| {
            warn!(%err, "Mutation task ended abnormally");
            Outcome::Superseded
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Debouncing,
    InFlight,
}

/// The single active mutation of a widget.
#[derive(Debug)]
pub struct PendingMutation {
    pub generation: u64,
    pub variant_id: VariantId,
    pub target: u32,
    phase: Phase,
    sent_add: bool,
    token: CancellationToken,
}

impl PendingMutation {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.phase == Phase::InFlight
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    pending: Option<PendingMutation>,
    /// A cancelled or failed additive request may have landed server-side,
    /// so the next request has to set an absolute quantity.
    uncertain: bool,
}

impl Slot {
    fn is_current(&self, generation: u64) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Request {
    Add(VariantId, u32),
    Change(LineRef, u32),
    Update(VariantId, u32),
}

impl Request {
    const fn is_add(&self) -> bool {
        matches!(self, Self::Add(..))
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(variant_id, quantity) => write!(f, "add {variant_id} x{quantity}"),
            Self::Change(line, quantity) => write!(f, "change {line} to {quantity}"),
            Self::Update(variant_id, quantity) => write!(f, "update {variant_id} to {quantity}"),
        }
    }
}

#[derive(Debug)]
struct CoordinatorInner {
    id: WidgetId,
    config: WidgetConfig,
    debounce: Duration,
    in_flight: InFlightPolicy,
    ctx: CartContext,
    updater: OptimisticUpdater,
    slot: Mutex<Slot>,
}

#[derive(Clone, Debug)]
pub struct RequestCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl RequestCoordinator {
    #[must_use]
    pub fn new(ctx: CartContext, config: WidgetConfig) -> Self {
        let settings = ctx.settings();

        let updater = OptimisticUpdater::new(
            config.variant_id,
            config.initial_quantity,
            config.max,
            config.hide_when_empty,
        );

        let inner = CoordinatorInner {
            id: ctx.next_widget_id(),
            debounce: config.debounce.unwrap_or(settings.quantity_debounce),
            in_flight: config.in_flight.unwrap_or(settings.in_flight),
            config,
            ctx,
            updater,
            slot: Mutex::default(),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    #[must_use]
    pub fn id(&self) -> WidgetId {
        self.inner.id
    }

    #[must_use]
    pub fn config(&self) -> &WidgetConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn interest(&self) -> Interest {
        Interest::Variant(self.inner.config.variant_id)
    }

    #[must_use]
    pub fn updater(&self) -> &OptimisticUpdater {
        &self.inner.updater
    }

    #[must_use]
    pub fn view(&self) -> WidgetView {
        self.inner.updater.view()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<WidgetView> {
        self.inner.updater.subscribe()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.inner.slot.lock().pending.is_some()
    }

    /// Applies `operation` optimistically and schedules the request for it.
    ///
    /// Must be called within a tokio runtime.
    pub fn submit(&self, operation: Operation) -> Result<MutationHandle, CartError> {
        let inner = &self.inner;
        let variant_id = inner.config.variant_id;

        let mut slot = inner.slot.lock();

        if inner.in_flight == InFlightPolicy::Ignore
            && slot
                .pending
                .as_ref()
                .is_some_and(PendingMutation::is_in_flight)
        {
            debug!(widget = %inner.id, ?operation, "Ignoring input while a mutation is in flight");
            return Ok(MutationHandle::ready(Outcome::Ignored));
        }

        let current = inner.updater.displayed();
        let target = operation.target(current);

        // a line already above the bound may still move down
        if let Some(max) = inner.config.max {
            if target > max && target > current {
                return Err(CartError::QuantityOutOfRange {
                    requested: target,
                    max,
                });
            }
        }

        if target == current {
            let line_absent = inner.updater.line_key().is_none() && inner.updater.confirmed() == 0;

            if target == 0
                && line_absent
                && slot.pending.is_none()
                && operation != Operation::Increment
            {
                return Err(CartError::MissingLineReference {
                    line: LineRef::Variant(variant_id),
                });
            }

            return Ok(MutationHandle::ready(Outcome::Unchanged(current)));
        }

        if let Some(previous) = slot.pending.take() {
            previous.cancel();

            if previous.sent_add {
                slot.uncertain = true;
            }

            debug!(
                widget = %inner.id,
                generation = previous.generation,
                in_flight = previous.is_in_flight(),
                "Superseding pending mutation"
            );
        }

        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;
        let token = CancellationToken::new();

        let delta = i64::from(target) - i64::from(current);
        let _displayed = inner.updater.apply_optimistic(delta);

        slot.pending = Some(PendingMutation {
            generation,
            variant_id,
            target,
            phase: Phase::Debouncing,
            sent_add: false,
            token: token.clone(),
        });

        drop(slot);

        let task = tokio::spawn(Arc::clone(inner).drive(generation, target, token));

        Ok(MutationHandle::spawned(task))
    }

    pub fn increment(&self) -> Result<MutationHandle, CartError> {
        self.submit(Operation::Increment)
    }

    pub fn decrement(&self) -> Result<MutationHandle, CartError> {
        self.submit(Operation::Decrement)
    }

    pub fn set_quantity(&self, quantity: u32) -> Result<MutationHandle, CartError> {
        self.submit(Operation::SetQuantity(quantity))
    }

    /// Re-derives the widget from a snapshot produced by someone else.
    pub fn observe(&self, cart: &Cart) {
        let slot = self.inner.slot.lock();

        self.inner.updater.observe(cart, slot.pending.is_some());
    }

    /// Cancels whatever is pending and restores the confirmed quantity.
    pub fn cancel_pending(&self) {
        let mut slot = self.inner.slot.lock();

        if let Some(pending) = slot.pending.take() {
            pending.cancel();

            if pending.sent_add {
                slot.uncertain = true;
            }

            let confirmed = self.inner.updater.confirmed();
            self.inner.updater.reconcile(confirmed);
        }
    }
}

impl CoordinatorInner {
    async fn drive(self: Arc<Self>, generation: u64, target: u32, token: CancellationToken) -> Outcome {
        match self.execute(generation, target, &token).await {
            Ok(outcome) => outcome,
            Err(CartError::StaleResponse) => {
                trace!(widget = %self.id, generation, "Discarded superseded mutation");
                Outcome::Superseded
            }
            Err(err) => Outcome::Failed(err),
        }
    }

    async fn execute(
        &self,
        generation: u64,
        target: u32,
        token: &CancellationToken,
    ) -> Result<Outcome, CartError> {
        if !self.debounce.is_zero() {
            tokio::select! {
                biased;
                () = token.cancelled() => return Err(CartError::StaleResponse),
                () = time::sleep(self.debounce) => {}
            }
        }

        let request = {
            let mut slot = self.slot.lock();

            if !slot.is_current(generation) {
                return Err(CartError::StaleResponse);
            }

            let Some(request) = self.plan(target, slot.uncertain) else {
                // the burst netted out to what the server already holds
                slot.pending = None;
                let confirmed = self.updater.confirmed();
                self.updater.reconcile(confirmed);
                return Ok(Outcome::Unchanged(confirmed));
            };

            if let Some(pending) = slot.pending.as_mut() {
                pending.phase = Phase::InFlight;
                pending.sent_add = request.is_add();
            }

            self.updater.set_busy(true);

            request
        };

        debug!(widget = %self.id, generation, %request, "Sending cart mutation");

        let response = tokio::select! {
            biased;
            () = token.cancelled() => return Err(CartError::StaleResponse),
            response = self.send(&request) => response,
        };

        let mut slot = self.slot.lock();

        if !slot.is_current(generation) || token.is_cancelled() {
            return Err(CartError::StaleResponse);
        }

        slot.pending = None;

        match response {
            Ok(cart) => {
                slot.uncertain = false;

                let cart = Arc::new(cart);
                let quantity = self.updater.reconcile_with(&cart);

                drop(slot);

                debug!(widget = %self.id, generation, quantity, "Cart mutation applied");

                self.ctx.cache().set(Arc::clone(&cart));
                let affected = self.affected(&cart);
                let _delivered =
                    self.ctx
                        .bus()
                        .publish_changed(cart, EventSource::Widget(self.id), affected);

                Ok(Outcome::Applied(quantity))
            }
            Err(err) => {
                if request.is_add() && !err.is_rejection() {
                    slot.uncertain = true;
                }

                let err = CartError::from(err);
                self.updater.rollback(&err);

                drop(slot);

                warn!(widget = %self.id, generation, %err, "Cart mutation failed, rolled back");

                if let Some(kind) = err.kind() {
                    let _delivered = self.ctx.bus().publish_error(CartErrorEvent {
                        source: EventSource::Widget(self.id),
                        variant_id: Some(self.config.variant_id),
                        kind,
                        message: err.to_string(),
                    });
                }

                Err(err)
            }
        }
    }

    /// Chooses the request that moves the line to `target`, if any is needed.
    fn plan(&self, target: u32, uncertain: bool) -> Option<Request> {
        let variant_id = self.config.variant_id;
        let confirmed = self.updater.confirmed();
        let line_key = self.updater.line_key();

        if target == confirmed && !uncertain {
            return None;
        }

        if let (LineIdentifierStrategy::PreferKey, Some(key)) = (self.config.strategy, &line_key) {
            return Some(Request::Change(LineRef::Key(key.clone()), target));
        }

        if uncertain {
            return Some(Request::Update(variant_id, target));
        }

        if confirmed > 0 || line_key.is_some() {
            return Some(Request::Change(LineRef::Variant(variant_id), target));
        }

        Some(Request::Add(variant_id, target))
    }

    async fn send(&self, request: &Request) -> Result<Cart, ClientError> {
        let api = self.ctx.api();

        match request {
            Request::Add(variant_id, quantity) => {
                api.add(&[AddItem {
                    id: *variant_id,
                    quantity: *quantity,
                }])
                .await
            }
            Request::Change(line, quantity) => api.change(line, *quantity).await,
            Request::Update(variant_id, quantity) => {
                let updates = BTreeMap::from([(*variant_id, *quantity)]);
                api.update(&UpdateRequest::quantities(updates)).await
            }
        }
    }

    fn affected(&self, cart: &Cart) -> Affected {
        let variant_id = self.config.variant_id;

        let mut product_ids: Vec<_> = self
            .config
            .product_id
            .into_iter()
            .chain(cart.products_of(&[variant_id]))
            .collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        Affected::Lines {
            variant_ids: vec![variant_id],
            product_ids,
        }
    }
}

//! Client-side reconciliation of a shared, remotely held shopping cart.
//!
//! Many independently mounted widgets read and mutate one server-side cart.
//! Each widget shows an optimistic result immediately, at most one request
//! per widget is ever in flight, and every widget re-derives what it shows
//! from the latest authoritative snapshot:
//!
//! - [`CartSnapshotCache`] holds the last known cart and de-duplicates reads.
//! - [`RequestCoordinator`] debounces input and cancels superseded requests.
//! - [`OptimisticUpdater`] owns a widget's displayed state.
//! - [`CartEventBus`] fans "cart changed" notifications out to subscribers.
//! - [`CartMergeProtocol`] merges an anonymous cart into an identified one.

pub mod bus;
pub mod cache;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod merge;
pub mod optimistic;
pub mod session;
pub mod settings;
pub mod widgets;

#[cfg(test)]
mod test_utils;

pub use bus::{CartEventBus, Interest, Subscription};
pub use cache::CartSnapshotCache;
pub use context::CartContext;
pub use coordinator::{
    LineIdentifierStrategy, MutationHandle, Operation, Outcome, PendingMutation,
    RequestCoordinator, WidgetConfig,
};
pub use error::{CartError, FetchError};
pub use merge::{CartMergeProtocol, MergeOutcome, MergeReport, MergeState, PageReloader};
pub use optimistic::{OptimisticUpdater, WidgetView};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore, SessionStoreError};
pub use settings::{CartSettings, InFlightPolicy};
pub use widgets::{CartCountBadge, CartNote, QuantityControl};

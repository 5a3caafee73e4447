//! Process-wide cache of the last known cart snapshot.
//!
//! Reads are single-flight: however many callers ask for the snapshot while a
//! fetch is running, they all await that one fetch. Mutation responses are
//! written straight into the cache so readers see them without another round
//! trip.

#[cfg(test)]
#[path = "tests/cache.rs"]
mod tests;

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use parking_lot::Mutex;
use storefront_client::CartApi;
use storefront_primitives::cart::Cart;
use tracing::{debug, warn};

use crate::error::FetchError;

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Cart>, FetchError>>>;

#[derive(Default)]
struct CacheState {
    snapshot: Option<Arc<Cart>>,
    /// Bumped on every authoritative write.
    version: u64,
    in_flight: Option<(u64, SharedFetch)>,
}

#[derive(Clone)]
pub struct CartSnapshotCache {
    api: Arc<dyn CartApi>,
    state: Arc<Mutex<CacheState>>,
    fetches: Arc<AtomicU64>,
}

impl fmt::Debug for CartSnapshotCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();

        f.debug_struct("CartSnapshotCache")
            .field("snapshot", &state.snapshot)
            .field("version", &state.version)
            .field("fetching", &state.in_flight.is_some())
            .finish_non_exhaustive()
    }
}

impl CartSnapshotCache {
    #[must_use]
    pub fn new(api: Arc<dyn CartApi>) -> Self {
        Self {
            api,
            state: Arc::default(),
            fetches: Arc::default(),
        }
    }

    /// Latest known snapshot, fetching it first if none is known yet.
    pub async fn get(&self) -> Result<Arc<Cart>, FetchError> {
        if let Some(cart) = self.peek() {
            return Ok(cart);
        }

        self.refresh().await
    }

    /// Fetches a fresh snapshot, joining a fetch that is already running.
    ///
    /// Failures are handed to every waiter and are not retried.
    pub async fn refresh(&self) -> Result<Arc<Cart>, FetchError> {
        let fetch = {
            let mut state = self.state.lock();

            if let Some((_, fetch)) = &state.in_flight {
                fetch.clone()
            } else {
                let fetch_id = self.fetches.fetch_add(1, Ordering::Relaxed);
                let fetch = self.start_fetch(fetch_id, state.version);
                state.in_flight = Some((fetch_id, fetch.clone()));
                fetch
            }
        };

        fetch.await
    }

    /// Makes `cart` the current snapshot.
    pub fn set(&self, cart: Arc<Cart>) {
        let mut state = self.state.lock();

        state.snapshot = Some(cart);
        state.version = state.version.wrapping_add(1);
    }

    #[must_use]
    pub fn peek(&self) -> Option<Arc<Cart>> {
        self.state.lock().snapshot.clone()
    }

    /// Forgets the snapshot and detaches any running fetch from the cache.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();

        state.snapshot = None;
        state.in_flight = None;
        state.version = state.version.wrapping_add(1);
    }

    /// Number of network reads started so far.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    fn start_fetch(&self, fetch_id: u64, started_at: u64) -> SharedFetch {
        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);

        async move {
            debug!(fetch_id, "Fetching cart snapshot");

            let result = api.read().await;

            let mut state = state.lock();

            let attached = matches!(&state.in_flight, Some((id, _)) if *id == fetch_id);
            if attached {
                state.in_flight = None;
            }

            let cart = result.map_err(|err| {
                warn!(fetch_id, %err, "Cart snapshot fetch failed");
                FetchError::from(err)
            })?;

            // invalidated while running: only the callers already waiting get it
            if !attached {
                debug!(fetch_id, "Fetch detached by invalidation, not caching");
                return Ok(Arc::new(cart));
            }

            // a mutation response written meanwhile is newer than this read
            if state.version != started_at {
                if let Some(newer) = &state.snapshot {
                    debug!(fetch_id, "Discarding fetched snapshot older than cached one");
                    return Ok(Arc::clone(newer));
                }
            }

            let cart = Arc::new(cart);
            state.snapshot = Some(Arc::clone(&cart));
            state.version = state.version.wrapping_add(1);

            Ok(cart)
        }
        .boxed()
        .shared()
    }
}

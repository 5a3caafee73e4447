//! One-shot merge of an anonymous cart into an identified one.
//!
//! ```text
//! Idle -> CapturedLocal -> IdentitySwitched -> Merging -> Merged -> Reloaded
//!   \________________________________________________________/
//!                               |
//!                             Failed
//! ```
//!
//! The run is guarded by a session flag that is written before the first
//! step, so a session never attempts the merge twice. Nothing is reloaded
//! unless every step succeeded, and a failure after the identity switch
//! restores the previous identity so the local cart stays reachable.

#[cfg(test)]
#[path = "tests/merge.rs"]
mod tests;

use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use storefront_client::ClientError;
use storefront_primitives::cart::{Cart, CartToken};
use storefront_primitives::events::{Affected, EventSource};
use storefront_primitives::requests::AddItem;
use tracing::{debug, error, info, warn};

use crate::context::CartContext;
use crate::error::CartError;
use crate::session::SessionStore;

/// Session key recording that the merge has been attempted.
pub const CART_SYNCED_KEY: &str = "cart_synced";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeState {
    #[default]
    Idle,
    CapturedLocal,
    IdentitySwitched,
    Merging,
    Merged,
    Reloaded,
    Failed,
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Idle => "idle",
            Self::CapturedLocal => "captured-local",
            Self::IdentitySwitched => "identity-switched",
            Self::Merging => "merging",
            Self::Merged => "merged",
            Self::Reloaded => "reloaded",
            Self::Failed => "failed",
        };

        f.write_str(state)
    }
}

/// Re-initializes every widget against the merged cart.
pub trait PageReloader: Send + Sync {
    fn reload(&self, cart: &Cart);
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub local: Cart,
    pub remote: Cart,
    pub merged: Arc<Cart>,
    pub transitions: Vec<MergeState>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", content = "report", rename_all = "kebab-case")]
pub enum MergeOutcome {
    /// The session flag was already set; nothing was touched.
    AlreadyRan,
    Completed(MergeReport),
}

#[derive(Debug, Default)]
struct Progress {
    state: MergeState,
    transitions: Vec<MergeState>,
}

pub struct CartMergeProtocol {
    ctx: CartContext,
    session: Arc<dyn SessionStore>,
    reloader: Arc<dyn PageReloader>,
    progress: Mutex<Progress>,
}

impl fmt::Debug for CartMergeProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartMergeProtocol")
            .field("ctx", &self.ctx)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl CartMergeProtocol {
    #[must_use]
    pub fn new(
        ctx: CartContext,
        session: Arc<dyn SessionStore>,
        reloader: Arc<dyn PageReloader>,
    ) -> Self {
        Self {
            ctx,
            session,
            reloader,
            progress: Mutex::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> MergeState {
        self.progress.lock().state
    }

    #[must_use]
    pub fn transitions(&self) -> Vec<MergeState> {
        self.progress.lock().transitions.clone()
    }

    /// Merges the current cart into the cart named by `cart_id`.
    ///
    /// `cart_id` has the form `gid://<vendor>/Cart/<token>`.
    pub async fn run(&self, cart_id: &str) -> Result<MergeOutcome, CartError> {
        if self.session.exists(CART_SYNCED_KEY).await? {
            info!("Cart merge already ran in this session, skipping");
            return Ok(MergeOutcome::AlreadyRan);
        }

        self.session.set(CART_SYNCED_KEY, "true").await?;

        *self.progress.lock() = Progress::default();

        match self.execute(cart_id).await {
            Ok(report) => Ok(MergeOutcome::Completed(report)),
            Err(err) => {
                self.advance(MergeState::Failed);
                error!(%err, cart_id, "Cart merge failed, page not reloaded");
                self.ctx.report(EventSource::Merge, None, &err);
                Err(err)
            }
        }
    }

    async fn execute(&self, cart_id: &str) -> Result<MergeReport, CartError> {
        let api = self.ctx.api();

        let target = CartToken::from_cart_id(cart_id).ok_or_else(|| CartError::InvalidIdentity {
            reason: format!("`{cart_id}` does not name a cart"),
        })?;

        let local = api.read().await?;
        self.advance(MergeState::CapturedLocal);

        let previous = api.set_identity(Some(target.clone()));
        self.advance(MergeState::IdentitySwitched);

        debug!(from = ?previous, to = %target.as_str(), "Switched cart identity");

        let remote = match api.read().await {
            Ok(remote) if remote.token == target => remote,
            Ok(remote) => {
                let _target = api.set_identity(previous);
                return Err(CartError::InvalidIdentity {
                    reason: format!(
                        "cart service resolved `{}` instead of `{}`",
                        remote.token.as_str(),
                        target.as_str()
                    ),
                });
            }
            Err(err) => {
                let _target = api.set_identity(previous);
                return Err(resolve_error(err));
            }
        };

        self.advance(MergeState::Merging);

        let items: Vec<_> = local
            .items
            .iter()
            .filter(|item| item.quantity > 0)
            .map(AddItem::from)
            .collect();

        let mut merged = remote.clone();

        if local.token == target {
            debug!("Local cart already is the target cart, nothing to merge");
        } else if !items.is_empty() {
            info!(lines = items.len(), "Merging local cart lines");

            merged = match api.add(&items).await {
                Ok(cart) => cart,
                Err(err) => {
                    let _target = api.set_identity(previous);
                    return Err(err.into());
                }
            };
        }

        self.advance(MergeState::Merged);

        match api.read().await {
            Ok(cart) => merged = cart,
            Err(err) => warn!(%err, "Could not re-read merged cart, using last response"),
        }

        let merged = self
            .ctx
            .commit(merged, EventSource::Merge, Affected::Everything);

        self.reloader.reload(&merged);
        self.advance(MergeState::Reloaded);

        info!(item_count = merged.item_count, "Cart merge complete");

        Ok(MergeReport {
            local,
            remote,
            merged,
            transitions: self.transitions(),
        })
    }

    fn advance(&self, state: MergeState) {
        let mut progress = self.progress.lock();

        debug!(from = %progress.state, to = %state, "Cart merge transition");

        progress.state = state;
        progress.transitions.push(state);
    }
}

/// A transport failure stays a fetch error; anything the service actually
/// answered means the identity does not resolve.
fn resolve_error(err: ClientError) -> CartError {
    match err {
        ClientError::Transport { .. } => CartError::from(err),
        err => CartError::InvalidIdentity {
            reason: err.to_string(),
        },
    }
}

use core::time::Duration;
use std::sync::Arc;

use parking_lot::Mutex;
use storefront_primitives::cart::Cart;
use storefront_primitives::events::{Affected, CartEvent, EventSource};
use storefront_primitives::requests::UpdateRequest;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::bus::{Interest, Subscription};
use crate::context::CartContext;
use crate::coordinator::{MutationHandle, Outcome};
use crate::error::CartError;

#[derive(Debug, Default)]
struct NoteState {
    /// What the editor shows.
    text: String,
    /// What the service last confirmed.
    confirmed: String,
    generation: u64,
    pending: Option<(u64, CancellationToken)>,
}

impl NoteState {
    fn is_current(&self, generation: u64) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|(pending, _)| *pending == generation)
    }

    fn absorb(&mut self, cart: &Cart) {
        self.confirmed = cart.note.clone().unwrap_or_default();
    }
}

#[derive(Debug)]
struct NoteInner {
    ctx: CartContext,
    debounce: Duration,
    state: Mutex<NoteState>,
    view: watch::Sender<String>,
}

/// Free-text cart note editor.
#[derive(Debug)]
pub struct CartNote {
    inner: Arc<NoteInner>,
    listener: JoinHandle<()>,
}

impl CartNote {
    #[must_use]
    pub fn mount(ctx: &CartContext) -> Self {
        let initial = ctx
            .cache()
            .peek()
            .and_then(|cart| cart.note.clone())
            .unwrap_or_default();

        let inner = Arc::new(NoteInner {
            ctx: ctx.clone(),
            debounce: ctx.settings().note_debounce,
            state: Mutex::new(NoteState {
                text: initial.clone(),
                confirmed: initial.clone(),
                ..NoteState::default()
            }),
            view: watch::Sender::new(initial),
        });

        let subscription = ctx.bus().subscribe(Interest::All);
        let listener = tokio::spawn(Arc::clone(&inner).listen(subscription));

        Self { inner, listener }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.inner.view.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.inner.view.subscribe()
    }

    /// Schedules saving `text` as the cart note.
    ///
    /// Replaces any save still pending; setting the text already shown does
    /// nothing.
    pub fn set_note(&self, text: impl Into<String>) -> MutationHandle<String> {
        let text = text.into();
        let mut state = self.inner.state.lock();

        if state.text == text {
            return MutationHandle::ready(Outcome::Unchanged(text));
        }

        if let Some((generation, token)) = state.pending.take() {
            trace!(generation, "Superseding pending note update");
            token.cancel();
        }

        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        let token = CancellationToken::new();

        state.text.clone_from(&text);
        state.pending = Some((generation, token.clone()));
        let _previous = self.inner.view.send_replace(text.clone());

        drop(state);

        let task = tokio::spawn(Arc::clone(&self.inner).save(generation, text, token));

        MutationHandle::spawned(task)
    }

    pub async fn teardown(mut self) {
        self.listener.abort();
        let _ignored = (&mut self.listener).await;

        if let Some((_, token)) = self.inner.state.lock().pending.take() {
            token.cancel();
        }
    }
}

impl Drop for CartNote {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl NoteInner {
    async fn save(
        self: Arc<Self>,
        generation: u64,
        text: String,
        token: CancellationToken,
    ) -> Outcome<String> {
        tokio::select! {
            biased;
            () = token.cancelled() => return Outcome::Superseded,
            () = time::sleep(self.debounce) => {}
        }

        {
            let mut state = self.state.lock();

            if !state.is_current(generation) {
                return Outcome::Superseded;
            }

            if state.confirmed == text {
                state.pending = None;
                return Outcome::Unchanged(text);
            }
        }

        debug!(generation, len = text.len(), "Saving cart note");

        let request = UpdateRequest::note(text);

        let response = tokio::select! {
            biased;
            () = token.cancelled() => return Outcome::Superseded,
            response = self.ctx.api().update(&request) => response,
        };

        {
            let mut state = self.state.lock();

            if !state.is_current(generation) || token.is_cancelled() {
                trace!(generation, "Discarded superseded note response");
                return Outcome::Superseded;
            }

            state.pending = None;

            if let Ok(cart) = &response {
                state.absorb(cart);
            }
        }

        match response {
            Ok(cart) => {
                let cart = self.ctx.commit(cart, EventSource::Note, Affected::Note);
                Outcome::Applied(cart.note.clone().unwrap_or_default())
            }
            Err(err) => {
                let err = CartError::from(err);
                warn!(%err, "Cart note update failed");
                self.ctx.report(EventSource::Note, None, &err);
                Outcome::Failed(err)
            }
        }
    }

    async fn listen(self: Arc<Self>, mut subscription: Subscription) {
        match self.ctx.cache().get().await {
            Ok(cart) => self.observe(&cart),
            Err(err) => debug!(%err, "Initial cart read failed"),
        }

        while let Some(event) = subscription.recv().await {
            if let CartEvent::Changed(changed) = event {
                self.observe(&changed.cart);
            }
        }
    }

    fn observe(&self, cart: &Cart) {
        let mut state = self.state.lock();

        state.absorb(cart);

        // an edit in progress wins over whatever the service holds
        if state.pending.is_none() {
            state.text = state.confirmed.clone();
            let _previous = self.view.send_replace(state.text.clone());
        }
    }
}

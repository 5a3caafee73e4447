use std::collections::BTreeMap;

use storefront_primitives::cart::VariantId;
use storefront_primitives::events::{CartEvent, ErrorKind};

use super::*;
use crate::bus::Interest;
use crate::session::MemorySessionStore;
use crate::test_utils::{lines, token, Call, ScriptedCart, LOCAL};

const REMOTE_ID: &str = "gid://shop/Cart/remote";

#[derive(Debug, Default)]
struct RecordingReloader {
    reloads: Mutex<Vec<Cart>>,
}

impl PageReloader for RecordingReloader {
    fn reload(&self, cart: &Cart) {
        self.reloads.lock().push(cart.clone());
    }
}

struct Fixture {
    scripted: Arc<ScriptedCart>,
    ctx: CartContext,
    session: Arc<MemorySessionStore>,
    reloader: Arc<RecordingReloader>,
}

impl Fixture {
    fn new(local: &[(u64, u32)], remote: &[(u64, u32)]) -> Self {
        let scripted = ScriptedCart::with_lines(local);
        scripted.insert_cart("remote", remote);

        Self {
            ctx: scripted.context(),
            scripted,
            session: Arc::default(),
            reloader: Arc::default(),
        }
    }

    fn protocol(&self) -> CartMergeProtocol {
        CartMergeProtocol::new(
            self.ctx.clone(),
            self.session.clone(),
            self.reloader.clone(),
        )
    }

    fn reloads(&self) -> usize {
        self.reloader.reloads.lock().len()
    }
}

#[tokio::test]
async fn test_merge_is_additive() {
    let fixture = Fixture::new(&[(1, 2), (2, 1)], &[(2, 3)]);
    let mut all = fixture.ctx.bus().subscribe(Interest::All);
    let protocol = fixture.protocol();

    let outcome = protocol.run(REMOTE_ID).await.expect("merge should succeed");
    let MergeOutcome::Completed(report) = outcome else {
        panic!("first run should merge");
    };

    assert_eq!(lines(&report.merged), BTreeMap::from([(1, 2), (2, 4)]));
    assert_eq!(lines(&fixture.scripted.cart("remote")), BTreeMap::from([(1, 2), (2, 4)]));
    assert_eq!(lines(&report.local), BTreeMap::from([(1, 2), (2, 1)]));
    assert_eq!(lines(&report.remote), BTreeMap::from([(2, 3)]));

    assert_eq!(
        report.transitions,
        vec![
            MergeState::CapturedLocal,
            MergeState::IdentitySwitched,
            MergeState::Merging,
            MergeState::Merged,
            MergeState::Reloaded,
        ]
    );
    assert_eq!(protocol.state(), MergeState::Reloaded);
    assert_eq!(fixture.reloads(), 1);
    assert_eq!(fixture.ctx.api().identity(), Some(token("remote")));

    let adds: Vec<_> = fixture
        .scripted
        .mutations()
        .into_iter()
        .filter(|call| matches!(call, Call::Add(_)))
        .collect();
    assert_eq!(adds.len(), 1, "local lines go out in one bulk add");

    let Some(CartEvent::Changed(changed)) = all.try_recv() else {
        panic!("merged cart should be broadcast");
    };
    assert_eq!(changed.source, EventSource::Merge);
    assert_eq!(changed.item_count, 6);
}

#[tokio::test]
async fn test_merge_runs_once_per_session() {
    let fixture = Fixture::new(&[(1, 2)], &[]);

    let first = fixture.protocol().run(REMOTE_ID).await.expect("first run");
    assert!(matches!(first, MergeOutcome::Completed(_)));

    let second = fixture.protocol().run(REMOTE_ID).await.expect("second run");
    assert!(matches!(second, MergeOutcome::AlreadyRan));

    assert_eq!(fixture.reloads(), 1);
    assert_eq!(fixture.scripted.quantity("remote", 1), 2);
}

#[tokio::test]
async fn test_empty_local_cart_merges_nothing() {
    let fixture = Fixture::new(&[], &[(2, 3)]);

    let outcome = fixture.protocol().run(REMOTE_ID).await.expect("merge");

    assert!(matches!(outcome, MergeOutcome::Completed(_)));
    assert!(fixture.scripted.mutations().is_empty());
    assert_eq!(fixture.reloads(), 1);
}

#[tokio::test]
async fn test_unknown_remote_cart_restores_identity() {
    let fixture = Fixture::new(&[(1, 2)], &[]);
    let protocol = fixture.protocol();

    let err = protocol
        .run("gid://shop/Cart/missing")
        .await
        .expect_err("unknown cart");

    assert!(matches!(err, CartError::InvalidIdentity { .. }));
    assert_eq!(protocol.state(), MergeState::Failed);
    assert_eq!(fixture.reloads(), 0);
    assert_eq!(fixture.ctx.api().identity(), Some(token(LOCAL)));
    assert_eq!(fixture.scripted.quantity(LOCAL, 1), 2);
    assert!(fixture.scripted.mutations().is_empty());

    // an attempted run counts
    let again = protocol.run(REMOTE_ID).await.expect("guarded");
    assert!(matches!(again, MergeOutcome::AlreadyRan));
}

#[tokio::test]
async fn test_malformed_cart_id_fails_before_any_step() {
    let fixture = Fixture::new(&[(1, 2)], &[]);
    let mut all = fixture.ctx.bus().subscribe(Interest::All);
    let protocol = fixture.protocol();

    let err = protocol.run("remote").await.expect_err("not a cart id");

    assert!(matches!(err, CartError::InvalidIdentity { .. }));
    assert_eq!(protocol.transitions(), vec![MergeState::Failed]);
    assert!(fixture.scripted.calls().is_empty());

    let Some(CartEvent::Error(event)) = all.try_recv() else {
        panic!("failure should be broadcast");
    };
    assert_eq!(event.kind, ErrorKind::InvalidIdentity);
    assert_eq!(event.source, EventSource::Merge);
}

#[tokio::test]
async fn test_failed_merge_add_does_not_reload() {
    let fixture = Fixture::new(&[(1, 2)], &[]);
    fixture.scripted.set_cap(1, 1);
    let protocol = fixture.protocol();

    let err = protocol.run(REMOTE_ID).await.expect_err("capped");

    assert!(matches!(err, CartError::ServerRejection { .. }));
    assert_eq!(fixture.reloads(), 0);
    assert_eq!(fixture.ctx.api().identity(), Some(token(LOCAL)));
    assert_eq!(fixture.scripted.quantity(LOCAL, 1), 2);
    assert_eq!(
        fixture.scripted.cart("remote").quantity_of(VariantId::new(1)),
        0
    );
}

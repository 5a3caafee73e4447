use core::time::Duration;

use futures_util::future::join_all;
use storefront_client::ClientError;
use storefront_primitives::cart::VariantId;
use tokio::time;

use super::*;
use crate::test_utils::ScriptedCart;

#[tokio::test(start_paused = true)]
async fn test_concurrent_gets_share_one_read() {
    let scripted = ScriptedCart::with_lines(&[(42, 1)]);
    scripted.set_delay(Duration::from_millis(50));
    let cache = CartSnapshotCache::new(scripted.clone());

    let carts = join_all((0..8).map(|_| cache.get())).await;

    assert_eq!(scripted.reads(), 1);
    assert_eq!(cache.fetch_count(), 1);
    for cart in carts {
        let cart = cart.expect("shared fetch should succeed");
        assert_eq!(cart.quantity_of(VariantId::new(42)), 1);
    }
}

#[tokio::test]
async fn test_get_serves_cached_snapshot() {
    let scripted = ScriptedCart::with_lines(&[(42, 1)]);
    let cache = CartSnapshotCache::new(scripted.clone());

    let first = cache.get().await.expect("first read");
    let second = cache.get().await.expect("cached read");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(scripted.reads(), 1);
}

#[tokio::test]
async fn test_refresh_always_reads() {
    let scripted = ScriptedCart::with_lines(&[(42, 1)]);
    let cache = CartSnapshotCache::new(scripted.clone());

    let _cart = cache.get().await.expect("first read");
    scripted.insert_cart("local", &[(42, 5)]);
    let cart = cache.refresh().await.expect("refresh");

    assert_eq!(cart.quantity_of(VariantId::new(42)), 5);
    assert_eq!(scripted.reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_write_during_fetch_wins() {
    let scripted = ScriptedCart::with_lines(&[(42, 1)]);
    scripted.set_delay(Duration::from_millis(50));
    let cache = CartSnapshotCache::new(scripted.clone());

    let newer = Arc::new(scripted.cart("local"));
    let fetch = cache.get();
    let write = async {
        time::sleep(Duration::from_millis(10)).await;
        cache.set(Arc::clone(&newer));
    };

    let (fetched, ()) = tokio::join!(fetch, write);
    let fetched = fetched.expect("fetch should succeed");

    assert!(Arc::ptr_eq(&fetched, &newer));
    assert!(cache.peek().is_some_and(|cart| Arc::ptr_eq(&cart, &newer)));
}

#[tokio::test]
async fn test_failed_fetch_is_shared_and_not_cached() {
    let scripted = ScriptedCart::new();
    scripted.fail_next(ClientError::transport("connection reset"));
    let cache = CartSnapshotCache::new(scripted.clone());

    let err = cache.get().await.expect_err("fetch should fail");
    assert_eq!(err.source, ClientError::transport("connection reset"));
    assert!(cache.peek().is_none());

    let _cart = cache.get().await.expect("next fetch should retry");
    assert_eq!(scripted.reads(), 2);
}

#[tokio::test]
async fn test_invalidate_forces_next_read() {
    let scripted = ScriptedCart::new();
    let cache = CartSnapshotCache::new(scripted.clone());

    let _cart = cache.get().await.expect("first read");
    cache.invalidate();
    assert!(cache.peek().is_none());

    let _cart = cache.get().await.expect("second read");
    assert_eq!(scripted.reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_detached_fetch_does_not_overwrite_fresh_read() {
    let scripted = ScriptedCart::with_lines(&[(42, 1)]);
    scripted.set_delay(Duration::from_millis(50));
    let cache = CartSnapshotCache::new(scripted.clone());

    let detached = tokio::spawn({
        let cache = cache.clone();
        async move { cache.refresh().await }
    });
    time::sleep(Duration::from_millis(1)).await;

    cache.invalidate();
    scripted.insert_cart("local", &[(42, 5)]);
    scripted.set_delay(Duration::from_millis(100));

    let fresh = cache.refresh().await.expect("fresh read");
    let stale = detached
        .await
        .expect("task should not panic")
        .expect("detached read");

    assert_eq!(stale.quantity_of(VariantId::new(42)), 1);
    assert_eq!(fresh.quantity_of(VariantId::new(42)), 5);
    assert_eq!(
        cache.peek().map(|cart| cart.quantity_of(VariantId::new(42))),
        Some(5)
    );
    assert_eq!(scripted.reads(), 2);
}

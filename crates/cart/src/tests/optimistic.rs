use storefront_client::ClientError;
use storefront_primitives::cart::CartLineItem;

use super::*;

const VARIANT: VariantId = VariantId::new(42);

fn cart(quantity: u32, key: &str) -> Cart {
    Cart {
        items: vec![CartLineItem {
            key: LineKey::from(key),
            variant_id: VARIANT,
            product_id: None,
            quantity,
        }],
        item_count: quantity,
        ..Cart::default()
    }
}

#[test]
fn test_optimistic_moves_only_displayed() {
    let updater = OptimisticUpdater::new(VARIANT, 1, None, true);

    assert_eq!(updater.apply_optimistic(2), 3);
    assert_eq!(updater.displayed(), 3);
    assert_eq!(updater.confirmed(), 1);
    assert_eq!(updater.view().quantity, 3);
}

#[test]
fn test_optimistic_clamps_at_zero() {
    let updater = OptimisticUpdater::new(VARIANT, 1, None, true);

    assert_eq!(updater.apply_optimistic(-5), 0);
    assert!(!updater.view().visible);
}

#[test]
fn test_reconcile_with_takes_server_quantity_and_key() {
    let updater = OptimisticUpdater::new(VARIANT, 0, None, true);
    let _displayed = updater.apply_optimistic(2);

    let quantity = updater.reconcile_with(&cart(3, "42:a"));

    assert_eq!(quantity, 3);
    assert_eq!(updater.displayed(), 3);
    assert_eq!(updater.line_key(), Some(LineKey::from("42:a")));

    let view = updater.view();
    assert!(view.in_cart);
    assert!(view.visible);
}

#[test]
fn test_removed_line_forgets_key() {
    let updater = OptimisticUpdater::new(VARIANT, 0, None, true);
    let _quantity = updater.reconcile_with(&cart(1, "42:a"));

    let quantity = updater.reconcile_with(&Cart::default());

    assert_eq!(quantity, 0);
    assert_eq!(updater.line_key(), None);
    let view = updater.view();
    assert!(!view.in_cart);
    assert!(!view.visible);
}

#[test]
fn test_bulk_rows_stay_visible_at_zero() {
    let updater = OptimisticUpdater::new(VARIANT, 0, Some(5), false);

    let view = updater.view();
    assert!(view.visible);
    assert!(view.can_increment);
    assert!(!view.can_decrement);
}

#[test]
fn test_rollback_restores_confirmed_and_surfaces_error() {
    let updater = OptimisticUpdater::new(VARIANT, 2, None, true);
    let _displayed = updater.apply_optimistic(1);
    updater.set_busy(true);

    let err = CartError::from(ClientError::Rejected {
        status: 422,
        message: "sold out".to_owned(),
        description: None,
    });
    updater.rollback(&err);

    let view = updater.view();
    assert_eq!(view.quantity, 2);
    assert!(!view.busy);
    let error = view.error.expect("rollback should surface the error");
    assert_eq!(error.kind, ErrorKind::ServerRejection);
}

#[test]
fn test_next_optimistic_update_clears_error() {
    let updater = OptimisticUpdater::new(VARIANT, 2, None, true);
    updater.rollback(&CartError::from(ClientError::transport("offline")));
    assert!(updater.view().error.is_some());

    let _displayed = updater.apply_optimistic(1);
    assert!(updater.view().error.is_none());
}

#[test]
fn test_observe_while_pending_keeps_display() {
    let updater = OptimisticUpdater::new(VARIANT, 1, None, true);
    let _displayed = updater.apply_optimistic(1);

    updater.observe(&cart(4, "42:a"), true);
    assert_eq!(updater.displayed(), 2);
    assert_eq!(updater.confirmed(), 4);

    updater.observe(&cart(5, "42:a"), false);
    assert_eq!(updater.displayed(), 5);
}

#[test]
fn test_affordances_follow_bounds_and_busy() {
    let updater = OptimisticUpdater::new(VARIANT, 3, Some(3), true);

    let view = updater.view();
    assert!(!view.can_increment);
    assert!(view.can_decrement);

    updater.set_busy(true);
    let view = updater.view();
    assert!(!view.can_increment);
    assert!(!view.can_decrement);
}

#[test]
fn test_subscribers_see_latest_view() {
    let updater = OptimisticUpdater::new(VARIANT, 0, None, true);
    let mut receiver = updater.subscribe();

    let _displayed = updater.apply_optimistic(1);
    let _displayed = updater.apply_optimistic(1);

    assert!(receiver.has_changed().unwrap_or(false));
    assert_eq!(receiver.borrow_and_update().quantity, 2);
}

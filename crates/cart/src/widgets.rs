//! Widgets mounted against a [`CartContext`](crate::CartContext).
//!
//! Each widget subscribes to the event bus when it is mounted and releases
//! its subscription on teardown (or when dropped).

#[cfg(test)]
#[path = "tests/widgets.rs"]
mod tests;

mod count;
mod note;
mod quantity;

pub use count::CartCountBadge;
pub use note::CartNote;
pub use quantity::QuantityControl;

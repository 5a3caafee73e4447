use serde::{Deserialize, Serialize};

pub const DEFAULT_CART_READ: &str = "/cart.js";
pub const DEFAULT_CART_ADD: &str = "/cart/add.js";
pub const DEFAULT_CART_CHANGE: &str = "/cart/change.js";
pub const DEFAULT_CART_UPDATE: &str = "/cart/update.js";

/// Paths of the cart service endpoints, relative to the shop base url.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Routes {
    pub cart_read: String,
    pub cart_add: String,
    pub cart_change: String,
    pub cart_update: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            cart_read: DEFAULT_CART_READ.to_owned(),
            cart_add: DEFAULT_CART_ADD.to_owned(),
            cart_change: DEFAULT_CART_CHANGE.to_owned(),
            cart_update: DEFAULT_CART_UPDATE.to_owned(),
        }
    }
}

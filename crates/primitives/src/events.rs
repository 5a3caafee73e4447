use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, ProductId, VariantId};

/// Process-unique identifier of a mounted widget.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WidgetId(u64);

impl WidgetId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "widget-{}", self.0)
    }
}

/// What triggered a cart broadcast.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "kebab-case")]
pub enum EventSource {
    Widget(WidgetId),
    QuickAdd,
    BulkUpdate,
    Note,
    Merge,
    Refresh,
}

/// The part of the cart a change touched.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "camelCase")]
pub enum Affected {
    /// Specific lines, named by variant and by owning product.
    #[serde(rename_all = "camelCase")]
    Lines {
        variant_ids: Vec<VariantId>,
        product_ids: Vec<ProductId>,
    },
    /// Only the cart note.
    Note,
    /// Anything may have changed.
    Everything,
}

impl Affected {
    #[must_use]
    pub fn touches_variant(&self, variant_id: VariantId) -> bool {
        match self {
            Self::Lines { variant_ids, .. } => variant_ids.contains(&variant_id),
            Self::Note => false,
            Self::Everything => true,
        }
    }

    #[must_use]
    pub fn touches_product(&self, product_id: ProductId) -> bool {
        match self {
            Self::Lines { product_ids, .. } => product_ids.contains(&product_id),
            Self::Note => false,
            Self::Everything => true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartChanged {
    pub cart: Arc<Cart>,
    pub source: EventSource,
    pub affected: Affected,
    pub item_count: u32,
}

impl CartChanged {
    #[must_use]
    pub fn new(cart: Arc<Cart>, source: EventSource, affected: Affected) -> Self {
        let item_count = cart.item_count;

        Self {
            cart,
            source,
            affected,
            item_count,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Fetch,
    ServerRejection,
    InvalidIdentity,
    MissingLineReference,
    QuantityOutOfRange,
    Session,
}

/// Structured payload for UI-level error display.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartErrorEvent {
    pub source: EventSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "PascalCase")]
pub enum CartEvent {
    Changed(CartChanged),
    Error(CartErrorEvent),
}

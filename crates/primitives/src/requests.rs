#[cfg(test)]
#[path = "tests/requests.rs"]
mod tests;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cart::{CartLineItem, LineRef, VariantId};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AddItem {
    pub id: VariantId,
    pub quantity: u32,
}

impl From<&CartLineItem> for AddItem {
    fn from(item: &CartLineItem) -> Self {
        Self {
            id: item.variant_id,
            quantity: item.quantity,
        }
    }
}

/// Body of `POST cart-add`. Quantities add on top of existing lines.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AddRequest {
    pub items: Vec<AddItem>,
}

/// Body of `POST cart-change`. Sets one line's quantity; zero removes it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChangeRequest {
    pub id: LineRef,
    pub quantity: u32,
}

/// Body of `POST cart-update`: bulk variant quantities and/or the note.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct UpdateRequest {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub updates: BTreeMap<VariantId, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl UpdateRequest {
    #[must_use]
    pub fn quantities(updates: BTreeMap<VariantId, u32>) -> Self {
        Self {
            updates,
            note: None,
        }
    }

    #[must_use]
    pub fn note(note: String) -> Self {
        Self {
            updates: BTreeMap::new(),
            note: Some(note),
        }
    }

    #[must_use]
    pub fn variants(&self) -> Vec<VariantId> {
        self.updates.keys().copied().collect()
    }
}

/// Error body returned by the cart service alongside a non-success status.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
#[path = "tests/cart.rs"]
mod tests;

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a purchasable product variant.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct VariantId(u64);

impl VariantId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for VariantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Error)]
#[error("invalid variant id `{0}`")]
pub struct InvalidVariantId(String);

impl FromStr for VariantId {
    type Err = InvalidVariantId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|_| InvalidVariantId(s.to_owned()))
    }
}

/// Identifier of the product a variant belongs to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Server-assigned key of a single cart line.
///
/// A key is only meaningful while its line is present in a snapshot. Once the
/// line is removed (or merged) the key is dead and a fresh one has to be
/// observed before the line can be addressed by key again.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LineKey(String);

impl LineKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LineKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for LineKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Opaque cart identity token, carried as the `cart` cookie.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CartToken(String);

impl CartToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extracts the token from a cart id of the form `gid://<vendor>/Cart/<token>`.
    ///
    /// Everything after the first `Cart/` segment is the token, query string
    /// included.
    #[must_use]
    pub fn from_cart_id(cart_id: &str) -> Option<Self> {
        let (_, token) = cart_id.split_once("Cart/")?;

        (!token.is_empty()).then(|| Self(token.to_owned()))
    }
}

impl From<String> for CartToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for CartToken {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

impl fmt::Display for CartToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// How a mutation addresses a cart line.
///
/// Serializes untagged, so the cart service sees either the line key string
/// or the numeric variant id in the `id` field.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LineRef {
    Key(LineKey),
    Variant(VariantId),
}

impl fmt::Display for LineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key:{key}"),
            Self::Variant(variant) => write!(f, "variant:{variant}"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CartLineItem {
    pub key: LineKey,
    pub variant_id: VariantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    pub quantity: u32,
}

/// Immutable snapshot of the server-held cart.
///
/// Snapshots are replaced wholesale on every read or mutation response and
/// never patched in place.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Cart {
    #[serde(default)]
    pub token: CartToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub items: Vec<CartLineItem>,
    #[serde(default)]
    pub item_count: u32,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First line holding the given variant.
    #[must_use]
    pub fn line_for_variant(&self, variant_id: VariantId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.variant_id == variant_id)
    }

    #[must_use]
    pub fn line_by_key(&self, key: &LineKey) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.key == key)
    }

    /// Total quantity of a variant across all of its lines.
    #[must_use]
    pub fn quantity_of(&self, variant_id: VariantId) -> u32 {
        self.items
            .iter()
            .filter(|item| item.variant_id == variant_id)
            .map(|item| item.quantity)
            .sum()
    }

    /// Products owning any of the given variants in this snapshot.
    pub fn products_of<'a>(
        &'a self,
        variants: &'a [VariantId],
    ) -> impl Iterator<Item = ProductId> + 'a {
        self.items
            .iter()
            .filter(|item| variants.contains(&item.variant_id))
            .filter_map(|item| item.product_id)
    }
}

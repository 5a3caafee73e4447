use async_trait::async_trait;
use storefront_primitives::cart::{Cart, CartToken, LineRef};
use storefront_primitives::requests::{AddItem, UpdateRequest};

use crate::errors::ClientError;

/// The HTTP surface of the remote cart service.
///
/// Every mutating call answers with the complete new cart snapshot.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// `GET cart-read`
    async fn read(&self) -> Result<Cart, ClientError>;

    /// `POST cart-add`: quantities are added on top of existing lines.
    async fn add(&self, items: &[AddItem]) -> Result<Cart, ClientError>;

    /// `POST cart-change`: sets one line's quantity, zero removes it.
    async fn change(&self, line: &LineRef, quantity: u32) -> Result<Cart, ClientError>;

    /// `POST cart-update`: bulk variant quantities and/or note.
    async fn update(&self, request: &UpdateRequest) -> Result<Cart, ClientError>;

    /// Cart identity sent with every request.
    fn identity(&self) -> Option<CartToken>;

    /// Swaps the active cart identity, returning the previous one.
    ///
    /// Requests issued after this returns use the new identity.
    fn set_identity(&self, token: Option<CartToken>) -> Option<CartToken>;
}

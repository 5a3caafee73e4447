//! Typed cart service client

use async_trait::async_trait;
use storefront_primitives::cart::{Cart, CartToken, LineRef};
use storefront_primitives::requests::{AddItem, AddRequest, ChangeRequest, UpdateRequest};
use tracing::debug;
use url::Url;

use crate::connection::ConnectionInfo;
use crate::errors::ClientError;
use crate::traits::CartApi;

#[derive(Clone, Debug)]
pub struct CartClient {
    connection: ConnectionInfo,
}

impl CartClient {
    #[must_use]
    pub const fn new(connection: ConnectionInfo) -> Self {
        Self { connection }
    }

    pub const fn base_url(&self) -> &Url {
        &self.connection.base_url
    }

    pub const fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    fn observe(&self, cart: Cart) -> Cart {
        self.connection.adopt_identity(&cart.token);
        cart
    }
}

#[async_trait]
impl CartApi for CartClient {
    async fn read(&self) -> Result<Cart, ClientError> {
        let cart = self
            .connection
            .get(&self.connection.routes.cart_read)
            .await?;

        Ok(self.observe(cart))
    }

    async fn add(&self, items: &[AddItem]) -> Result<Cart, ClientError> {
        debug!(lines = items.len(), "Adding items to cart");

        let request = AddRequest {
            items: items.to_vec(),
        };

        let cart = self
            .connection
            .post(&self.connection.routes.cart_add, request)
            .await?;

        Ok(self.observe(cart))
    }

    async fn change(&self, line: &LineRef, quantity: u32) -> Result<Cart, ClientError> {
        debug!(%line, quantity, "Changing cart line");

        let request = ChangeRequest {
            id: line.clone(),
            quantity,
        };

        let cart = self
            .connection
            .post(&self.connection.routes.cart_change, request)
            .await?;

        Ok(self.observe(cart))
    }

    async fn update(&self, request: &UpdateRequest) -> Result<Cart, ClientError> {
        debug!(
            variants = request.updates.len(),
            note = request.note.is_some(),
            "Updating cart"
        );

        let cart = self
            .connection
            .post(&self.connection.routes.cart_update, request)
            .await?;

        Ok(self.observe(cart))
    }

    fn identity(&self) -> Option<CartToken> {
        self.connection.identity()
    }

    fn set_identity(&self, token: Option<CartToken>) -> Option<CartToken> {
        self.connection.set_identity(token)
    }
}

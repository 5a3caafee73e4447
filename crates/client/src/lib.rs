//! HTTP client for the remote cart service.
//!
//! The service is reachable only through four endpoints (read, add, change,
//! update). [`CartApi`] abstracts them so the reconciliation core can run
//! against the real service ([`CartClient`]) or an in-process double.
//!
//! ```rust,ignore
//! use storefront_client::{CartApi, CartClient, ConnectionInfo, Routes};
//!
//! let connection = ConnectionInfo::new("https://shop.example".parse()?, Routes::default());
//! let client = CartClient::new(connection);
//!
//! let cart = client.read().await?;
//! println!("{} items", cart.item_count);
//! ```

pub mod client;
pub mod connection;
pub mod errors;
pub mod routes;
pub mod traits;

pub use client::CartClient;
pub use connection::ConnectionInfo;
pub use errors::ClientError;
pub use routes::Routes;
pub use traits::CartApi;
pub use url::Url;

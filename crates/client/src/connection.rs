//! Connection management for the cart service
//!
//! Holds the base url, the endpoint routes and the active cart identity, and
//! performs the JSON requests the typed client is built on.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use storefront_primitives::cart::CartToken;
use storefront_primitives::requests::ErrorBody;
use tracing::{debug, trace};
use url::Url;

use crate::errors::ClientError;
use crate::routes::Routes;

/// Name of the cookie carrying the cart identity.
pub const CART_COOKIE: &str = "cart";

#[derive(Debug, Clone, Copy)]
enum RequestType {
    Get,
    Post,
}

#[derive(Clone, Debug)]
pub struct ConnectionInfo {
    pub base_url: Url,
    pub client: Client,
    pub routes: Routes,
    identity: Arc<RwLock<Option<CartToken>>>,
}

impl ConnectionInfo {
    #[must_use]
    pub fn new(base_url: Url, routes: Routes) -> Self {
        Self::with_client(base_url, routes, Client::new())
    }

    #[must_use]
    pub fn with_client(base_url: Url, routes: Routes, client: Client) -> Self {
        Self {
            base_url,
            client,
            routes,
            identity: Arc::new(RwLock::new(None)),
        }
    }

    pub fn identity(&self) -> Option<CartToken> {
        self.identity.read().clone()
    }

    pub fn set_identity(&self, token: Option<CartToken>) -> Option<CartToken> {
        let mut identity = self.identity.write();

        core::mem::replace(&mut *identity, token)
    }

    /// Adopts `token` only when no identity has been established yet.
    pub fn adopt_identity(&self, token: &CartToken) {
        if token.is_empty() {
            return;
        }

        let mut identity = self.identity.write();

        if identity.is_none() {
            debug!(%token, "Adopting cart identity from snapshot");
            *identity = Some(token.clone());
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.request(RequestType::Get, path, None::<()>).await
    }

    pub async fn post<I, O>(&self, path: &str, body: I) -> Result<O, ClientError>
    where
        I: Serialize + Send,
        O: DeserializeOwned,
    {
        self.request(RequestType::Post, path, Some(body)).await
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url.join(path).map_err(Into::into)
    }

    async fn request<I, O>(
        &self,
        req_type: RequestType,
        path: &str,
        body: Option<I>,
    ) -> Result<O, ClientError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let url = self.url(path)?;

        // snapshot the identity so a concurrent swap can't split one request
        let cookie = self
            .identity()
            .map(|token| format!("{CART_COOKIE}={token}"));

        let mut builder = match req_type {
            RequestType::Get => self.client.get(url),
            RequestType::Post => self.client.post(url).json(&body),
        };

        builder = builder.header(ACCEPT, "application/json");

        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }

        trace!(?req_type, path, "Sending cart request");

        let response = builder.send().await?;

        Self::check_status(response)
            .await?
            .json::<O>()
            .await
            .map_err(Into::into)
    }

    async fn check_status(response: Response) -> Result<Response, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();

        if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
            return Err(ClientError::Rejected {
                status: body.status.unwrap_or_else(|| status.as_u16()),
                message: body.message,
                description: body.description,
            });
        }

        if status.is_client_error() {
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message: text,
                description: None,
            });
        }

        Err(ClientError::Transport {
            status: Some(status.as_u16()),
            message: format!("request failed with status: {status}"),
        })
    }
}

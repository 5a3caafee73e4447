use storefront_client::ClientError;
use storefront_primitives::cart::LineRef;
use storefront_primitives::events::ErrorKind;
use thiserror::Error as ThisError;

use crate::session::SessionStoreError;

/// Reading the cart snapshot failed.
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("failed to fetch cart: {source}")]
pub struct FetchError {
    #[from]
    pub source: ClientError,
}

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[non_exhaustive]
pub enum CartError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("cart service rejected the change ({status}): {message}")]
    ServerRejection {
        status: u16,
        message: String,
        description: Option<String>,
    },

    /// Response to a request that was cancelled or superseded. Never shown.
    #[error("response superseded by a newer request")]
    StaleResponse,

    #[error("cart identity did not resolve to a valid cart: {reason}")]
    InvalidIdentity { reason: String },

    #[error("no line for {line} in the last known cart")]
    MissingLineReference { line: LineRef },

    #[error("quantity {requested} is above the maximum of {max}")]
    QuantityOutOfRange { requested: u32, max: u32 },

    #[error("session storage failed: {0}")]
    Session(String),
}

impl CartError {
    /// Kind reported on the error channel; `None` for errors that never surface.
    #[must_use]
    pub const fn kind(&self) -> Option<ErrorKind> {
        Some(match self {
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::ServerRejection { .. } => ErrorKind::ServerRejection,
            Self::StaleResponse => return None,
            Self::InvalidIdentity { .. } => ErrorKind::InvalidIdentity,
            Self::MissingLineReference { .. } => ErrorKind::MissingLineReference,
            Self::QuantityOutOfRange { .. } => ErrorKind::QuantityOutOfRange,
            Self::Session(_) => ErrorKind::Session,
        })
    }
}

impl From<ClientError> for CartError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Rejected {
                status,
                message,
                description,
            } => Self::ServerRejection {
                status,
                message,
                description,
            },
            err => Self::Fetch(FetchError { source: err }),
        }
    }
}

impl From<SessionStoreError> for CartError {
    fn from(err: SessionStoreError) -> Self {
        Self::Session(err.to_string())
    }
}

use thiserror::Error as ThisError;

/// Failure talking to the cart service.
///
/// Cloneable so one result can be handed to every caller awaiting a shared
/// request.
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[non_exhaustive]
pub enum ClientError {
    /// The request never produced a usable response.
    #[error("transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The service answered with a well-formed error.
    #[error("cart service rejected the request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        description: Option<String>,
    },

    /// The service answered with a body that is not a cart.
    #[error("malformed cart response: {0}")]
    Decode(String),

    #[error("invalid endpoint url: {0}")]
    Url(String),
}

impl ClientError {
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Rejected { status, .. } => Some(*status),
            Self::Decode(_) | Self::Url(_) => None,
        }
    }

    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }

        Self::Transport {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::Url(err.to_string())
    }
}

//! Error types surfaced by the server client and the session controller.

/// A failed call against the listen-along server.
///
/// Payloads are plain strings so the error can be cloned into UI messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, ...).
    #[error("failed to connect to server: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A 2xx response whose body could not be parsed.
    #[error("malformed server response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the server could not be reached or did not answer sensibly.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }

    /// Message for a generic non-2xx response without a usable body.
    pub fn generic_status_message(status: u16) -> String {
        format!("Request failed with status {}", status)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// A listen-along toggle the server did not confirm.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("could not start listening along: {0}")]
    Start(#[source] ApiError),

    #[error("could not stop listening: {0}")]
    Stop(#[source] ApiError),

    /// Switching targets failed. `restored` tells whether the previous
    /// session is still running on the server.
    #[error("could not switch to {to}: {source}")]
    Switch {
        to: String,
        #[source]
        source: ApiError,
        restored: bool,
    },
}

impl SessionError {
    pub fn api_error(&self) -> &ApiError {
        match self {
            Self::Start(e) | Self::Stop(e) => e,
            Self::Switch { source, .. } => source,
        }
    }
}

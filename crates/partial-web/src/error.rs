//! Error types for partial_web

use partial_core::PartialError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebError {
    /// Misuse of the callback layer (registration, lifecycle, state)
    #[error(transparent)]
    Core(#[from] PartialError),

    /// A callback render was requested on a full page request
    #[error("request is not a callback")]
    NoCallbackTarget,

    /// A widget identity equals an id derived from another widget's items or
    /// marker
    #[error("widget '{id}' collides with an id derived from widget '{owner}'")]
    IdentityCollision { id: String, owner: String },

    /// A callback or postback named a widget the page does not contain
    #[error("no widget '{0}' on this page")]
    UnknownTarget(String),

    /// The submitted event payload could not be applied
    #[error("invalid payload for '{target}': {message}")]
    InvalidPayload { target: String, message: String },

    /// A page callback handler rejected the event
    #[error("callback handler failed: {0}")]
    Handler(String),
}

impl WebError {
    /// Errors caused by what the client sent rather than by page code.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            WebError::UnknownTarget(_) | WebError::InvalidPayload { .. } | WebError::Handler(_)
        ) || matches!(
            self,
            WebError::Core(PartialError::State(_) | PartialError::TamperedState)
        )
    }
}

/// Result type for partial_web operations
pub type Result<T> = std::result::Result<T, WebError>;

//! Error types for partial_core

use crate::identity::WidgetId;
use crate::lifecycle::Phase;
use thiserror::Error;

/// Programming and decoding errors raised by the callback layer.
///
/// Missing configuration is never an error; every optional attribute has a
/// default. What remains are misuses that would corrupt the identity to
/// fragment mapping, so they fail fast.
#[derive(Error, Debug)]
pub enum PartialError {
    /// Identity was empty
    #[error("widget identity must not be empty")]
    EmptyIdentity,

    /// Identity contains characters that cannot appear in a marker id
    #[error("widget identity {0:?} may only contain ASCII letters, digits, '_', '-', '$' or ':'")]
    InvalidIdentity(String),

    /// The same identity was registered twice in one request
    #[error("widget '{0}' was registered twice in the same request")]
    DuplicateRegistration(WidgetId),

    /// A widget was rendered or captured without being registered
    #[error("widget '{0}' was rendered before it was registered")]
    NotRegistered(WidgetId),

    /// A lifecycle step was called out of order
    #[error("widget '{id}' cannot {action} while {phase}")]
    Lifecycle {
        id: WidgetId,
        action: &'static str,
        phase: Phase,
    },

    /// A client hook is not a single JavaScript expression
    #[error("widget '{id}': {field} {value:?} is not a single client expression")]
    InvalidHook {
        id: WidgetId,
        field: &'static str,
        value: String,
    },

    /// A state key with no bytes
    #[error("state key must not be empty")]
    EmptyStateKey,

    /// Posted page state was not sealed by this server or was edited
    #[error("page state failed its integrity check")]
    TamperedState,

    /// Persisted page state could not be encoded or decoded
    #[error("page state: {0}")]
    State(#[from] serde_json::Error),
}

/// Result type for partial_core operations
pub type Result<T> = std::result::Result<T, PartialError>;

//! Error types for the plugin layer.
//!
//! Absence of a capability is not an error here. Callers ask
//! [`Action::is_supported_on`](crate::Action::is_supported_on) first; these
//! variants cover operations that were attempted and failed.

/// Errors raised by entries, the action registry and the exec protocol.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The entry does not provide the contract the operation needs.
    #[error("{action} is not supported on {entry}")]
    NotSupported { entry: String, action: String },

    /// The operation's context was cancelled before it finished.
    #[error("operation cancelled")]
    Cancelled,

    /// An action name was registered twice.
    #[error("action {0:?} is already registered")]
    DuplicateAction(String),

    /// The process-wide registry was initialized more than once.
    #[error("the action registry is already initialized")]
    RegistryInitialized,

    /// Exec protocol failure (producer vanished, process killed by a signal...).
    #[error("exec error: {message}")]
    Exec { message: String },

    /// A failure reported by a backend.
    #[error("{message}")]
    Backend { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_supported(entry: impl Into<String>, action: impl Into<String>) -> Self {
        Error::NotSupported {
            entry: entry.into(),
            action: action.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend {
            message: message.into(),
        }
    }

    pub fn exec(message: impl Into<String>) -> Self {
        Error::Exec {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn not_supported_display_names_entry_and_action() {
        let e = Error::not_supported("web-1", "exec");
        assert_eq!(e.to_string(), "exec is not supported on web-1");
    }

    #[test]
    fn duplicate_action_display() {
        let e = Error::DuplicateAction("list".to_string());
        assert!(e.to_string().contains("\"list\""));
    }

    #[test]
    fn io_error_converts_and_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(StdError::source(&e).is_some());
    }

    #[test]
    fn cancelled_is_detected() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::backend("boom").is_cancelled());
    }
}

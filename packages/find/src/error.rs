//! Error types for query compilation and traversal.

/// Whether a parser rejected its input outright or recognized it and
/// found it malformed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The input isn't for this parser. Alternatives may be tried.
    Mismatch,
    /// The input is for this parser but is malformed. Compilation stops.
    Syntax,
}

/// A parse failure with the index of the offending token.
///
/// `position` is relative to the token slice the failing parser was given;
/// callers that hand out sub-slices rebase it with [`ParseError::shifted`].
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn mismatch(message: impl Into<String>) -> Self {
        Self {
            kind: ParseErrorKind::Mismatch,
            message: message.into(),
            position: 0,
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self {
            kind: ParseErrorKind::Syntax,
            message: message.into(),
            position: 0,
        }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// Rebase onto a slice that starts `offset` tokens earlier.
    pub fn shifted(mut self, offset: usize) -> Self {
        self.position += offset;
        self
    }

    /// Turn a mismatch into a syntax error. Used once a caller has
    /// committed to this parser and there is nothing else to try.
    pub fn committed(mut self) -> Self {
        self.kind = ParseErrorKind::Syntax;
        self
    }

    pub fn is_mismatch(&self) -> bool {
        self.kind == ParseErrorKind::Mismatch
    }
}

/// Errors at the query layer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid expression at token {}: {}", .0.position + 1, .0.message)]
    Parse(#[from] ParseError),

    #[error("invalid config: {message}")]
    Config { message: String },

    #[error("invalid config: {0}")]
    ConfigFormat(#[from] serde_json::Error),

    #[error(transparent)]
    Plugin(#[from] entryfs_plugin::Error),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Plugin(e) if e.is_cancelled())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_rebases_position() {
        let e = ParseError::syntax("bad").at(1).shifted(3);
        assert_eq!(e.position, 4);
        assert_eq!(e.to_string(), "bad");
    }

    #[test]
    fn committed_mismatch_becomes_syntax() {
        let e = ParseError::mismatch("expected a duration");
        assert!(e.is_mismatch());
        assert!(!e.committed().is_mismatch());
    }

    #[test]
    fn parse_error_display_is_one_based() {
        let e: Error = ParseError::syntax("expected a closing brace").at(2).into();
        assert_eq!(
            e.to_string(),
            "invalid expression at token 3: expected a closing brace"
        );
    }

    #[test]
    fn plugin_errors_pass_through() {
        let e: Error = entryfs_plugin::Error::Cancelled.into();
        assert_eq!(e.to_string(), "operation cancelled");
        assert!(e.is_cancelled());
    }
}

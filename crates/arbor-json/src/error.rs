//! Error types for arbor-json operations

/// Result type alias for pool and configuration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for arbor-json operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Parsing failed; carries the position of the offending character
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The value pool could not grow
    #[error("Memory allocation failed: {0}")]
    Memory(String),

    /// Invalid parser or pool configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a memory error
    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Position of the failure when this is a parse error
    pub fn position(&self) -> Option<(u32, u32)> {
        match self {
            Error::Parse(err) => Some((err.line, err.column)),
            _ => None,
        }
    }
}

/// A parse failure with the 1-based position of the offending character
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, column {column}: {kind}")]
pub struct ParseError {
    /// What went wrong
    pub kind: ParseErrorKind,
    /// 1-based line number
    pub line: u32,
    /// 1-based column, counted in characters
    pub column: u32,
}

/// Classification of parse failures
///
/// Lexical, grammar, limit and allocation failures all share the same
/// "position + message" shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error("unexpected character")]
    UnexpectedCharacter,

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("invalid literal")]
    InvalidLiteral,

    #[error("invalid number")]
    InvalidNumber,

    #[error("unterminated string")]
    UnterminatedString,

    #[error("control character in string")]
    ControlCharacter,

    #[error("invalid escape sequence")]
    InvalidEscape,

    #[error("invalid unicode escape")]
    InvalidUnicodeEscape,

    #[error("unterminated surrogate pair")]
    UnterminatedSurrogatePair,

    #[error("invalid surrogate pair")]
    InvalidSurrogatePair,

    #[error("unpaired low surrogate")]
    UnpairedLowSurrogate,

    #[error("object key must be string")]
    ExpectedKey,

    #[error("expected colon after key")]
    ExpectedColon,

    #[error("expected comma or closing bracket")]
    ExpectedCommaOrBracket,

    #[error("expected comma or closing brace")]
    ExpectedCommaOrBrace,

    #[error("duplicate object key \"{0}\"")]
    DuplicateKey(String),

    #[error("unexpected trailing data")]
    TrailingData,

    #[error("invalid UTF-8 in input")]
    InvalidUtf8,

    #[error("nesting depth exceeds maximum of {max}")]
    DepthLimitExceeded { max: usize },

    #[error("input size {size} exceeds maximum of {max} bytes")]
    InputTooLarge { size: usize, max: usize },

    #[error("string length exceeds maximum of {max} bytes")]
    StringTooLong { max: usize },

    #[error("array length exceeds maximum of {max} elements")]
    ArrayTooLong { max: usize },

    #[error("object key count exceeds maximum of {max}")]
    TooManyKeys { max: usize },

    #[error("value allocation failed: {0}")]
    AllocationFailed(String),
}

impl ParseError {
    /// Create a parse error at the given position
    pub fn new(kind: ParseErrorKind, line: u32, column: u32) -> Self {
        Self { kind, line, column }
    }

    /// Copy the formatted message into a caller-supplied buffer.
    ///
    /// The message is truncated on a character boundary so the written bytes
    /// stay valid UTF-8, and a terminating NUL is always written when the
    /// buffer is non-empty. Returns the number of message bytes written,
    /// excluding the terminator.
    pub fn write_message(&self, buffer: &mut [u8]) -> usize {
        let Some(room) = buffer.len().checked_sub(1) else {
            return 0;
        };
        let message = self.to_string();
        let mut end = message.len().min(room);
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        buffer[..end].copy_from_slice(&message.as_bytes()[..end]);
        buffer[end] = 0;
        end
    }

    /// Whether this failure came from a configured limit rather than bad syntax
    pub fn is_limit(&self) -> bool {
        matches!(
            self.kind,
            ParseErrorKind::DepthLimitExceeded { .. }
                | ParseErrorKind::InputTooLarge { .. }
                | ParseErrorKind::StringTooLong { .. }
                | ParseErrorKind::ArrayTooLong { .. }
                | ParseErrorKind::TooManyKeys { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(ParseErrorKind::TrailingData, 3, 7);
        assert_eq!(err.to_string(), "line 3, column 7: unexpected trailing data");
    }

    #[test]
    fn test_write_message_fits() {
        let err = ParseError::new(ParseErrorKind::InvalidLiteral, 1, 2);
        let mut buffer = [0xAAu8; 64];
        let written = err.write_message(&mut buffer);
        assert_eq!(&buffer[..written], b"line 1, column 2: invalid literal");
        assert_eq!(buffer[written], 0);
    }

    #[test]
    fn test_write_message_truncates_and_terminates() {
        let err = ParseError::new(ParseErrorKind::InvalidLiteral, 1, 2);
        let mut buffer = [0xAAu8; 8];
        let written = err.write_message(&mut buffer);
        assert_eq!(written, 7);
        assert_eq!(&buffer[..7], b"line 1,");
        assert_eq!(buffer[7], 0);
    }

    #[test]
    fn test_write_message_respects_char_boundaries() {
        let err = ParseError::new(ParseErrorKind::DuplicateKey("ßß".to_string()), 1, 1);
        let message = err.to_string();
        let quote = message.find('"').unwrap();
        // Room for the opening quote plus one and a half characters
        let mut buffer = vec![0u8; quote + 1 + 3 + 1];
        let written = err.write_message(&mut buffer);
        assert!(std::str::from_utf8(&buffer[..written]).is_ok());
        assert_eq!(written, quote + 1 + 2);
    }

    #[test]
    fn test_write_message_empty_buffer() {
        let err = ParseError::new(ParseErrorKind::InvalidNumber, 1, 1);
        assert_eq!(err.write_message(&mut []), 0);
    }

    #[test]
    fn test_error_from_parse_error_keeps_position() {
        let err: Error = ParseError::new(ParseErrorKind::ExpectedColon, 4, 9).into();
        assert_eq!(err.position(), Some((4, 9)));
        assert_eq!(Error::memory("boom").position(), None);
    }

    #[test]
    fn test_limit_classification() {
        assert!(ParseError::new(ParseErrorKind::DepthLimitExceeded { max: 2 }, 1, 1).is_limit());
        assert!(!ParseError::new(ParseErrorKind::TrailingData, 1, 1).is_limit());
    }
}

// ABOUTME: Error types for content extraction including ErrorKind and ExtractError.
// ABOUTME: Provides categorized errors with convenience constructors and boolean helpers.

use std::fmt;

/// Categories of extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure, timeout or non-success HTTP status.
    Transport,
    /// The document or URL could not be parsed.
    Parse,
    /// No content container matched.
    NotFound,
    /// The URL is outside the extractor's allowed prefixes, or blocked.
    Excluded,
    /// The extractor cannot handle this input shape.
    UnsupportedInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Transport => "transport error",
            ErrorKind::Parse => "parse error",
            ErrorKind::NotFound => "content not found",
            ErrorKind::Excluded => "excluded URL",
            ErrorKind::UnsupportedInput => "unsupported input",
        };
        write!(f, "{}", s)
    }
}

/// The error type for extraction operations.
#[derive(Debug, thiserror::Error)]
pub struct ExtractError {
    pub kind: ErrorKind,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "extract: {} {}: {}", self.op, self.url, self.kind)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ExtractError {
    pub fn new(
        kind: ErrorKind,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            kind,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    /// Create a Transport error.
    pub fn transport(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::Transport, url, op, source)
    }

    /// Create a Parse error.
    pub fn parse(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::Parse, url, op, source)
    }

    /// Create a NotFound error.
    pub fn not_found(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::NotFound, url, op, source)
    }

    /// Create an Excluded error.
    pub fn excluded(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::Excluded, url, op, source)
    }

    /// Create an UnsupportedInput error.
    pub fn unsupported_input(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::UnsupportedInput, url, op, source)
    }

    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }

    pub fn is_parse(&self) -> bool {
        self.kind == ErrorKind::Parse
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_excluded(&self) -> bool {
        self.kind == ErrorKind::Excluded
    }

    pub fn is_unsupported_input(&self) -> bool {
        self.kind == ErrorKind::UnsupportedInput
    }

    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.is_transport()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_op_url_kind_and_source() {
        let err = ExtractError::not_found(
            "https://example.com/a",
            "Extract",
            Some(anyhow::anyhow!("no content container matched")),
        );
        assert_eq!(
            err.to_string(),
            "extract: Extract https://example.com/a: content not found: no content container matched"
        );
    }

    #[test]
    fn only_transport_is_retryable() {
        assert!(ExtractError::transport("u", "Fetch", None).is_retryable());
        for err in [
            ExtractError::parse("u", "Extract", None),
            ExtractError::not_found("u", "Extract", None),
            ExtractError::excluded("u", "Extract", None),
            ExtractError::unsupported_input("u", "Extract", None),
        ] {
            assert!(!err.is_retryable(), "{err}");
        }
    }
}

//! Error types with rich diagnostics using miette
//!
//! Every failure a command can hit is a [`PluginError`]. Hosts only ever
//! need the coarse [`ErrorKind`] to decide how to close the run; the
//! variants keep enough detail for the log.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Source context for error reporting
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Name of the source (filename or "<input>")
    pub name: String,
    /// The full source text
    pub source: String,
}

impl SourceContext {
    /// Create a new source context
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Create a NamedSource for miette
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.source.clone())
    }

    /// Byte offset of a 1-based line/column pair, as reported by serde_json.
    pub fn offset_of(&self, line: usize, column: usize) -> usize {
        let line_start: usize = self
            .source
            .split_inclusive('\n')
            .take(line.saturating_sub(1))
            .map(str::len)
            .sum();
        (line_start + column.saturating_sub(1)).min(self.source.len())
    }

    /// Wrap a serde_json failure so miette can point at the offending byte.
    pub fn json_error(&self, err: &serde_json::Error) -> PluginError {
        let offset = self.offset_of(err.line(), err.column());
        PluginError::Json {
            message: err.to_string(),
            src: self.named_source(),
            span: SourceSpan::from((offset, 0)),
        }
    }
}

/// Coarse error taxonomy surfaced at the command boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required command input was absent; nothing ran.
    MissingParameter,
    /// A named scalar node could not be prepared for mutation.
    ResourceUnavailable,
    /// Requested image dimensions are too large or not numbers.
    DimensionOutOfRange,
    /// The delegation channel received a payload of the wrong shape.
    ProtocolMismatch,
    /// Anything else.
    Unclassified,
}

impl ErrorKind {
    /// Whether the run ends with the error's own message instead of the
    /// generic failure line.
    pub fn is_abort(self) -> bool {
        matches!(self, ErrorKind::MissingParameter | ErrorKind::DimensionOutOfRange)
    }
}

// ============================================================================
// Plugin Errors
// ============================================================================

/// Errors raised while running a plugin command
#[derive(Error, Diagnostic, Debug)]
pub enum PluginError {
    #[error("{message}")]
    #[diagnostic(code(spiralgen::params::missing))]
    MissingParameter { name: String, message: String },

    #[error("parameter `{name}` is not a valid {expected}: {value:?}")]
    #[diagnostic(code(spiralgen::params::invalid))]
    InvalidParameter {
        name: String,
        expected: &'static str,
        value: String,
    },

    #[error("Unknown command")]
    #[diagnostic(code(spiralgen::commands::unknown))]
    UnknownCommand { name: String },

    #[error("Cannot prepare {resource}: {reason}")]
    #[diagnostic(
        code(spiralgen::document::unavailable),
        help("text nodes need a single font the host can load before they can be edited")
    )]
    ResourceUnavailable { resource: String, reason: String },

    #[error("node {id} does not exist")]
    #[diagnostic(code(spiralgen::document::missing_node))]
    MissingNode { id: u64 },

    #[error("{message}")]
    #[diagnostic(code(spiralgen::image::dimensions))]
    DimensionOutOfRange { message: String },

    #[error("Expected image bytes from the sandbox, got {got}")]
    #[diagnostic(code(spiralgen::delegate::protocol_mismatch))]
    ProtocolMismatch { got: String },

    #[error("sandbox did not answer request {id} within {millis} ms")]
    #[diagnostic(code(spiralgen::delegate::timeout))]
    TransformTimeout { id: u64, millis: u64 },

    #[error("sandbox closed before answering request {id}")]
    #[diagnostic(code(spiralgen::delegate::closed))]
    SandboxClosed { id: u64 },

    #[error("fetching {url} failed: {reason}")]
    #[diagnostic(code(spiralgen::fetch::failed))]
    Fetch { url: String, reason: String },

    #[error("could not decode image: {0}")]
    #[diagnostic(code(spiralgen::image::decode))]
    Decode(#[from] image::ImageError),

    #[error("invalid JSON: {message}")]
    #[diagnostic(code(spiralgen::json))]
    Json {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("{0}")]
    #[diagnostic(code(spiralgen::unclassified))]
    Other(String),
}

impl PluginError {
    pub fn missing(name: impl Into<String>, message: impl Into<String>) -> Self {
        PluginError::MissingParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        PluginError::ResourceUnavailable {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PluginError::MissingParameter { .. } | PluginError::InvalidParameter { .. } => {
                ErrorKind::MissingParameter
            }
            PluginError::ResourceUnavailable { .. } => ErrorKind::ResourceUnavailable,
            PluginError::DimensionOutOfRange { .. } => ErrorKind::DimensionOutOfRange,
            PluginError::ProtocolMismatch { .. } => ErrorKind::ProtocolMismatch,
            PluginError::UnknownCommand { .. }
            | PluginError::MissingNode { .. }
            | PluginError::TransformTimeout { .. }
            | PluginError::SandboxClosed { .. }
            | PluginError::Fetch { .. }
            | PluginError::Decode(_)
            | PluginError::Json { .. }
            | PluginError::Other(_) => ErrorKind::Unclassified,
        }
    }
}

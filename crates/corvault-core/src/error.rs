//! Error taxonomy for a collection cycle.
//!
//! Every stage of the pipeline reports its own variant so a failed scrape says
//! which command, record and field broke instead of a bare parse failure.

use crate::catalog::Category;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The session could not run a command, or the command reported failure.
    #[error("transport error running `{command}`: {message}")]
    Transport { command: String, message: String },

    /// Nothing that looks like a payload survived framing.
    #[error("{category} output framing failed: {reason}")]
    Framing { category: Category, reason: String },

    /// After skipping the banner the text does not open a JSON object, so the
    /// banner length no longer matches the configured header count.
    #[error(
        "{category} output does not start with a JSON object after skipping {header_lines} \
         header lines (first line: {first_line:?}); CLI banner format may have changed"
    )]
    SchemaDrift {
        category: Category,
        header_lines: usize,
        first_line: String,
    },

    /// JSON syntax errors, a missing top-level key, or malformed records.
    #[error("{category} payload parse error: {reason}")]
    Parse { category: Category, reason: String },

    /// A record field required by the catalog is missing or not numeric.
    #[error("{category} record {index} (durable-id {id:?}): field `{field}` {reason}")]
    Conversion {
        category: Category,
        index: usize,
        id: String,
        field: &'static str,
        reason: String,
    },
}

impl CollectError {
    pub fn transport(command: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            command: command.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn parse(category: Category, reason: impl Into<String>) -> Self {
        Self::Parse {
            category,
            reason: reason.into(),
        }
    }

    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Framing { .. } => "framing",
            Self::SchemaDrift { .. } => "schema_drift",
            Self::Parse { .. } => "parse",
            Self::Conversion { .. } => "conversion",
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectError>;

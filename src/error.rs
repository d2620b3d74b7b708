//! Load failure taxonomy and non-fatal diagnostics.

use std::fmt;

use thiserror::Error;

/// Fatal load failures. The graph is left with buffer cooking disabled and
/// the last successfully installed artifacts intact.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The external fetch collaborator failed (network, deserialization).
    /// Nothing was mutated; prior state is retained.
    #[error("shader fetch failed: {0:#}")]
    Fetch(anyhow::Error),
    /// The descriptor violates the required shape (missing image pass,
    /// out-of-range or duplicate channel index, duplicate buffer name).
    #[error("descriptor shape invalid: {0}")]
    Shape(String),
}

/// Non-fatal conditions recorded during a load. These never stop the load;
/// they are returned in the summary and logged as warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Buffer pass whose name matches none of the canonical identifiers.
    /// The pass is skipped; the rest of the descriptor loads normally.
    UnresolvedBufferName { name: String },
    /// Channel content type not in the closed enumeration; treated as a
    /// flat 2D texture.
    UnknownContentType { channel: u32, ctype: String },
    /// Pass role this pipeline does not render (e.g. sound).
    UnsupportedPassRole { name: String },
    /// More than one common pass; only the first is installed.
    DuplicateCommonPass { name: String },
}

impl Diagnostic {
    pub(crate) fn record(self, out: &mut Vec<Diagnostic>) {
        log::warn!("{self}");
        out.push(self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnresolvedBufferName { name } => {
                write!(f, "buffer pass '{name}' matches no canonical buffer slot, skipping")
            }
            Diagnostic::UnknownContentType { channel, ctype } => {
                write!(f, "channel {channel} has unknown content type '{ctype}', treating as 2D texture")
            }
            Diagnostic::UnsupportedPassRole { name } => {
                write!(f, "pass '{name}' has an unsupported role, skipping")
            }
            Diagnostic::DuplicateCommonPass { name } => {
                write!(f, "extra common pass '{name}' ignored, keeping the first")
            }
        }
    }
}

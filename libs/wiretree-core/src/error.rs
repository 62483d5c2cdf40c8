use std::fmt;

/// Errors raised while reading or writing a [`crate::tree::Node`] tree.
///
/// Mirrors the three ways a scalar access or member lookup can fail:
/// the name isn't there, the stored value can't be reinterpreted as the
/// requested type, or it can but doesn't fit.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TreeError {
    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("value out of range: {0}")]
    Range(String),
}

impl TreeError {
    pub fn conversion(msg: impl Into<String>) -> Self {
        TreeError::Conversion(msg.into())
    }

    pub fn range(msg: impl Into<String>) -> Self {
        TreeError::Range(msg.into())
    }
}

/// Error type threaded through [`crate::traits::Formatter`] and
/// [`crate::traits::Decomposer`].
///
/// A type alias rather than a dedicated enum: formatters live in other
/// crates (wiretree-binary, wiretree-json) and each has its own concrete
/// error type, so the shared trait boundary just needs *some* boxed
/// `std::error::Error`. Using `Box<dyn Error + Send + Sync>` directly means
/// `?` works out of the box via the standard library's own blanket `From`
/// impl for boxed trait objects — no coherence games needed here.
pub type FormatError = Box<dyn std::error::Error + Send + Sync>;

/// Adapter so a plain string can be used as a [`FormatError`] without
/// pulling in a one-off error type at every call site.
#[derive(Debug)]
pub struct Message(pub String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

pub fn format_error(msg: impl Into<String>) -> FormatError {
    Box::new(Message(msg.into()))
}

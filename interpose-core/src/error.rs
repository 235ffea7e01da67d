//! Error types for the interception engine

use thiserror::Error;

/// Errors raised by proxies, interceptors and the fluent API
#[derive(Debug, Error)]
pub enum InterceptError {
    /// The member did not exist when the proxy was constructed
    #[error("member `{member}` is not part of this proxy")]
    UnknownMember { member: String },

    /// A call was attempted on a data member
    #[error("member `{member}` is not callable")]
    NotCallable { member: String },

    /// A proxy or path step needs an object or array
    #[error("expected an object or array, found {found}")]
    NotAnObject { found: &'static str },

    /// A fluent capability was requested for the wrong kind of member
    #[error("`{capability}` is not available for member `{member}`")]
    SelectorMismatch {
        member: String,
        capability: &'static str,
    },

    /// Failure raised by an interceptor or an intercepted function
    #[error("interceptor failed: {0}")]
    Interceptor(String),

    /// Arbitrary error raised by user code
    #[error(transparent)]
    Custom(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl InterceptError {
    /// Shorthand for an interceptor failure with a message
    pub fn interceptor(message: impl Into<String>) -> Self {
        Self::Interceptor(message.into())
    }

    pub(crate) fn unknown_member(member: &str) -> Self {
        Self::UnknownMember {
            member: member.to_string(),
        }
    }
}

/// Result type using InterceptError
pub type Result<T> = std::result::Result<T, InterceptError>;

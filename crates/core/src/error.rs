//! Error types for the core crate.

use thiserror::Error;

use crate::codec::ResolverVersion;

/// Core error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Record does not parse under the grammar of the detected resolver version.
    #[error("Malformed definition: {0}")]
    MalformedDefinition(String),

    /// The target resolver version has no place for a field the caller supplied.
    #[error("Field '{field}' is not supported by {version} resolvers")]
    UnsupportedField {
        /// Name of the rejected field.
        field: &'static str,
        /// Resolver version that lacks the field.
        version: ResolverVersion,
    },

    /// Invalid domain name.
    #[error("Invalid domain name: {0:?}")]
    InvalidDomainName(String),

    /// Enrolment precondition rejected by a validating policy.
    #[error("Invalid enrolment precondition: {0}")]
    InvalidPrecondition(String),

    /// Invalid decentralized identifier.
    #[error("Invalid DID: {0:?}")]
    InvalidDid(String),
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

//! Issuer authorization chain verification.
//!
//! Given a subject DID and a role namespace, [`IssuerVerifier`] proves or
//! disproves that the subject may issue the role:
//! - A role issued by a DID list verifies iff the subject is listed
//! - A role issued by holders of another role verifies iff the subject holds
//!   that role's credential and the credential's own issuer verifies for it
//!
//! Role definitions come from a [`RoleDefinitionSource`] (the registry
//! [`credgov_registry::DomainReader`] implements it) and credentials from an
//! external [`CredentialResolver`]. Both are memoized per pass in
//! [`VerificationCaches`].

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod resolvers;
pub mod verifier;

pub use cache::{CredentialCache, CredentialEntry, RoleDefinitionCache, VerificationCaches};
pub use error::{Result, VerificationError};
pub use resolvers::{CredentialResolver, RoleDefinitionSource, StaticCredentialResolver};
pub use verifier::{
    AuthorizationChain, ChainLink, IssuerVerifier, VerificationResult, DEFAULT_MAX_CHAIN_DEPTH,
};

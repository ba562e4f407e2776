//! Verification errors.

use credgov_core::Did;
use credgov_registry::DomainError;
use thiserror::Error;

/// Why an issuer chain or enrolment check failed.
#[derive(Error, Debug)]
pub enum VerificationError {
    /// No role definition is registered at the namespace.
    #[error("No role definition registered at {0}")]
    RoleNotFound(String),

    /// The chain reached a DID issuer list that does not include the candidate.
    #[error("{did} is not an authorized issuer of {role}")]
    NotAuthorized {
        /// Candidate at the failing link.
        did: Did,
        /// Role whose issuer list was checked.
        role: String,
    },

    /// A link of the chain needs a credential the candidate does not hold.
    #[error("Unable to resolve the issuer credential to verify their authority: {did} holds no {role} credential")]
    IssuerCredentialUnresolvable {
        /// Candidate expected to hold the credential.
        did: Did,
        /// Role of the missing credential.
        role: String,
    },

    /// An enrolment precondition is not satisfied.
    #[error("Enrolment precondition {role} not met: {reason}")]
    PreconditionNotMet {
        /// Required role.
        role: String,
        /// What went wrong for that role.
        reason: String,
    },

    /// The role chain loops back on itself and can never reach a DID issuer.
    #[error("Cyclic issuer chain: {}", .chain.join(" -> "))]
    CyclicIssuerChain {
        /// Roles in visit order, ending with the repeated one.
        chain: Vec<String>,
    },

    /// The role chain is longer than the configured ceiling.
    #[error("Issuer chain exceeds {max_depth} links")]
    IssuerChainTooDeep {
        /// Configured ceiling.
        max_depth: usize,
    },

    /// Role definition read failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Credential store failure.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

/// Result type alias for VerificationError.
pub type Result<T> = std::result::Result<T, VerificationError>;

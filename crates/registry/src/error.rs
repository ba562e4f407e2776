//! Error types for registry reads.

use alloy::primitives::Address;
use credgov_core::{CoreError, Node};
use thiserror::Error;

/// Registry read error.
#[derive(Error, Debug)]
pub enum DomainError {
    /// The node points at a resolver that is not registered for the chain.
    #[error("Unknown resolver {address} on chain {chain_id}")]
    UnknownResolver {
        /// Chain the read was made against.
        chain_id: u64,
        /// Resolver address found in the registry.
        address: Address,
    },

    /// The node has no resolver or no name (deleted or never finalized).
    #[error("Domain {0} is not registered")]
    NotRegistered(Node),

    /// The resolver holds no definition record for the node.
    #[error("No definition stored at {0}")]
    DefinitionNotFound(String),

    /// The name stored for a node does not hash back to it.
    #[error("Name {name} stored for node {node} does not match its namehash")]
    NameMismatch {
        /// Node that was read.
        node: Node,
        /// Name the resolver returned.
        name: String,
    },

    /// The record failed to decode.
    #[error(transparent)]
    Definition(#[from] CoreError),

    /// Chain I/O failure.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl DomainError {
    /// Whether the error means "nothing usable is registered here", as
    /// opposed to a failed read.
    pub fn is_absent(&self) -> bool {
        matches!(
            self,
            DomainError::NotRegistered(_) | DomainError::DefinitionNotFound(_)
        )
    }
}

/// Result type alias for DomainError.
pub type Result<T> = std::result::Result<T, DomainError>;

//! # Credential Governance Core
//!
//! Core types, constants, hashing utilities and the definition codec for
//! role-based credential governance over a hierarchical name registry.
//!
//! Organizations, applications and roles are registered as domains. Each
//! domain carries a versioned definition that says who may issue or revoke a
//! role and what a holder must already possess. This crate holds everything
//! that does not touch the network.
//!
//! ## Features
//!
//! - **Ethereum Types**: Uses Alloy primitives for Address, B256, and keccak256
//! - **Domain Types**: DomainName, Node, Did, OffChainClaim
//! - **Definitions**: RoleDefinition, OrgDefinition, AppDefinition
//! - **Hashing**: ENS namehash / labelhash
//! - **Codec**: legacy JSON and versioned ABI record grammars

#![warn(missing_docs)]

pub mod codec;
pub mod constants;
pub mod definition;
pub mod error;
pub mod hashing;
pub mod types;

// Re-export commonly used items
pub use codec::{RawRecord, ResolverVersion};
pub use constants::*;
pub use definition::*;
pub use error::{CoreError, Result};
pub use hashing::{child_node, keccak256, labelhash, namehash};
pub use types::*;

// Re-export Alloy primitives for convenience
pub use alloy_primitives::{Address, Bytes, B256};

//! Registry access for credential governance.
//!
//! This crate provides:
//! - A [`ChainSource`] seam over registry logs and resolver records, with a
//!   JSON-RPC implementation ([`RpcSource`])
//! - The [`DomainReader`], which decodes definitions through whichever
//!   known resolver a node points at
//! - The [`DomainHierarchy`] walker, rebuilding sub-domain sets from logs
//! - The [`DomainTransactionFactory`], which encodes definition writes
//! - TOML [`config`]
//!
//! ```text
//!  DomainHierarchy ──► DomainReader ──► credgov_core::codec
//!         │                 │
//!         └──────┬──────────┘
//!                ▼
//!           ChainSource  ◄── RpcSource (alloy) / InMemoryRegistry (tests)
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod contracts;
pub mod error;
pub mod factory;
pub mod hierarchy;
pub mod provider;
pub mod reader;
pub mod source;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{DomainError, Result};
pub use factory::{DomainTransactionFactory, EncodedCall, PreconditionPolicy};
pub use hierarchy::{
    DiscoveryOptions, DiscoveryStrategy, DomainHierarchy, HierarchyContracts, ScanObserver,
    SearchMode, TracingObserver,
};
pub use provider::RpcSource;
pub use reader::{DomainReader, DomainRef};
pub use source::{ChainSource, LogEntry, LogQuery};

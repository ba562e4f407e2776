//! The chain seam: historical logs plus raw registry and resolver reads.
//!
//! Everything above this trait is transport-agnostic. [`crate::provider::RpcSource`]
//! implements it over JSON-RPC; tests use [`crate::testing::InMemoryRegistry`].

use alloy::primitives::{Address, Bytes, Log, B256};
use alloy::sol_types::SolEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use credgov_core::Node;

/// Filter for a historical log query.
///
/// Empty topic lists match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    /// Emitting contract.
    pub address: Address,
    /// Event signature hash (topic 0).
    pub event_signature: B256,
    /// Accepted values of topic 1.
    pub topic1: Vec<B256>,
    /// Accepted values of topic 2.
    pub topic2: Vec<B256>,
    /// First block, inclusive.
    pub from_block: u64,
    /// Last block, inclusive. `None` means latest.
    pub to_block: Option<u64>,
}

impl LogQuery {
    /// Query all logs of event `E` emitted by `address`.
    pub fn for_event<E: SolEvent>(address: Address) -> Self {
        Self {
            address,
            event_signature: E::SIGNATURE_HASH,
            topic1: Vec::new(),
            topic2: Vec::new(),
            from_block: 0,
            to_block: None,
        }
    }

    /// Restrict topic 1 to the given values.
    pub fn topic1(mut self, values: impl IntoIterator<Item = B256>) -> Self {
        self.topic1 = values.into_iter().collect();
        self
    }

    /// Restrict topic 2 to the given values.
    pub fn topic2(mut self, values: impl IntoIterator<Item = B256>) -> Self {
        self.topic2 = values.into_iter().collect();
        self
    }

    /// Set the first block.
    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = block;
        self
    }

    /// Set the last block.
    pub fn to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    /// Whether a log entry satisfies this query.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        let topic_ok = |index: usize, accepted: &[B256]| {
            accepted.is_empty()
                || entry
                    .topics
                    .get(index)
                    .is_some_and(|topic| accepted.contains(topic))
        };
        let block = entry.block_number.unwrap_or_default();

        entry.address == self.address
            && entry.topics.first() == Some(&self.event_signature)
            && topic_ok(1, &self.topic1)
            && topic_ok(2, &self.topic2)
            && block >= self.from_block
            && self.to_block.map_or(true, |to| block <= to)
    }
}

/// A raw log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Emitting contract.
    pub address: Address,
    /// Topics, signature first.
    pub topics: Vec<B256>,
    /// Non-indexed data.
    pub data: Bytes,
    /// Block the log was emitted in.
    pub block_number: Option<u64>,
}

impl LogEntry {
    /// Build the entry a contract would emit for `event`.
    pub fn from_event<E: SolEvent>(address: Address, event: &E, block_number: u64) -> Self {
        let log_data = event.encode_log_data();
        Self {
            address,
            topics: log_data.topics().to_vec(),
            data: log_data.data.clone(),
            block_number: Some(block_number),
        }
    }

    /// Decode the entry as event `E`.
    pub fn decode<E: SolEvent>(&self) -> Result<E> {
        let log = Log::new_unchecked(self.address, self.topics.clone(), self.data.clone());
        let decoded = E::decode_log(&log, true)
            .with_context(|| format!("Failed to decode {} log", E::SIGNATURE))?;
        Ok(decoded.data)
    }
}

/// Read-only view of the registry, its resolvers and their event logs.
///
/// None of these calls carries a timeout; impose one at the transport.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Chain the source reads from.
    async fn chain_id(&self) -> Result<u64>;

    /// Latest block number.
    async fn block_number(&self) -> Result<u64>;

    /// Historical logs matching `query`.
    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>>;

    /// Current owner of `node` (zero when deleted or unregistered).
    async fn owner(&self, node: Node) -> Result<Address>;

    /// Resolver pointer of `node` (zero when unset).
    async fn resolver(&self, node: Node) -> Result<Address>;

    /// Reverse name record of `node` held by `resolver`.
    async fn name(&self, resolver: Address, node: Node) -> Result<String>;

    /// Text record `key` of `node` held by `resolver`.
    async fn text(&self, resolver: Address, node: Node, key: &str) -> Result<String>;

    /// Structured definition record of `node` held by `resolver`.
    async fn definition(&self, resolver: Address, node: Node) -> Result<Bytes>;
}

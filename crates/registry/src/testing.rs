//! In-memory registry for tests.
//!
//! Mirrors the contract semantics the readers depend on: `register` and
//! `delete` emit `NewOwner` at the registry, text writes emit `TextChanged`
//! at the resolver, structured writes emit `DomainUpdated` at the notifier.
//! Every emitted log lands in its own block.

use alloy::primitives::{keccak256, Address, Bytes};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use credgov_core::{
    codec, labelhash, namehash, CoreError, DomainDefinition, Node, RawRecord, ResolverVersion,
    METADATA_KEY,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::contracts::{IDefinitionResolver, IDomainNotifier, IDomainRegistry};
use crate::hierarchy::HierarchyContracts;
use crate::source::{ChainSource, LogEntry, LogQuery};

#[derive(Default)]
struct State {
    block: u64,
    owners: HashMap<Node, Address>,
    resolvers: HashMap<Node, Address>,
    names: HashMap<(Address, Node), String>,
    texts: HashMap<(Address, Node, String), String>,
    definitions: HashMap<(Address, Node), Bytes>,
    logs: Vec<LogEntry>,
    failing: HashSet<Node>,
    log_queries: usize,
}

impl State {
    fn emit<E: alloy::sol_types::SolEvent>(&mut self, address: Address, event: &E) {
        self.block += 1;
        self.logs.push(LogEntry::from_event(address, event, self.block));
    }
}

/// Registry, resolvers and notifier held in memory.
pub struct InMemoryRegistry {
    chain_id: u64,
    registry: Address,
    domain_notifier: Address,
    state: Mutex<State>,
}

impl InMemoryRegistry {
    /// Empty registry on `chain_id`.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            registry: Address::repeat_byte(0xe5),
            domain_notifier: Address::repeat_byte(0xd0),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registry contract address.
    pub fn registry(&self) -> Address {
        self.registry
    }

    /// Notifier contract address.
    pub fn domain_notifier(&self) -> Address {
        self.domain_notifier
    }

    /// Contract addresses for a hierarchy walker over this registry.
    pub fn contracts(&self, public_resolver: Option<Address>) -> HierarchyContracts {
        HierarchyContracts {
            registry: self.registry,
            domain_notifier: self.domain_notifier,
            public_resolver,
        }
    }

    /// Register `name` with its owner and resolver, storing the reverse name
    /// record on the resolver. Emits `NewOwner`.
    pub fn register(&self, name: &str, owner: Address, resolver: Address) -> Node {
        let (leaf, parent) = split_name(name);
        let node = namehash(name);

        let mut state = self.state();
        state.owners.insert(node, owner);
        state.resolvers.insert(node, resolver);
        if !resolver.is_zero() {
            state.names.insert((resolver, node), name.to_string());
        }

        let event = IDomainRegistry::NewOwner {
            node: parent.0,
            label: labelhash(leaf),
            owner,
        };
        state.emit(self.registry, &event);

        node
    }

    /// Release `name`: owner and resolver are cleared. Emits `NewOwner` with
    /// the zero owner.
    pub fn delete(&self, name: &str) {
        let (leaf, parent) = split_name(name);
        let node = namehash(name);

        let mut state = self.state();
        state.owners.insert(node, Address::ZERO);
        state.resolvers.insert(node, Address::ZERO);

        let event = IDomainRegistry::NewOwner {
            node: parent.0,
            label: labelhash(leaf),
            owner: Address::ZERO,
        };
        state.emit(self.registry, &event);
    }

    /// Write a text record. Emits `TextChanged` at the resolver.
    pub fn set_text(&self, resolver: Address, node: Node, key: &str, value: &str) {
        let mut state = self.state();
        state
            .texts
            .insert((resolver, node, key.to_string()), value.to_string());

        let event = IDefinitionResolver::TextChanged {
            node: node.0,
            indexedKey: keccak256(key.as_bytes()),
            key: key.to_string(),
        };
        state.emit(resolver, &event);
    }

    /// Write a structured definition record. Emits `DomainUpdated` at the
    /// notifier.
    pub fn set_definition(&self, resolver: Address, node: Node, data: Bytes) {
        let mut state = self.state();
        state.definitions.insert((resolver, node), data);

        let event = IDomainNotifier::DomainUpdated { node: node.0 };
        state.emit(self.domain_notifier, &event);
    }

    /// Encode `definition` for `version` and store it the way a resolver of
    /// that version would.
    pub fn publish(
        &self,
        node: Node,
        definition: &DomainDefinition,
        resolver: Address,
        version: ResolverVersion,
    ) -> std::result::Result<(), CoreError> {
        match codec::encode(definition, version)? {
            RawRecord::Text(json) => self.set_text(resolver, node, METADATA_KEY, &json),
            RawRecord::Structured(bytes) => self.set_definition(resolver, node, bytes),
        }
        Ok(())
    }

    /// Make owner and name reads of `node` fail from now on.
    pub fn fail_reads(&self, node: Node) {
        self.state().failing.insert(node);
    }

    /// Advance the chain head without emitting anything.
    pub fn advance_blocks(&self, blocks: u64) {
        self.state().block += blocks;
    }

    /// Number of `get_logs` calls served so far.
    pub fn log_query_count(&self) -> usize {
        self.state().log_queries
    }

    fn check_readable(&self, node: Node) -> Result<()> {
        if self.state().failing.contains(&node) {
            return Err(anyhow!("Injected read failure for {}", node));
        }
        Ok(())
    }
}

fn split_name(name: &str) -> (&str, Node) {
    match name.split_once('.') {
        Some((leaf, parent)) => (leaf, namehash(parent)),
        None => (name, Node::ROOT),
    }
}

#[async_trait]
impl ChainSource for InMemoryRegistry {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.state().block)
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let mut state = self.state();
        state.log_queries += 1;
        Ok(state
            .logs
            .iter()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect())
    }

    async fn owner(&self, node: Node) -> Result<Address> {
        self.check_readable(node)?;
        Ok(self.state().owners.get(&node).copied().unwrap_or_default())
    }

    async fn resolver(&self, node: Node) -> Result<Address> {
        Ok(self.state().resolvers.get(&node).copied().unwrap_or_default())
    }

    async fn name(&self, resolver: Address, node: Node) -> Result<String> {
        self.check_readable(node)?;
        Ok(self
            .state()
            .names
            .get(&(resolver, node))
            .cloned()
            .unwrap_or_default())
    }

    async fn text(&self, resolver: Address, node: Node, key: &str) -> Result<String> {
        Ok(self
            .state()
            .texts
            .get(&(resolver, node, key.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn definition(&self, resolver: Address, node: Node) -> Result<Bytes> {
        Ok(self
            .state()
            .definitions
            .get(&(resolver, node))
            .cloned()
            .unwrap_or_default())
    }
}

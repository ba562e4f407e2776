//! Domain hierarchy walker.
//!
//! The registry has no "list children" call, so descendants are rebuilt
//! from historical logs. Two strategies:
//!
//! - [`DiscoveryStrategy::ResolverLogs`]: one pass over `DomainUpdated`
//!   notifications (plus `TextChanged("metadata")` on the public resolver
//!   when configured). Cheap, but misses domains that were never notified.
//! - [`DiscoveryStrategy::RegistryLogs`]: breadth-first over `NewOwner`
//!   events, one round of log scans per tree level. Finds every registered
//!   level.
//!
//! Per-entry failures (deleted domains, transient reads) drop that entry and
//! never abort the batch. Log query failures abort the scan.

use alloy::primitives::{keccak256, Address};
use alloy::sol_types::SolEvent;
use credgov_core::{child_node, DomainName, Node, METADATA_KEY};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::contracts::IDefinitionResolver::TextChanged;
use crate::contracts::IDomainNotifier::DomainUpdated;
use crate::contracts::IDomainRegistry::NewOwner;
use crate::error::{DomainError, Result};
use crate::reader::DomainReader;
use crate::source::{ChainSource, LogEntry, LogQuery};

/// Which log stream drives discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStrategy {
    /// Scan definition-update notifications.
    #[default]
    ResolverLogs,
    /// Breadth-first scan of registry ownership events.
    RegistryLogs,
}

/// How deep below the queried domain results may lie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Every descendant.
    #[default]
    All,
    /// Direct children only.
    FirstLevel,
}

impl SearchMode {
    /// Whether `name` is a result for a query on `root`.
    pub fn accepts(&self, name: &DomainName, root: &DomainName) -> bool {
        match self {
            SearchMode::All => name.is_descendant_of(root),
            SearchMode::FirstLevel => name.is_child_of(root),
        }
    }
}

/// Contracts whose logs are scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyContracts {
    /// Registry emitting `NewOwner`.
    pub registry: Address,
    /// Notifier emitting `DomainUpdated`.
    pub domain_notifier: Address,
    /// Public resolver whose `TextChanged` events are also scanned.
    pub public_resolver: Option<Address>,
}

/// Scan tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// First block to scan.
    pub from_block: u64,
    /// Blocks per log query; 0 queries the whole range at once.
    pub block_batch_size: u64,
    /// Ceiling on in-flight log queries and per-entry reads.
    pub concurrency: usize,
    /// Parent nodes per registry log query.
    pub max_topics_per_query: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            from_block: 0,
            block_batch_size: 50_000,
            concurrency: 5,
            max_topics_per_query: 100,
        }
    }
}

/// Observability hook for log scans.
pub trait ScanObserver: Send + Sync {
    /// A log query returned `entries` entries.
    fn logs_fetched(&self, _query: &LogQuery, _entries: usize) {}

    /// A batch of `candidates` nodes was resolved and `kept` became results.
    fn batch_resolved(&self, _candidates: usize, _kept: usize) {}
}

/// Observer that reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ScanObserver for TracingObserver {
    fn logs_fetched(&self, query: &LogQuery, entries: usize) {
        debug!(
            "Fetched {} logs from {} in blocks {}..={:?}",
            entries, query.address, query.from_block, query.to_block
        );
    }

    fn batch_resolved(&self, candidates: usize, kept: usize) {
        debug!("Resolved batch: {} candidates, {} kept", candidates, kept);
    }
}

/// Enumerates registered descendants of a domain.
pub struct DomainHierarchy<S> {
    reader: Arc<DomainReader<S>>,
    contracts: HierarchyContracts,
    options: DiscoveryOptions,
    observer: Arc<dyn ScanObserver>,
}

impl<S: ChainSource> DomainHierarchy<S> {
    /// Create a walker reporting through [`TracingObserver`].
    pub fn new(
        reader: Arc<DomainReader<S>>,
        contracts: HierarchyContracts,
        options: DiscoveryOptions,
    ) -> Self {
        Self {
            reader,
            contracts,
            options,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the scan observer.
    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Reader used for name and owner lookups.
    pub fn reader(&self) -> &DomainReader<S> {
        &self.reader
    }

    /// Discover the descendants of `domain` with the given strategy.
    pub async fn get_sub_domains(
        &self,
        domain: &DomainName,
        strategy: DiscoveryStrategy,
        mode: SearchMode,
    ) -> Result<BTreeSet<DomainName>> {
        match strategy {
            DiscoveryStrategy::ResolverLogs => self.sub_domains_using_resolver(domain, mode).await,
            DiscoveryStrategy::RegistryLogs => self.sub_domains_using_registry(domain, mode).await,
        }
    }

    /// Resolver-log strategy.
    pub async fn sub_domains_using_resolver(
        &self,
        domain: &DomainName,
        mode: SearchMode,
    ) -> Result<BTreeSet<DomainName>> {
        let latest = self.reader.source().block_number().await?;

        let notified = LogQuery::for_event::<DomainUpdated>(self.contracts.domain_notifier);
        let mut queries = self.windows(&notified, latest);
        if let Some(resolver) = self.contracts.public_resolver {
            let text_changed = LogQuery::for_event::<TextChanged>(resolver)
                .topic2([keccak256(METADATA_KEY.as_bytes())]);
            queries.extend(self.windows(&text_changed, latest));
        }

        let entries = self.fetch_all(queries).await?;
        let nodes: BTreeSet<Node> = entries.iter().filter_map(updated_node).collect();
        let candidates = nodes.len();

        let found: BTreeSet<DomainName> = stream::iter(nodes)
            .map(|node| self.resolve_descendant(node, domain, mode))
            .buffer_unordered(self.concurrency())
            .filter_map(|name| async move { name })
            .collect()
            .await;

        self.observer.batch_resolved(candidates, found.len());
        info!(
            "Resolver scan under {}: {} updated nodes, {} sub-domains",
            domain,
            candidates,
            found.len()
        );

        Ok(found)
    }

    /// Registry-log strategy.
    ///
    /// Meta domains (`roles`, `apps`, `orgs`) are walked through so that the
    /// roles and apps below them are found, but never reported. Children with
    /// a zero owner, no resolver or no name record are dropped and not
    /// descended into. With
    /// [`SearchMode::FirstLevel`] only the first level is scanned.
    pub async fn sub_domains_using_registry(
        &self,
        domain: &DomainName,
        mode: SearchMode,
    ) -> Result<BTreeSet<DomainName>> {
        let latest = self.reader.source().block_number().await?;
        let root = domain.node();

        let mut seen: HashSet<Node> = HashSet::from([root]);
        let mut frontier = vec![root];
        let mut found = BTreeSet::new();
        let mut level = 0usize;

        while !frontier.is_empty() {
            level += 1;

            let base = LogQuery::for_event::<NewOwner>(self.contracts.registry);
            let queries = frontier
                .chunks(self.options.max_topics_per_query.max(1))
                .flat_map(|chunk| {
                    let query = base.clone().topic1(chunk.iter().map(|node| node.0));
                    self.windows(&query, latest)
                })
                .collect();

            let entries = self.fetch_all(queries).await?;
            let children: BTreeSet<Node> = entries
                .iter()
                .filter_map(new_child)
                .filter(|child| seen.insert(*child))
                .collect();
            let candidates = children.len();

            let resolved: Vec<(Node, Option<DomainName>)> = stream::iter(children)
                .map(|child| self.resolve_child(child))
                .buffer_unordered(self.concurrency())
                .filter_map(|child| async move { child })
                .collect()
                .await;

            frontier = resolved.iter().map(|(node, _)| *node).collect();

            let before = found.len();
            found.extend(
                resolved
                    .into_iter()
                    .filter_map(|(_, name)| name)
                    .filter(|name| mode.accepts(name, domain) && !name.is_meta_domain()),
            );

            self.observer.batch_resolved(candidates, found.len() - before);
            debug!(
                "Level {} under {}: {} new children, frontier {}",
                level,
                domain,
                candidates,
                frontier.len()
            );

            if mode == SearchMode::FirstLevel {
                break;
            }
        }

        info!(
            "Registry scan under {}: {} rounds, {} sub-domains",
            domain,
            level,
            found.len()
        );

        Ok(found)
    }

    fn concurrency(&self) -> usize {
        self.options.concurrency.max(1)
    }

    /// Split a query into block windows ending at `latest`.
    fn windows(&self, query: &LogQuery, latest: u64) -> Vec<LogQuery> {
        let start = query.from_block.max(self.options.from_block);
        if start > latest {
            return Vec::new();
        }

        let step = self.options.block_batch_size;
        if step == 0 {
            return vec![query.clone().from_block(start).to_block(latest)];
        }

        let mut windows = Vec::new();
        let mut from = start;
        loop {
            let to = from.saturating_add(step - 1).min(latest);
            windows.push(query.clone().from_block(from).to_block(to));
            if to >= latest {
                break;
            }
            from = to + 1;
        }
        windows
    }

    async fn fetch_all(&self, queries: Vec<LogQuery>) -> Result<Vec<LogEntry>> {
        let source = self.reader.source();
        let observer = &self.observer;

        let batches: Vec<Vec<LogEntry>> = stream::iter(queries)
            .map(|query| async move {
                let entries = source.get_logs(&query).await?;
                observer.logs_fetched(&query, entries.len());
                Ok::<_, crate::error::DomainError>(entries)
            })
            .buffer_unordered(self.concurrency())
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    async fn resolve_descendant(
        &self,
        node: Node,
        root: &DomainName,
        mode: SearchMode,
    ) -> Option<DomainName> {
        let name = match self.reader.read_name(node).await {
            Ok(name) => name,
            Err(e) if e.is_absent() => {
                debug!("Dropping {}: {}", node, e);
                return None;
            }
            Err(e) => {
                warn!("Failed to resolve name of {}: {}", node, e);
                return None;
            }
        };

        if !mode.accepts(&name, root) || name.is_meta_domain() {
            return None;
        }

        match self.reader.owner(node).await {
            Ok(owner) if !owner.is_zero() => Some(name),
            Ok(_) => {
                debug!("Dropping {}: owner is the zero address", name);
                None
            }
            Err(e) => {
                warn!("Failed to read owner of {}: {}", name, e);
                None
            }
        }
    }

    /// Owner and name of a freshly seen child. `None` drops the child from
    /// the next frontier. A name that fails to read for any reason other
    /// than a missing resolver keeps the child in the frontier but out of
    /// the results.
    async fn resolve_child(&self, node: Node) -> Option<(Node, Option<DomainName>)> {
        let (owner, name) = tokio::join!(self.reader.owner(node), self.reader.read_name(node));

        match owner {
            Ok(owner) if !owner.is_zero() => {}
            Ok(_) => {
                debug!("Dropping {}: owner is the zero address", node);
                return None;
            }
            Err(e) => {
                warn!("Failed to read owner of {}: {}", node, e);
                return None;
            }
        }

        let name = match name {
            Ok(name) => Some(name),
            Err(DomainError::NotRegistered(_)) => {
                debug!("Dropping {}: no resolver or name record", node);
                return None;
            }
            Err(e) => {
                debug!("{} has no readable name: {}", node, e);
                None
            }
        };

        Some((node, name))
    }
}

/// Node carried by a `DomainUpdated` or `TextChanged("metadata")` entry.
fn updated_node(entry: &LogEntry) -> Option<Node> {
    let signature = *entry.topics.first()?;

    let decoded = if signature == DomainUpdated::SIGNATURE_HASH {
        entry.decode::<DomainUpdated>().map(|event| Some(event.node))
    } else if signature == TextChanged::SIGNATURE_HASH {
        entry
            .decode::<TextChanged>()
            .map(|event| (event.key == METADATA_KEY).then_some(event.node))
    } else {
        return None;
    };

    match decoded {
        Ok(node) => node.map(Node),
        Err(e) => {
            warn!("Skipping undecodable log: {:#}", e);
            None
        }
    }
}

/// Child node created by a `NewOwner` entry.
fn new_child(entry: &LogEntry) -> Option<Node> {
    match entry.decode::<NewOwner>() {
        Ok(event) => Some(child_node(&Node(event.node), &event.label)),
        Err(e) => {
            warn!("Skipping undecodable NewOwner log: {:#}", e);
            None
        }
    }
}

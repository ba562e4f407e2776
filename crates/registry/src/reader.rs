//! Domain reader: resolves a node's resolver and decodes its definition.

use alloy::primitives::Address;
use credgov_core::{
    codec, DomainDefinition, DomainName, Node, RawRecord, ResolverVersion, METADATA_KEY,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{DomainError, Result};
use crate::source::ChainSource;

/// A domain addressed either by name or by node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainRef {
    /// Human-readable name.
    Name(DomainName),
    /// Registry node.
    Node(Node),
}

impl DomainRef {
    /// Registry node of the reference.
    pub fn node(&self) -> Node {
        match self {
            DomainRef::Name(name) => name.node(),
            DomainRef::Node(node) => *node,
        }
    }
}

impl fmt::Display for DomainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainRef::Name(name) => write!(f, "{}", name),
            DomainRef::Node(node) => write!(f, "{}", node),
        }
    }
}

impl From<DomainName> for DomainRef {
    fn from(name: DomainName) -> Self {
        DomainRef::Name(name)
    }
}

impl From<&DomainName> for DomainRef {
    fn from(name: &DomainName) -> Self {
        DomainRef::Name(name.clone())
    }
}

impl From<Node> for DomainRef {
    fn from(node: Node) -> Self {
        DomainRef::Node(node)
    }
}

/// Reads names, owners and definitions through a [`ChainSource`].
///
/// Only resolvers registered with [`DomainReader::add_known_resolver`] are
/// trusted; their version picks the record grammar. The reader never caches.
pub struct DomainReader<S> {
    source: Arc<S>,
    chain_id: u64,
    known_resolvers: HashMap<u64, HashMap<Address, ResolverVersion>>,
}

impl<S: ChainSource> DomainReader<S> {
    /// Create a reader for `chain_id` with no known resolvers.
    pub fn new(source: Arc<S>, chain_id: u64) -> Self {
        Self {
            source,
            chain_id,
            known_resolvers: HashMap::new(),
        }
    }

    /// Register a resolver contract and its version.
    ///
    /// Re-registering an address replaces its version.
    pub fn add_known_resolver(&mut self, chain_id: u64, address: Address, version: ResolverVersion) {
        self.known_resolvers
            .entry(chain_id)
            .or_default()
            .insert(address, version);
    }

    /// Builder form of [`DomainReader::add_known_resolver`] for the reader's chain.
    pub fn with_known_resolver(mut self, address: Address, version: ResolverVersion) -> Self {
        let chain_id = self.chain_id;
        self.add_known_resolver(chain_id, address, version);
        self
    }

    /// Version of a known resolver on the reader's chain.
    pub fn known_resolver(&self, address: Address) -> Option<ResolverVersion> {
        self.known_resolvers
            .get(&self.chain_id)
            .and_then(|resolvers| resolvers.get(&address))
            .copied()
    }

    /// Known resolvers on the reader's chain.
    pub fn known_resolvers(&self) -> impl Iterator<Item = (Address, ResolverVersion)> + '_ {
        self.known_resolvers
            .get(&self.chain_id)
            .into_iter()
            .flat_map(|resolvers| resolvers.iter().map(|(a, v)| (*a, *v)))
    }

    /// Chain the reader is bound to.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Underlying chain source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Current owner of `node`.
    pub async fn owner(&self, node: Node) -> Result<Address> {
        Ok(self.source.owner(node).await?)
    }

    /// Resolver of `node` and its version.
    pub async fn resolver_of(&self, node: Node) -> Result<(Address, ResolverVersion)> {
        let address = self.source.resolver(node).await?;
        if address.is_zero() {
            return Err(DomainError::NotRegistered(node));
        }

        let version = self
            .known_resolver(address)
            .ok_or(DomainError::UnknownResolver {
                chain_id: self.chain_id,
                address,
            })?;

        Ok((address, version))
    }

    /// Read the name a node was registered under.
    pub async fn read_name(&self, node: Node) -> Result<DomainName> {
        let (resolver, _) = self.resolver_of(node).await?;
        let raw = self.source.name(resolver, node).await?;
        if raw.trim().is_empty() {
            return Err(DomainError::NotRegistered(node));
        }

        let name = DomainName::new(&raw)?;
        if name.node() != node {
            return Err(DomainError::NameMismatch { node, name: raw });
        }

        Ok(name)
    }

    /// Read the raw definition record of a node, dispatching on the
    /// resolver version.
    pub async fn read_raw(&self, node: Node) -> Result<(RawRecord, ResolverVersion)> {
        let (resolver, version) = self.resolver_of(node).await?;

        let record = if version.is_structured() {
            RawRecord::Structured(self.source.definition(resolver, node).await?)
        } else {
            RawRecord::Text(self.source.text(resolver, node, METADATA_KEY).await?)
        };

        Ok((record, version))
    }

    /// Read and decode the definition of a domain.
    pub async fn read(&self, domain: impl Into<DomainRef>) -> Result<DomainDefinition> {
        let domain = domain.into();
        let (record, version) = self.read_raw(domain.node()).await?;
        if record.is_empty() {
            return Err(DomainError::DefinitionNotFound(domain.to_string()));
        }

        debug!("Decoding {} record for {}", version, domain);
        Ok(codec::decode(&record, version)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryRegistry;
    use credgov_core::{CoreError, IssuerSpec, OrgDefinition, RoleDefinition};

    const CHAIN: u64 = 73799;

    fn legacy() -> Address {
        Address::repeat_byte(0x10)
    }

    fn v2() -> Address {
        Address::repeat_byte(0x20)
    }

    fn reader(registry: Arc<InMemoryRegistry>) -> DomainReader<InMemoryRegistry> {
        DomainReader::new(registry, CHAIN)
            .with_known_resolver(legacy(), ResolverVersion::Legacy)
            .with_known_resolver(v2(), ResolverVersion::V2)
    }

    fn role(name: &str) -> RoleDefinition {
        RoleDefinition::new(
            name,
            IssuerSpec::Did {
                did: vec![credgov_core::Did::from_address(Address::repeat_byte(0x01))],
            },
        )
    }

    #[tokio::test]
    async fn test_read_legacy_and_structured() {
        let registry = Arc::new(InMemoryRegistry::new(CHAIN));
        let owner = Address::repeat_byte(0xaa);

        let org = registry.register("myorg.iam.ewc", owner, legacy());
        registry
            .publish(org, &OrgDefinition::new("My Org").into(), legacy(), ResolverVersion::Legacy)
            .unwrap();

        let manager = registry.register("manager.roles.myorg.iam.ewc", owner, v2());
        registry
            .publish(manager, &role("manager").into(), v2(), ResolverVersion::V2)
            .unwrap();

        let reader = reader(registry);
        let org_def = reader.read(DomainName::new("myorg.iam.ewc").unwrap()).await.unwrap();
        assert_eq!(org_def, OrgDefinition::new("My Org").into());

        let role_def = reader.read(manager).await.unwrap();
        assert_eq!(role_def.as_role().unwrap().role_name, "manager");
    }

    #[tokio::test]
    async fn test_unknown_resolver() {
        let registry = Arc::new(InMemoryRegistry::new(CHAIN));
        let stranger = Address::repeat_byte(0x99);
        let node = registry.register("x.iam.ewc", Address::repeat_byte(0xaa), stranger);

        let err = reader(registry).read(node).await.unwrap_err();
        match err {
            DomainError::UnknownResolver { chain_id, address } => {
                assert_eq!(chain_id, CHAIN);
                assert_eq!(address, stranger);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_resolver_registered_for_other_chain_is_unknown() {
        let registry = Arc::new(InMemoryRegistry::new(CHAIN));
        let other = Address::repeat_byte(0x30);
        let node = registry.register("x.iam.ewc", Address::repeat_byte(0xaa), other);

        let mut reader = reader(registry);
        reader.add_known_resolver(1, other, ResolverVersion::V1);

        let mut known: Vec<(Address, ResolverVersion)> = reader.known_resolvers().collect();
        known.sort_by_key(|(address, _)| *address);
        assert_eq!(
            known,
            vec![(legacy(), ResolverVersion::Legacy), (v2(), ResolverVersion::V2)]
        );

        assert!(matches!(
            reader.read(node).await,
            Err(DomainError::UnknownResolver { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_definition_and_unregistered() {
        let registry = Arc::new(InMemoryRegistry::new(CHAIN));
        let node = registry.register("empty.iam.ewc", Address::repeat_byte(0xaa), v2());
        let reader = reader(registry);

        let err = reader.read(node).await.unwrap_err();
        assert!(matches!(err, DomainError::DefinitionNotFound(_)));
        assert!(err.is_absent());

        let unregistered = DomainName::new("nobody.iam.ewc").unwrap();
        assert!(matches!(
            reader.read(&unregistered).await,
            Err(DomainError::NotRegistered(_))
        ));
        assert!(matches!(
            reader.read_name(unregistered.node()).await,
            Err(DomainError::NotRegistered(_))
        ));
    }

    #[tokio::test]
    async fn test_read_name() {
        let registry = Arc::new(InMemoryRegistry::new(CHAIN));
        let node = registry.register("app.apps.myorg.iam.ewc", Address::repeat_byte(0xaa), legacy());

        let name = reader(registry).read_name(node).await.unwrap();
        assert_eq!(name.as_str(), "app.apps.myorg.iam.ewc");
    }

    #[tokio::test]
    async fn test_record_in_wrong_grammar_is_malformed() {
        let registry = Arc::new(InMemoryRegistry::new(CHAIN));
        let node = registry.register("r.roles.myorg.iam.ewc", Address::repeat_byte(0xaa), legacy());
        registry.set_text(legacy(), node, METADATA_KEY, "{not json");

        let err = reader(registry).read(node).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Definition(CoreError::MalformedDefinition(_))
        ));
    }
}

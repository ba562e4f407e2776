//! JSON-RPC implementation of [`ChainSource`].

use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::transports::http::{Client, Http};
use anyhow::{Context, Result};
use async_trait::async_trait;
use credgov_core::Node;

use crate::contracts::{IDefinitionResolver, IDomainRegistry};
use crate::source::{ChainSource, LogEntry, LogQuery};

/// HTTP RPC source for the registry and its resolvers.
#[derive(Clone)]
pub struct RpcSource {
    provider: RootProvider<Http<Client>>,
    registry: Address,
}

impl RpcSource {
    /// Create a new RPC source reading ownership from `registry`.
    pub fn new(rpc_url: &str, registry: Address) -> Result<Self> {
        let url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self { provider, registry })
    }

    /// Registry contract address.
    pub fn registry(&self) -> Address {
        self.registry
    }

    fn to_filter(query: &LogQuery) -> Filter {
        let mut filter = Filter::new()
            .address(query.address)
            .event_signature(query.event_signature)
            .from_block(query.from_block);

        if let Some(to_block) = query.to_block {
            filter = filter.to_block(to_block);
        }
        if !query.topic1.is_empty() {
            filter = filter.topic1(query.topic1.clone());
        }
        if !query.topic2.is_empty() {
            filter = filter.topic2(query.topic2.clone());
        }

        filter
    }
}

#[async_trait]
impl ChainSource for RpcSource {
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .context("Failed to get chain id")
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("Failed to get block number")
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let filter = Self::to_filter(query);

        let logs: Vec<Log> = self
            .provider
            .get_logs(&filter)
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch logs for {} in blocks {}..{:?}",
                    query.address, query.from_block, query.to_block
                )
            })?;

        Ok(logs
            .into_iter()
            .map(|log| LogEntry {
                address: log.inner.address,
                topics: log.inner.data.topics().to_vec(),
                data: log.inner.data.data.clone(),
                block_number: log.block_number,
            })
            .collect())
    }

    async fn owner(&self, node: Node) -> Result<Address> {
        let registry = IDomainRegistry::new(self.registry, self.provider.clone());
        let result = registry
            .owner(node.0)
            .call()
            .await
            .with_context(|| format!("Failed to read owner of {}", node))?;
        Ok(result._0)
    }

    async fn resolver(&self, node: Node) -> Result<Address> {
        let registry = IDomainRegistry::new(self.registry, self.provider.clone());
        let result = registry
            .resolver(node.0)
            .call()
            .await
            .with_context(|| format!("Failed to read resolver of {}", node))?;
        Ok(result._0)
    }

    async fn name(&self, resolver: Address, node: Node) -> Result<String> {
        let contract = IDefinitionResolver::new(resolver, self.provider.clone());
        let result = contract
            .name(node.0)
            .call()
            .await
            .with_context(|| format!("Failed to read name of {} from {}", node, resolver))?;
        Ok(result._0)
    }

    async fn text(&self, resolver: Address, node: Node, key: &str) -> Result<String> {
        let contract = IDefinitionResolver::new(resolver, self.provider.clone());
        let result = contract
            .text(node.0, key.to_string())
            .call()
            .await
            .with_context(|| format!("Failed to read text '{}' of {} from {}", key, node, resolver))?;
        Ok(result._0)
    }

    async fn definition(&self, resolver: Address, node: Node) -> Result<Bytes> {
        let contract = IDefinitionResolver::new(resolver, self.provider.clone());
        let result = contract
            .definition(node.0)
            .call()
            .await
            .with_context(|| format!("Failed to read definition of {} from {}", node, resolver))?;
        Ok(result._0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::IDomainRegistry::NewOwner;
    use alloy::primitives::B256;

    #[test]
    fn test_invalid_url_rejected() {
        assert!(RpcSource::new("not a url", Address::ZERO).is_err());
    }

    #[test]
    fn test_registry_address_kept() {
        let registry = Address::repeat_byte(0xe5);
        let source = RpcSource::new("http://localhost:8545", registry).unwrap();
        assert_eq!(source.registry(), registry);
    }

    #[test]
    fn test_filter_carries_block_range() {
        let query = LogQuery::for_event::<NewOwner>(Address::repeat_byte(0xe5))
            .topic1([B256::repeat_byte(1), B256::repeat_byte(2)])
            .from_block(10)
            .to_block(20);

        let filter = RpcSource::to_filter(&query);
        assert_eq!(filter.get_from_block(), Some(10));
        assert_eq!(filter.get_to_block(), Some(20));
    }
}

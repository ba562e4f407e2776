//! Transaction factory: builds the calls that publish a definition.
//!
//! Nothing here touches the network. The output is handed to an external
//! signer/submitter.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use credgov_core::{
    codec, labelhash, CoreError, DomainDefinition, DomainName, Node, RawRecord, ResolverVersion,
    RoleDefinition, METADATA_KEY,
};
use serde::Serialize;

use crate::contracts::{IDefinitionResolver, IDomainNotifier, IDomainRegistry};

/// An unsigned contract call ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedCall {
    /// Target contract.
    pub to: Address,
    /// ABI-encoded calldata.
    pub data: Bytes,
    /// Value to send, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
}

impl EncodedCall {
    fn new(to: Address, call: &impl SolCall) -> Self {
        Self {
            to,
            data: call.abi_encode().into(),
            value: None,
        }
    }
}

/// How enrolment preconditions are treated before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreconditionPolicy {
    /// Write preconditions as given.
    #[default]
    Verbatim,
    /// Reject empty, malformed or self-referencing preconditions.
    Validated,
}

/// Builds calls for one resolver version.
#[derive(Debug, Clone)]
pub struct DomainTransactionFactory {
    version: ResolverVersion,
    resolver: Address,
    registry: Address,
    domain_notifier: Address,
}

impl DomainTransactionFactory {
    /// Factory writing through `resolver`, which must be of `version`.
    pub fn new(
        version: ResolverVersion,
        resolver: Address,
        registry: Address,
        domain_notifier: Address,
    ) -> Self {
        Self {
            version,
            resolver,
            registry,
            domain_notifier,
        }
    }

    /// Resolver version the factory encodes for.
    pub fn version(&self) -> ResolverVersion {
        self.version
    }

    /// Resolver multicall setting the domain's name and definition record.
    ///
    /// The record is the exact inverse of what the reader decodes for the
    /// factory's resolver version. This call alone does not announce the
    /// change or point the domain at the resolver: follow it with
    /// [`Self::domain_updated`] for an existing domain, or use
    /// [`Self::new_domain`], which adds the registry and notifier calls.
    /// A field the version cannot carry fails with
    /// [`CoreError::UnsupportedField`].
    pub fn new_domain_definition(
        &self,
        domain: &DomainName,
        definition: &DomainDefinition,
        policy: PreconditionPolicy,
    ) -> Result<EncodedCall, CoreError> {
        if let (PreconditionPolicy::Validated, DomainDefinition::Role(role)) = (policy, definition) {
            validate_preconditions(domain, role)?;
        }

        let node = domain.node().0;
        let write_record: Bytes = match codec::encode(definition, self.version)? {
            RawRecord::Text(json) => IDefinitionResolver::setTextCall {
                node,
                key: METADATA_KEY.to_string(),
                value: json,
            }
            .abi_encode()
            .into(),
            RawRecord::Structured(data) => IDefinitionResolver::setDefinitionCall { node, data }
                .abi_encode()
                .into(),
        };
        let set_name: Bytes = IDefinitionResolver::setNameCall {
            node,
            name: domain.to_string(),
        }
        .abi_encode()
        .into();

        Ok(EncodedCall::new(
            self.resolver,
            &IDefinitionResolver::multicallCall {
                data: vec![set_name, write_record],
            },
        ))
    }

    /// Registry call creating `label.parent`, owned by `owner` and pointing
    /// at the factory's resolver.
    pub fn new_subdomain(
        &self,
        parent: &DomainName,
        label: &str,
        owner: Address,
    ) -> Result<EncodedCall, CoreError> {
        if label.contains('.') {
            return Err(CoreError::InvalidDomainName(label.to_string()));
        }
        let child = parent.child(label)?;

        Ok(EncodedCall::new(
            self.registry,
            &IDomainRegistry::setSubnodeRecordCall {
                node: parent.node().0,
                label: labelhash(child.leaf_label()),
                owner,
                resolver: self.resolver,
                ttl: 0,
            },
        ))
    }

    /// Notifier call announcing that the definition at `node` changed.
    pub fn domain_updated(&self, node: Node) -> EncodedCall {
        EncodedCall::new(
            self.domain_notifier,
            &IDomainNotifier::domainUpdatedCall { node: node.0 },
        )
    }

    /// Every call needed to create and publish `label.parent`, in
    /// submission order.
    pub fn new_domain(
        &self,
        parent: &DomainName,
        label: &str,
        owner: Address,
        definition: &DomainDefinition,
        policy: PreconditionPolicy,
    ) -> Result<Vec<EncodedCall>, CoreError> {
        let subdomain = self.new_subdomain(parent, label, owner)?;
        let domain = parent.child(label)?;
        let definition = self.new_domain_definition(&domain, definition, policy)?;

        Ok(vec![subdomain, definition, self.domain_updated(domain.node())])
    }
}

fn validate_preconditions(domain: &DomainName, role: &RoleDefinition) -> Result<(), CoreError> {
    for precondition in &role.enrolment_preconditions {
        if precondition.conditions.is_empty() {
            return Err(CoreError::InvalidPrecondition(format!(
                "{} has a precondition with no roles",
                domain
            )));
        }

        for condition in &precondition.conditions {
            let required = DomainName::new(condition).map_err(|_| {
                CoreError::InvalidPrecondition(format!("'{}' is not a role name", condition))
            })?;
            if &required == domain {
                return Err(CoreError::InvalidPrecondition(format!(
                    "{} requires itself",
                    domain
                )));
            }
        }
    }
    Ok(())
}

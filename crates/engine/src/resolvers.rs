//! Seams the verifier reads through.

use async_trait::async_trait;
use credgov_core::{CoreError, Did, DomainDefinition, DomainName, OffChainClaim, RoleDefinition};
use credgov_registry::{ChainSource, DomainError, DomainReader};
use std::collections::HashMap;

/// Source of role definitions.
#[async_trait]
pub trait RoleDefinitionSource: Send + Sync {
    /// Definition at `role`, or `None` when nothing is registered there.
    async fn role_definition(
        &self,
        role: &DomainName,
    ) -> Result<Option<RoleDefinition>, DomainError>;
}

#[async_trait]
impl<S: ChainSource> RoleDefinitionSource for DomainReader<S> {
    async fn role_definition(
        &self,
        role: &DomainName,
    ) -> Result<Option<RoleDefinition>, DomainError> {
        match self.read(role).await {
            Ok(DomainDefinition::Role(definition)) => Ok(Some(definition)),
            Ok(other) => Err(CoreError::MalformedDefinition(format!(
                "{} holds an {} definition, not a role",
                role,
                other.kind()
            ))
            .into()),
            Err(e) if e.is_absent() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// External credential store.
///
/// Returned claims are already signature-checked. Their `iss` is still
/// untrusted until the verifier proves the chain behind it.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Credential of type `namespace` held by `did`, if any.
    async fn get_credential(
        &self,
        did: &Did,
        namespace: &str,
    ) -> anyhow::Result<Option<OffChainClaim>>;
}

/// Credential resolver over a fixed set of claims, keyed by subject and
/// claim type. Chain-qualified and short `did:ethr` forms of one account
/// find the same claims.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialResolver {
    claims: HashMap<(String, String), OffChainClaim>,
}

impl StaticCredentialResolver {
    /// Empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a claim. A later claim for the same subject and type replaces
    /// the earlier one.
    pub fn insert(&mut self, claim: OffChainClaim) {
        let key = Self::key(&claim.sub, &claim.claim_type);
        self.claims.insert(key, claim);
    }

    /// Number of claims held.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether no claims are held.
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    fn key(did: &Did, namespace: &str) -> (String, String) {
        (
            did.subject_key(),
            namespace.trim().to_ascii_lowercase(),
        )
    }
}

impl FromIterator<OffChainClaim> for StaticCredentialResolver {
    fn from_iter<I: IntoIterator<Item = OffChainClaim>>(iter: I) -> Self {
        let mut resolver = Self::new();
        for claim in iter {
            resolver.insert(claim);
        }
        resolver
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentialResolver {
    async fn get_credential(
        &self,
        did: &Did,
        namespace: &str,
    ) -> anyhow::Result<Option<OffChainClaim>> {
        Ok(self.claims.get(&Self::key(did, namespace)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credgov_core::{Address, ClaimData, IssuerSpec, OrgDefinition, ResolverVersion};
    use credgov_registry::testing::InMemoryRegistry;
    use std::sync::Arc;

    const CHAIN: u64 = 73799;

    fn resolver() -> Address {
        Address::repeat_byte(0x20)
    }

    fn claim(role: &str, subject: &str) -> OffChainClaim {
        let issuer = Did::from_address(Address::repeat_byte(0x01));
        OffChainClaim {
            claim_type: role.to_string(),
            claim_type_version: 1,
            claim_data: ClaimData::default(),
            iss: issuer.clone(),
            signer: issuer,
            sub: Did::new(subject).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_static_resolver_lookup_ignores_case() {
        let subject = "did:ethr:0xAbCdEf0000000000000000000000000000000001";
        let credentials: StaticCredentialResolver =
            [claim("manager.roles.myorg.iam.ewc", subject)].into_iter().collect();
        assert_eq!(credentials.len(), 1);

        let lowered = Did::new(subject.to_ascii_lowercase()).unwrap();
        let found = credentials
            .get_credential(&lowered, "Manager.Roles.MyOrg.iam.ewc")
            .await
            .unwrap();
        assert_eq!(found.unwrap().claim_type, "manager.roles.myorg.iam.ewc");

        let missing = credentials
            .get_credential(&lowered, "user.roles.myorg.iam.ewc")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_chain_qualified_subject_matches_short_form() {
        let account = Address::repeat_byte(0x33);
        let qualified = format!("did:ethr:volta:{}", account);
        let credentials: StaticCredentialResolver =
            [claim("admin.roles.myorg.iam.ewc", &qualified)].into_iter().collect();

        let found = credentials
            .get_credential(&Did::from_address(account), "admin.roles.myorg.iam.ewc")
            .await
            .unwrap();
        assert_eq!(found.unwrap().sub.as_str(), qualified);
    }

    #[tokio::test]
    async fn test_later_claim_replaces_earlier() {
        let subject = "did:ethr:0x0000000000000000000000000000000000000002";
        let mut credentials = StaticCredentialResolver::new();
        assert!(credentials.is_empty());

        credentials.insert(claim("user.roles.myorg.iam.ewc", subject));
        let mut newer = claim("user.roles.myorg.iam.ewc", subject);
        newer.claim_type_version = 2;
        credentials.insert(newer);

        assert_eq!(credentials.len(), 1);
        let found = credentials
            .get_credential(&Did::new(subject).unwrap(), "user.roles.myorg.iam.ewc")
            .await
            .unwrap();
        assert_eq!(found.unwrap().claim_type_version, 2);
    }

    #[tokio::test]
    async fn test_reader_as_role_source() {
        let registry = Arc::new(InMemoryRegistry::new(CHAIN));
        let owner = Address::repeat_byte(0xaa);

        let role = RoleDefinition::new(
            "manager",
            IssuerSpec::Did {
                did: vec![Did::from_address(owner)],
            },
        );
        let node = registry.register("manager.roles.myorg.iam.ewc", owner, resolver());
        registry
            .publish(node, &role.clone().into(), resolver(), ResolverVersion::V2)
            .unwrap();

        let org = registry.register("myorg.iam.ewc", owner, resolver());
        registry
            .publish(org, &OrgDefinition::new("My Org").into(), resolver(), ResolverVersion::V2)
            .unwrap();

        registry.register("empty.roles.myorg.iam.ewc", owner, resolver());

        let reader = DomainReader::new(registry, CHAIN)
            .with_known_resolver(resolver(), ResolverVersion::V2);

        let name = DomainName::new("manager.roles.myorg.iam.ewc").unwrap();
        assert_eq!(reader.role_definition(&name).await.unwrap(), Some(role));

        let empty = DomainName::new("empty.roles.myorg.iam.ewc").unwrap();
        assert_eq!(reader.role_definition(&empty).await.unwrap(), None);

        let unregistered = DomainName::new("ghost.roles.myorg.iam.ewc").unwrap();
        assert_eq!(reader.role_definition(&unregistered).await.unwrap(), None);

        let org_name = DomainName::new("myorg.iam.ewc").unwrap();
        assert!(matches!(
            reader.role_definition(&org_name).await,
            Err(DomainError::Definition(CoreError::MalformedDefinition(_)))
        ));
    }
}

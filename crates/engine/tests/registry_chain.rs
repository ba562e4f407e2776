//! Issuer verification against role definitions read from a registry.

use credgov_core::{
    Address, ClaimData, Did, DomainName, IssuerSpec, OffChainClaim, OrgDefinition, ResolverVersion,
    RoleDefinition,
};
use credgov_engine::{
    IssuerVerifier, RoleDefinitionSource, StaticCredentialResolver, VerificationError,
};
use credgov_registry::testing::InMemoryRegistry;
use credgov_registry::{DomainError, DomainReader};
use std::sync::Arc;

const CHAIN: u64 = 73799;
const OWNER: Address = Address::new([0xaa; 20]);
const LEGACY: Address = Address::new([0x10; 20]);
const V1: Address = Address::new([0x11; 20]);
const V2: Address = Address::new([0x12; 20]);

const ADMIN: &str = "admin.roles.myorg.iam.ewc";
const MANAGER: &str = "manager.roles.myorg.iam.ewc";
const USER: &str = "user.roles.myorg.iam.ewc";

fn did(n: u8) -> Did {
    Did::from_address(Address::repeat_byte(n))
}

fn claim(role: &str, subject: &Did, issuer: &Did) -> OffChainClaim {
    OffChainClaim {
        claim_type: role.to_string(),
        claim_type_version: 1,
        claim_data: ClaimData::default(),
        iss: issuer.clone(),
        signer: issuer.clone(),
        sub: subject.clone(),
    }
}

/// Roles spread over all three resolver generations:
/// admin (legacy, DID [1]) ← manager (v1, holders of admin) ← user (v2,
/// holders of manager).
fn registry() -> Arc<InMemoryRegistry> {
    let registry = Arc::new(InMemoryRegistry::new(CHAIN));
    registry.register("myorg.iam.ewc", OWNER, LEGACY);
    registry.register("roles.myorg.iam.ewc", OWNER, LEGACY);

    let publish = |name: &str, resolver: Address, version: ResolverVersion, issuer: IssuerSpec| {
        let node = registry.register(name, OWNER, resolver);
        let leaf = name.split('.').next().unwrap_or_default();
        registry
            .publish(node, &RoleDefinition::new(leaf, issuer).into(), resolver, version)
            .unwrap();
    };

    publish(
        ADMIN,
        LEGACY,
        ResolverVersion::Legacy,
        IssuerSpec::Did { did: vec![did(1)] },
    );
    publish(
        MANAGER,
        V1,
        ResolverVersion::V1,
        IssuerSpec::Role {
            role_name: ADMIN.to_string(),
        },
    );
    publish(
        USER,
        V2,
        ResolverVersion::V2,
        IssuerSpec::Role {
            role_name: MANAGER.to_string(),
        },
    );

    registry
}

fn reader(registry: Arc<InMemoryRegistry>) -> DomainReader<InMemoryRegistry> {
    DomainReader::new(registry, CHAIN)
        .with_known_resolver(LEGACY, ResolverVersion::Legacy)
        .with_known_resolver(V1, ResolverVersion::V1)
        .with_known_resolver(V2, ResolverVersion::V2)
}

#[tokio::test]
async fn test_chain_across_resolver_versions() {
    let claims: StaticCredentialResolver = vec![
        claim(ADMIN, &did(2), &did(1)),
        claim(MANAGER, &did(3), &did(2)),
    ]
    .into_iter()
    .collect();
    let verifier = IssuerVerifier::new(Arc::new(reader(registry())), Arc::new(claims));

    let result = verifier.verify(&did(3), USER).await;
    assert!(result.verified, "{:?}", result.reason);

    let result = verifier.verify(&did(1), ADMIN).await;
    assert!(result.verified);

    let result = verifier.verify(&did(2), ADMIN).await;
    assert!(!result.verified);
}

#[tokio::test]
async fn test_manager_without_admin_credential_cannot_issue_user() {
    // did(3) claims manager authority but its manager credential was never issued.
    let claims: StaticCredentialResolver =
        vec![claim(ADMIN, &did(2), &did(1))].into_iter().collect();
    let verifier = IssuerVerifier::new(Arc::new(reader(registry())), Arc::new(claims));

    let caches = verifier.new_pass();
    let err = verifier
        .verify_issuer(&did(3), USER, &caches)
        .await
        .unwrap_err();

    match err {
        VerificationError::IssuerCredentialUnresolvable { did: who, role } => {
            assert_eq!(who, did(3));
            assert_eq!(role, MANAGER);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_deleted_role_is_not_found() {
    let registry = registry();
    registry.delete(MANAGER);

    let claims: StaticCredentialResolver =
        vec![claim(ADMIN, &did(2), &did(1))].into_iter().collect();
    let verifier = IssuerVerifier::new(Arc::new(reader(registry)), Arc::new(claims));

    let caches = verifier.new_pass();
    let err = verifier
        .verify_issuer(&did(2), MANAGER, &caches)
        .await
        .unwrap_err();
    assert!(matches!(err, VerificationError::RoleNotFound(_)));
}

#[tokio::test]
async fn test_reader_as_role_source() {
    let registry = registry();
    let org = DomainName::new("myorg.iam.ewc").unwrap();
    registry
        .publish(
            org.node(),
            &OrgDefinition::new("My Org").into(),
            LEGACY,
            ResolverVersion::Legacy,
        )
        .unwrap();
    let reader = reader(registry);

    let manager = reader
        .role_definition(&DomainName::new(MANAGER).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(manager.role_name, "manager");

    let missing = reader
        .role_definition(&DomainName::new("ghost.roles.myorg.iam.ewc").unwrap())
        .await
        .unwrap();
    assert!(missing.is_none());

    // An org definition where a role is expected is a decode problem, not absence.
    assert!(matches!(
        reader.role_definition(&org).await,
        Err(DomainError::Definition(_))
    ));
}

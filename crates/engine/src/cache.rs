//! Read-through caches for one verification pass.
//!
//! Both caches are cheap to clone and share their storage, so concurrent
//! branches of one pass see each other's entries. Populating a key twice
//! keeps the first value: racing branches compute equivalent values, and
//! readers are never locked out for longer than a map operation.

use credgov_core::{Did, DomainName, OffChainClaim, RoleDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct CachedRole {
    definition: Arc<RoleDefinition>,
    inserted_at: Instant,
}

/// Role namespace → definition.
#[derive(Debug, Clone, Default)]
pub struct RoleDefinitionCache {
    entries: Arc<RwLock<HashMap<DomainName, CachedRole>>>,
    ttl: Option<Duration>,
}

impl RoleDefinitionCache {
    /// Cache whose entries live as long as the cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose entries expire `ttl` after insertion.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::default(),
            ttl: Some(ttl),
        }
    }

    fn is_live(&self, entry: &CachedRole) -> bool {
        self.ttl
            .map_or(true, |ttl| entry.inserted_at.elapsed() < ttl)
    }

    /// Live definition for `role`, if cached.
    pub async fn get(&self, role: &DomainName) -> Option<Arc<RoleDefinition>> {
        let entries = self.entries.read().await;
        entries
            .get(role)
            .filter(|entry| self.is_live(entry))
            .map(|entry| entry.definition.clone())
    }

    /// Store `definition` unless a live entry exists; return the entry that
    /// ends up cached.
    pub async fn insert(&self, role: DomainName, definition: RoleDefinition) -> Arc<RoleDefinition> {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&role).filter(|entry| self.is_live(entry)) {
            return existing.definition.clone();
        }

        let definition = Arc::new(definition);
        entries.insert(
            role,
            CachedRole {
                definition: definition.clone(),
                inserted_at: Instant::now(),
            },
        );
        definition
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Outcome of a credential lookup, negative results included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialEntry {
    /// The subject holds this credential.
    Held(Arc<OffChainClaim>),
    /// The subject holds no credential for the role.
    Missing,
}

/// (subject, role namespace) → credential or known absence.
///
/// Keyed by [`Did::subject_key`], so every spelling of one subject shares
/// an entry.
#[derive(Debug, Clone, Default)]
pub struct CredentialCache {
    entries: Arc<RwLock<HashMap<(String, DomainName), CredentialEntry>>>,
}

impl CredentialCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(did: &Did, role: &DomainName) -> (String, DomainName) {
        (did.subject_key(), role.clone())
    }

    /// Cached lookup outcome.
    pub async fn get(&self, did: &Did, role: &DomainName) -> Option<CredentialEntry> {
        self.entries.read().await.get(&Self::key(did, role)).cloned()
    }

    /// Store `entry` unless one exists; return the entry that ends up cached.
    pub async fn insert(&self, did: &Did, role: &DomainName, entry: CredentialEntry) -> CredentialEntry {
        self.entries
            .write()
            .await
            .entry(Self::key(did, role))
            .or_insert(entry)
            .clone()
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// The two caches consulted by one top-level verification call.
#[derive(Debug, Clone, Default)]
pub struct VerificationCaches {
    /// Role definitions.
    pub roles: RoleDefinitionCache,
    /// Subject credentials.
    pub credentials: CredentialCache,
}

impl VerificationCaches {
    /// Fresh, empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh credential cache over an existing role cache.
    pub fn with_role_cache(roles: RoleDefinitionCache) -> Self {
        Self {
            roles,
            credentials: CredentialCache::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credgov_core::{Address, IssuerSpec};

    fn role_name() -> DomainName {
        DomainName::new("manager.roles.myorg.iam.ewc").unwrap()
    }

    fn definition(name: &str) -> RoleDefinition {
        RoleDefinition::new(
            name,
            IssuerSpec::Did {
                did: vec![Did::from_address(Address::repeat_byte(1))],
            },
        )
    }

    #[tokio::test]
    async fn test_role_cache_first_writer_wins() {
        let cache = RoleDefinitionCache::new();
        assert!(cache.get(&role_name()).await.is_none());

        let first = cache.insert(role_name(), definition("first")).await;
        let second = cache.insert(role_name(), definition("second")).await;
        assert_eq!(first.role_name, "first");
        assert_eq!(second.role_name, "first");
        assert_eq!(cache.get(&role_name()).await.unwrap().role_name, "first");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_role_cache_ttl() {
        let expired = RoleDefinitionCache::with_ttl(Duration::ZERO);
        expired.insert(role_name(), definition("old")).await;
        assert!(expired.get(&role_name()).await.is_none());

        // An expired entry is replaced rather than returned.
        let replaced = expired.insert(role_name(), definition("new")).await;
        assert_eq!(replaced.role_name, "new");

        let live = RoleDefinitionCache::with_ttl(Duration::from_secs(3600));
        live.insert(role_name(), definition("fresh")).await;
        assert!(live.get(&role_name()).await.is_some());

        live.clear().await;
        assert!(live.is_empty().await);
    }

    #[tokio::test]
    async fn test_credential_cache_keeps_negative_results() {
        let cache = CredentialCache::new();
        let did = Did::new("did:ethr:0xAbC0000000000000000000000000000000000001").unwrap();
        let lower = Did::new("did:ethr:0xabc0000000000000000000000000000000000001").unwrap();

        assert_eq!(
            cache.insert(&did, &role_name(), CredentialEntry::Missing).await,
            CredentialEntry::Missing
        );
        assert_eq!(
            cache.get(&lower, &role_name()).await,
            Some(CredentialEntry::Missing)
        );
    }

    #[tokio::test]
    async fn test_credential_cache_merges_did_spellings() {
        let cache = CredentialCache::new();
        let account = Address::repeat_byte(0x42);
        let short = Did::from_address(account);
        let qualified = Did::new(format!("did:ethr:volta:{}", account)).unwrap();

        cache.insert(&qualified, &role_name(), CredentialEntry::Missing).await;
        assert_eq!(
            cache.get(&short, &role_name()).await,
            Some(CredentialEntry::Missing)
        );
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_inserts_converge() {
        let roles = RoleDefinitionCache::new();
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let roles = roles.clone();
                tokio::spawn(async move {
                    roles
                        .insert(role_name(), definition(&format!("writer{}", i)))
                        .await
                })
            })
            .collect();

        let mut returned = Vec::new();
        for task in tasks {
            returned.push(task.await.unwrap().role_name.clone());
        }

        // Every writer got back the value the winner stored.
        let stored = roles.get(&role_name()).await.unwrap();
        assert!(returned.iter().all(|name| name == &stored.role_name));
        assert_eq!(roles.len().await, 1);

        let credentials = CredentialCache::new();
        let did = Did::from_address(Address::repeat_byte(7));
        let role = role_name();
        let (a, b) = tokio::join!(
            credentials.insert(&did, &role, CredentialEntry::Missing),
            credentials.insert(
                &did,
                &role,
                CredentialEntry::Held(Arc::new(OffChainClaim {
                    claim_type: role_name().to_string(),
                    claim_type_version: 1,
                    claim_data: Default::default(),
                    iss: did.clone(),
                    signer: did.clone(),
                    sub: did.clone(),
                }))
            ),
        );
        assert_eq!(a, b);
        assert_eq!(credentials.get(&did, &role_name()).await, Some(a));
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let caches = VerificationCaches::new();
        let branch = caches.clone();
        branch.roles.insert(role_name(), definition("shared")).await;
        assert!(caches.roles.get(&role_name()).await.is_some());
    }
}

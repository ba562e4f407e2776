//! Issuer authorization chain verification.
//!
//! `verify_issuer(did, role)` walks role → `IssuerSpec` → credential →
//! credential issuer until it reaches a role issued by a fixed DID list.
//! The walk is a loop rather than recursion: each link's outcome gates the
//! next, and the role sequence is fully determined by the definitions, so a
//! repeated role means the chain can never reach a DID root.

use credgov_core::{Did, DomainName, IssuerSpec, OffChainClaim, RoleDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{CredentialEntry, RoleDefinitionCache, VerificationCaches};
use crate::error::{Result, VerificationError};
use crate::resolvers::{CredentialResolver, RoleDefinitionSource};

/// Default ceiling on issuer chain length.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 16;

/// One proven link: `issuer` may issue `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainLink {
    /// Role namespace.
    pub role: DomainName,
    /// Identity authorized for it.
    pub issuer: Did,
}

/// Proof that a candidate may issue a role, from the candidate's link down
/// to the DID-rooted one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationChain {
    /// Links in walk order.
    pub links: Vec<ChainLink>,
}

impl AuthorizationChain {
    /// The DID-rooted link that ended the walk.
    pub fn root(&self) -> Option<&ChainLink> {
        self.links.last()
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the chain has no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Serializable verification report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether the issuer is authorized.
    pub verified: bool,
    /// Role that was checked.
    pub role: String,
    /// Issuer that was checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Did>,
    /// Failure reason when not verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VerificationResult {
    /// Build a report from a verification outcome.
    pub fn from_outcome(role: &str, issuer: &Did, outcome: &Result<AuthorizationChain>) -> Self {
        Self {
            verified: outcome.is_ok(),
            role: role.to_string(),
            issuer: Some(issuer.clone()),
            reason: outcome.as_ref().err().map(ToString::to_string),
        }
    }
}

/// Proves or disproves issuer authority over role definitions and stored
/// credentials.
pub struct IssuerVerifier<R, C> {
    roles: Arc<R>,
    credentials: Arc<C>,
    max_chain_depth: usize,
    shared_role_cache: Option<RoleDefinitionCache>,
}

impl<R: RoleDefinitionSource, C: CredentialResolver> IssuerVerifier<R, C> {
    /// Create a verifier with pass-scoped caches and the default depth
    /// ceiling.
    pub fn new(roles: Arc<R>, credentials: Arc<C>) -> Self {
        Self {
            roles,
            credentials,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            shared_role_cache: None,
        }
    }

    /// Set the longest issuer chain followed.
    pub fn with_max_chain_depth(mut self, max_chain_depth: usize) -> Self {
        self.max_chain_depth = max_chain_depth.max(1);
        self
    }

    /// Keep role definitions across passes for `ttl`. Credential lookups
    /// stay pass-scoped.
    pub fn with_role_cache_ttl(mut self, ttl: Duration) -> Self {
        self.shared_role_cache = Some(RoleDefinitionCache::with_ttl(ttl));
        self
    }

    /// Caches for a new top-level verification pass.
    pub fn new_pass(&self) -> VerificationCaches {
        match &self.shared_role_cache {
            Some(roles) => VerificationCaches::with_role_cache(roles.clone()),
            None => VerificationCaches::new(),
        }
    }

    /// Prove that `did` may issue `role`.
    pub async fn verify_issuer(
        &self,
        did: &Did,
        role: &str,
        caches: &VerificationCaches,
    ) -> Result<AuthorizationChain> {
        let mut role = parse_role(role)?;
        let mut candidate = did.clone();
        let mut visited: HashSet<DomainName> = HashSet::new();
        let mut links: Vec<ChainLink> = Vec::new();

        loop {
            if !visited.insert(role.clone()) {
                let mut chain: Vec<String> =
                    links.iter().map(|link| link.role.to_string()).collect();
                chain.push(role.to_string());
                return Err(VerificationError::CyclicIssuerChain { chain });
            }
            if links.len() >= self.max_chain_depth {
                return Err(VerificationError::IssuerChainTooDeep {
                    max_depth: self.max_chain_depth,
                });
            }
            links.push(ChainLink {
                role: role.clone(),
                issuer: candidate.clone(),
            });

            let definition = self.role_definition(&role, caches).await?;
            match &definition.issuer {
                IssuerSpec::Did { .. } => {
                    if definition.issuer.allows_did(&candidate) {
                        debug!("{} is a listed issuer of {}", candidate, role);
                        return Ok(AuthorizationChain { links });
                    }
                    return Err(VerificationError::NotAuthorized {
                        did: candidate,
                        role: role.to_string(),
                    });
                }
                IssuerSpec::Role { role_name } => {
                    let required = parse_role(role_name)?;
                    let claim = self.issuer_credential(&candidate, &required, caches).await?;
                    debug!(
                        "{} holds {} issued by {}, following the chain",
                        candidate, required, claim.iss
                    );
                    candidate = claim.iss.clone();
                    role = required;
                }
            }
        }
    }

    /// [`IssuerVerifier::verify_issuer`] in a fresh pass, as a report.
    pub async fn verify(&self, did: &Did, role: &str) -> VerificationResult {
        let caches = self.new_pass();
        let outcome = self.verify_issuer(did, role, &caches).await;
        match &outcome {
            Ok(chain) => info!("{} may issue {} ({} links)", did, role, chain.len()),
            Err(e) => info!("{} may not issue {}: {}", did, role, e),
        }
        VerificationResult::from_outcome(role, did, &outcome)
    }

    /// Check that the claim's issuer may issue the claimed role.
    pub async fn verify_claim(
        &self,
        claim: &OffChainClaim,
        caches: &VerificationCaches,
    ) -> VerificationResult {
        let outcome = self.verify_issuer(&claim.iss, &claim.claim_type, caches).await;
        VerificationResult::from_outcome(&claim.claim_type, &claim.iss, &outcome)
    }

    /// Check that `subject` meets every enrolment precondition of `role`:
    /// for each required role it must hold a credential whose issuer is
    /// itself verified.
    pub async fn check_enrolment(
        &self,
        subject: &Did,
        role: &str,
        caches: &VerificationCaches,
    ) -> Result<()> {
        let definition = self.role_definition(&parse_role(role)?, caches).await?;

        for required in definition.required_roles() {
            let not_met = |reason: String| VerificationError::PreconditionNotMet {
                role: required.to_string(),
                reason,
            };

            let required_name = DomainName::new(required)
                .map_err(|_| not_met("not a valid role name".to_string()))?;

            let claim = match self.issuer_credential(subject, &required_name, caches).await {
                Ok(claim) => claim,
                Err(VerificationError::IssuerCredentialUnresolvable { .. }) => {
                    return Err(not_met(format!("{} holds no {} credential", subject, required)));
                }
                Err(e) => return Err(e),
            };

            if let Err(e) = self
                .verify_issuer(&claim.iss, required_name.as_str(), caches)
                .await
            {
                return Err(not_met(e.to_string()));
            }
        }

        Ok(())
    }

    async fn role_definition(
        &self,
        role: &DomainName,
        caches: &VerificationCaches,
    ) -> Result<Arc<RoleDefinition>> {
        if let Some(definition) = caches.roles.get(role).await {
            return Ok(definition);
        }

        let definition = self
            .roles
            .role_definition(role)
            .await?
            .ok_or_else(|| VerificationError::RoleNotFound(role.to_string()))?;

        Ok(caches.roles.insert(role.clone(), definition).await)
    }

    async fn issuer_credential(
        &self,
        did: &Did,
        role: &DomainName,
        caches: &VerificationCaches,
    ) -> Result<Arc<OffChainClaim>> {
        let entry = match caches.credentials.get(did, role).await {
            Some(entry) => entry,
            None => {
                let fetched = match self.credentials.get_credential(did, role.as_str()).await {
                    Ok(fetched) => fetched,
                    Err(e) => {
                        warn!("Failed to fetch {} credential of {}: {:#}", role, did, e);
                        return Err(unresolvable(did, role));
                    }
                };

                let entry = match fetched {
                    Some(claim) if claim_matches(&claim, did, role) => {
                        CredentialEntry::Held(Arc::new(claim))
                    }
                    Some(claim) => {
                        warn!(
                            "Ignoring {} credential of {} returned for {} of {}",
                            claim.claim_type, claim.sub, role, did
                        );
                        CredentialEntry::Missing
                    }
                    None => CredentialEntry::Missing,
                };
                caches.credentials.insert(did, role, entry).await
            }
        };

        match entry {
            CredentialEntry::Held(claim) => Ok(claim),
            CredentialEntry::Missing => Err(unresolvable(did, role)),
        }
    }
}

fn parse_role(role: &str) -> Result<DomainName> {
    DomainName::new(role).map_err(|_| VerificationError::RoleNotFound(role.to_string()))
}

fn unresolvable(did: &Did, role: &DomainName) -> VerificationError {
    VerificationError::IssuerCredentialUnresolvable {
        did: did.clone(),
        role: role.to_string(),
    }
}

fn claim_matches(claim: &OffChainClaim, did: &Did, role: &DomainName) -> bool {
    claim.sub.same_subject(did)
        && DomainName::new(&claim.claim_type).is_ok_and(|claim_type| &claim_type == role)
}

//! Core types: registry nodes, domain names, DIDs and off-chain claims.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::is_meta_label;
use crate::error::CoreError;
use crate::hashing::namehash;

/// Registry node identifier (namehash of a domain).
/// Wrapper around B256 to provide domain-specific type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Node(pub B256);

impl Node {
    /// Namehash of the empty name.
    pub const ROOT: Node = Node(B256::ZERO);

    /// Create a new Node from a 32-byte hash.
    pub const fn new(bytes: B256) -> Self {
        Node(bytes)
    }

    /// Get the inner B256.
    pub const fn inner(&self) -> &B256 {
        &self.0
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }
}

impl From<B256> for Node {
    fn from(b: B256) -> Self {
        Node(b)
    }
}

impl From<[u8; 32]> for Node {
    fn from(bytes: [u8; 32]) -> Self {
        Node(B256::from(bytes))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dot-separated hierarchical name, e.g. `manager.roles.myorg.iam.ewc`.
///
/// Always non-empty and made of non-empty labels. Names are normalized to
/// lowercase so that equal names hash to equal nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Parse and normalize a domain name.
    pub fn new(name: impl AsRef<str>) -> Result<Self, CoreError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(CoreError::InvalidDomainName(name.to_string()));
        }

        let normalized = name.to_lowercase();
        let valid = normalized.split('.').all(|label| {
            !label.is_empty() && !label.chars().any(|c| c.is_whitespace() || c.is_control())
        });
        if !valid {
            return Err(CoreError::InvalidDomainName(name.to_string()));
        }

        Ok(Self(normalized))
    }

    /// The full name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Registry node of this name.
    pub fn node(&self) -> Node {
        namehash(&self.0)
    }

    /// Labels from leaf to root.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The leftmost label.
    pub fn leaf_label(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    /// Number of labels.
    pub fn depth(&self) -> usize {
        self.labels().count()
    }

    /// The parent name, or `None` for a top-level name.
    pub fn parent(&self) -> Option<DomainName> {
        self.0
            .split_once('.')
            .map(|(_, parent)| DomainName(parent.to_string()))
    }

    /// Build the child name `label.self`.
    pub fn child(&self, label: &str) -> Result<DomainName, CoreError> {
        DomainName::new(format!("{}.{}", label, self.0))
    }

    /// Whether this name lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &DomainName) -> bool {
        self.0.len() > ancestor.0.len()
            && self.0.ends_with(ancestor.as_str())
            && self.0.as_bytes()[self.0.len() - ancestor.0.len() - 1] == b'.'
    }

    /// Whether this name lies exactly one level below `parent`.
    pub fn is_child_of(&self, parent: &DomainName) -> bool {
        self.is_descendant_of(parent) && self.depth() == parent.depth() + 1
    }

    /// Whether the leaf label is a reserved meta-domain label.
    pub fn is_meta_domain(&self) -> bool {
        is_meta_label(self.leaf_label())
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DomainName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainName::new(s)
    }
}

impl TryFrom<String> for DomainName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DomainName::new(value)
    }
}

impl From<DomainName> for String {
    fn from(name: DomainName) -> Self {
        name.0
    }
}

/// Decentralized identifier, e.g. `did:ethr:volta:0xabc...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse a DID. Only the `did:<method>:<id>` shape is checked.
    pub fn new(did: impl Into<String>) -> Result<Self, CoreError> {
        let did = did.into();
        let mut parts = did.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("did"), Some(method), Some(id)) if !method.is_empty() && !id.is_empty() => {
                Ok(Did(did))
            }
            _ => Err(CoreError::InvalidDid(did)),
        }
    }

    /// `did:ethr:<address>` for an EVM account.
    pub fn from_address(address: Address) -> Self {
        Did(format!("did:ethr:{}", address.to_checksum(None)))
    }

    /// The DID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The EVM account the DID refers to, when its last segment is an address.
    pub fn address(&self) -> Option<Address> {
        self.0.rsplit(':').next()?.parse().ok()
    }

    /// Compare two DIDs by identity.
    ///
    /// `did:ethr` identifiers of the same account match regardless of the
    /// address checksum casing or an intermediate chain segment.
    pub fn same_subject(&self, other: &Did) -> bool {
        self.subject_key() == other.subject_key()
    }

    /// Lookup key that is equal for DIDs of the same subject.
    ///
    /// `did:<method>:<address>` when the DID names an account, with any
    /// chain segment dropped; the lowercased DID otherwise.
    pub fn subject_key(&self) -> String {
        match (self.method(), self.address()) {
            (Some(method), Some(address)) => format!(
                "did:{}:{}",
                method.to_ascii_lowercase(),
                address.to_string().to_ascii_lowercase()
            ),
            _ => self.0.to_ascii_lowercase(),
        }
    }

    fn method(&self) -> Option<&str> {
        self.0.split(':').nth(1)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Did::new(s)
    }
}

impl TryFrom<String> for Did {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Did::new(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

/// One key/value field of a claim payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimField {
    /// Field key, matching a `FieldDefinition` label.
    pub key: String,
    /// Field value.
    pub value: String,
}

/// Claim payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaimData {
    /// Requestor- or issuer-supplied fields.
    #[serde(default)]
    pub fields: Vec<ClaimField>,
}

/// A decoded, signature-verified role credential.
///
/// Produced by the external credential resolver. The `iss` claim is not
/// trusted until the issuer chain behind it has been proven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffChainClaim {
    /// Role namespace the claim asserts, e.g. `user.roles.myorg.iam.ewc`.
    pub claim_type: String,
    /// Definition version the claim was issued against.
    #[serde(default = "default_claim_type_version")]
    pub claim_type_version: u64,
    /// Claim payload.
    #[serde(default)]
    pub claim_data: ClaimData,
    /// Issuer DID.
    pub iss: Did,
    /// DID that produced the signature.
    pub signer: Did,
    /// Subject DID.
    pub sub: Did,
}

fn default_claim_type_version() -> u64 {
    1
}

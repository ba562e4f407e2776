//! Definition codec.
//!
//! Maps raw resolver records to and from [`DomainDefinition`]. The grammar
//! is chosen by the [`ResolverVersion`] of the resolver that answered the
//! read: the two on-chain formats are not self-describing, so payloads are
//! never sniffed.
//!
//! - [`ResolverVersion::Legacy`]: free-form JSON in the `metadata` text record.
//! - [`ResolverVersion::V1`] / [`ResolverVersion::V2`]: ABI-encoded envelope
//!   carrying an explicit format discriminator that must match the resolver.
//!
//! For every definition valid under a version, `decode(encode(d, v), v) == d`.

mod legacy;
mod structured;

use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::definition::DomainDefinition;
use crate::error::{CoreError, Result};

/// Resolver contract generation, which fixes the record grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverVersion {
    /// Public resolver storing JSON under the `metadata` text key.
    Legacy,
    /// Structured resolver, first generation (no revoker).
    V1,
    /// Structured resolver with revoker and default validity period.
    V2,
}

impl ResolverVersion {
    /// Format discriminator written into structured envelopes.
    pub const fn discriminator(&self) -> Option<u8> {
        match self {
            ResolverVersion::Legacy => None,
            ResolverVersion::V1 => Some(1),
            ResolverVersion::V2 => Some(2),
        }
    }

    /// Whether records are ABI envelopes rather than text.
    pub const fn is_structured(&self) -> bool {
        !matches!(self, ResolverVersion::Legacy)
    }

    /// Whether role records can carry a revoker distinct from the issuer
    /// and a default validity period.
    pub const fn supports_revoker(&self) -> bool {
        !matches!(self, ResolverVersion::V1)
    }

    /// Canonical lowercase string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResolverVersion::Legacy => "legacy",
            ResolverVersion::V1 => "v1",
            ResolverVersion::V2 => "v2",
        }
    }
}

impl fmt::Display for ResolverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolverVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(ResolverVersion::Legacy),
            "v1" => Ok(ResolverVersion::V1),
            "v2" => Ok(ResolverVersion::V2),
            other => Err(CoreError::MalformedDefinition(format!(
                "unknown resolver version '{other}'"
            ))),
        }
    }
}

/// Raw record as stored by a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    /// Text record value (legacy grammar).
    Text(String),
    /// ABI-encoded envelope (structured grammars).
    Structured(Bytes),
}

impl RawRecord {
    /// Whether the resolver returned nothing for this node.
    pub fn is_empty(&self) -> bool {
        match self {
            RawRecord::Text(text) => text.trim().is_empty(),
            RawRecord::Structured(bytes) => bytes.is_empty(),
        }
    }
}

/// Decode a raw record under the grammar of `version`.
pub fn decode(raw: &RawRecord, version: ResolverVersion) -> Result<DomainDefinition> {
    match (version, raw) {
        (ResolverVersion::Legacy, RawRecord::Text(text)) => legacy::decode(text),
        (ResolverVersion::V1 | ResolverVersion::V2, RawRecord::Structured(bytes)) => {
            structured::decode(bytes, version)
        }
        (ResolverVersion::Legacy, RawRecord::Structured(_)) => Err(
            CoreError::MalformedDefinition("legacy resolvers store text records".to_string()),
        ),
        (_, RawRecord::Text(_)) => Err(CoreError::MalformedDefinition(format!(
            "{version} resolvers store structured records"
        ))),
    }
}

/// Encode a definition in the grammar of `version`.
///
/// Fails with [`CoreError::UnsupportedField`] when the definition uses a
/// field `version` cannot represent.
pub fn encode(definition: &DomainDefinition, version: ResolverVersion) -> Result<RawRecord> {
    match version {
        ResolverVersion::Legacy => legacy::encode(definition).map(RawRecord::Text),
        ResolverVersion::V1 | ResolverVersion::V2 => {
            structured::encode(definition, version).map(RawRecord::Structured)
        }
    }
}

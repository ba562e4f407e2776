//! Configuration for registry access, discovery and verification.
//!
//! Loaded from TOML. `${VAR}` placeholders are expanded from the
//! environment before parsing, except inside comments.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use credgov_core::ResolverVersion;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::hierarchy::{DiscoveryOptions, HierarchyContracts};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network configuration
    pub network: NetworkConfig,

    /// Contract addresses
    pub contracts: ContractsConfig,

    /// Known resolver contracts
    #[serde(default)]
    pub resolvers: Vec<ResolverConfig>,

    /// Hierarchy discovery tuning
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Issuer verification settings
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Ethereum RPC URL
    pub rpc_url: String,

    /// Chain ID (e.g., 73799 for Volta)
    pub chain_id: u64,
}

/// Contract addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Name registry (NewOwner events, owner and resolver pointers)
    pub registry: Address,

    /// Domain notifier (DomainUpdated events)
    pub domain_notifier: Address,

    /// Public resolver whose TextChanged events are scanned during discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_resolver: Option<Address>,
}

/// A resolver contract the reader trusts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Contract address
    pub address: Address,

    /// Record grammar: "legacy", "v1" or "v2"
    pub version: ResolverVersion,
}

/// Discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// First block to scan
    #[serde(default)]
    pub from_block: u64,

    /// Blocks per log query (0 = whole range in one query)
    #[serde(default = "default_block_batch_size")]
    pub block_batch_size: u64,

    /// Maximum concurrent log queries and per-entry reads
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum parent nodes per registry log query
    #[serde(default = "default_max_topics_per_query")]
    pub max_topics_per_query: usize,
}

/// Verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Longest issuer chain followed before giving up
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,

    /// Role definition cache lifetime in seconds (0 = one verification pass)
    #[serde(default)]
    pub role_cache_ttl_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_block_batch_size() -> u64 {
    50_000
}

fn default_concurrency() -> usize {
    5
}

fn default_max_topics_per_query() -> usize {
    100
}

fn default_max_chain_depth() -> usize {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            from_block: 0,
            block_batch_size: default_block_batch_size(),
            concurrency: default_concurrency(),
            max_topics_per_query: default_max_topics_per_query(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: default_max_chain_depth(),
            role_cache_ttl_secs: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables can be referenced using `${VAR_NAME}` syntax.
    /// For example: `rpc_url = "${VOLTA_RPC_URL}"`
    ///
    /// # Example
    /// ```no_run
    /// # use credgov_registry::config::Config;
    /// let config = Config::from_file("credgov.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let expanded = expand_env_vars(&contents)?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml).context("Failed to parse TOML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url.is_empty() {
            anyhow::bail!("Network RPC URL cannot be empty");
        }
        if self.network.chain_id == 0 {
            anyhow::bail!("Chain ID must be non-zero");
        }

        if self.contracts.registry.is_zero() {
            anyhow::bail!("Contracts registry must be a non-zero address");
        }
        if self.contracts.domain_notifier.is_zero() {
            anyhow::bail!("Contracts domain_notifier must be a non-zero address");
        }

        let mut versions: HashMap<Address, ResolverVersion> = HashMap::new();
        for resolver in &self.resolvers {
            if resolver.address.is_zero() {
                anyhow::bail!("Resolver address must be non-zero");
            }
            if let Some(previous) = versions.insert(resolver.address, resolver.version) {
                if previous != resolver.version {
                    anyhow::bail!(
                        "Resolver {} is listed as both {} and {}",
                        resolver.address,
                        previous,
                        resolver.version
                    );
                }
            }
        }

        if let Some(public_resolver) = self.contracts.public_resolver {
            if public_resolver.is_zero() {
                anyhow::bail!(
                    "Contracts public_resolver must be a non-zero address when provided"
                );
            }
            if !versions.contains_key(&public_resolver) {
                anyhow::bail!(
                    "Contracts public_resolver {} must also be listed under [[resolvers]]",
                    public_resolver
                );
            }
        }

        if self.discovery.concurrency == 0 {
            anyhow::bail!("Discovery concurrency must be at least 1");
        }
        if self.discovery.max_topics_per_query == 0 {
            anyhow::bail!("Discovery max_topics_per_query must be at least 1");
        }

        if self.verification.max_chain_depth == 0 {
            anyhow::bail!("Verification max_chain_depth must be at least 1");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            );
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Invalid log format '{}', must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            );
        }

        Ok(())
    }

    /// Contract addresses for the hierarchy walker.
    pub fn hierarchy_contracts(&self) -> HierarchyContracts {
        HierarchyContracts {
            registry: self.contracts.registry,
            domain_notifier: self.contracts.domain_notifier,
            public_resolver: self.contracts.public_resolver,
        }
    }

    /// Scan tuning for the hierarchy walker.
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            from_block: self.discovery.from_block,
            block_batch_size: self.discovery.block_batch_size,
            concurrency: self.discovery.concurrency,
            max_topics_per_query: self.discovery.max_topics_per_query,
        }
    }
}

/// Where the expander currently is in the TOML text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Plain,
    Comment,
    Basic,
    Literal,
    MultiBasic,
    MultiLiteral,
}

/// Replace every `${VAR}` outside comments with the value of `VAR`.
///
/// Tracks TOML string syntax so that `#` inside a string does not start a
/// comment. Unset variables, empty names and unclosed placeholders are
/// errors.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut region = Region::Plain;
    let mut rest = input;

    while let Some(ch) = rest.chars().next() {
        let pos = input.len() - rest.len();

        // Escapes only exist in basic strings.
        if ch == '\\' && matches!(region, Region::Basic | Region::MultiBasic) {
            let escaped: String = rest.chars().take(2).collect();
            result.push_str(&escaped);
            rest = &rest[escaped.len()..];
            continue;
        }

        if ch == '$' && region != Region::Comment && rest.starts_with("${") {
            let Some(close) = rest.find('}') else {
                anyhow::bail!("Unclosed environment variable placeholder at position {}", pos);
            };
            let name = &rest[2..close];
            if name.is_empty() {
                anyhow::bail!("Empty environment variable name at position {}", pos);
            }
            let value = std::env::var(name).with_context(|| {
                format!(
                    "Environment variable '{}' is not set (referenced at position {})",
                    name, pos
                )
            })?;
            result.push_str(&value);
            rest = &rest[close + 1..];
            continue;
        }

        let (next, consumed) = match (region, ch) {
            (Region::Plain, '#') => (Region::Comment, 1),
            (Region::Plain, '"') if rest.starts_with("\"\"\"") => (Region::MultiBasic, 3),
            (Region::Plain, '"') => (Region::Basic, 1),
            (Region::Plain, '\'') if rest.starts_with("'''") => (Region::MultiLiteral, 3),
            (Region::Plain, '\'') => (Region::Literal, 1),
            (Region::Comment, '\n') => (Region::Plain, 1),
            (Region::Basic, '"') | (Region::Literal, '\'') => (Region::Plain, 1),
            (Region::MultiBasic, '"') if rest.starts_with("\"\"\"") => (Region::Plain, 3),
            (Region::MultiLiteral, '\'') if rest.starts_with("'''") => (Region::Plain, 3),
            (region, ch) => (region, ch.len_utf8()),
        };

        result.push_str(&rest[..consumed]);
        rest = &rest[consumed..];
        region = next;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[network]
rpc_url = "https://volta-rpc.energyweb.org"
chain_id = 73799

[contracts]
registry = "0x1111111111111111111111111111111111111111"
domain_notifier = "0x2222222222222222222222222222222222222222"
"#;

    #[test]
    fn test_load_full_config() {
        let toml = r#"
[network]
rpc_url = "https://volta-rpc.energyweb.org"
chain_id = 73799

[contracts]
registry = "0x1111111111111111111111111111111111111111"
domain_notifier = "0x2222222222222222222222222222222222222222"
public_resolver = "0x3333333333333333333333333333333333333333"

[[resolvers]]
address = "0x3333333333333333333333333333333333333333"
version = "legacy"

[[resolvers]]
address = "0x4444444444444444444444444444444444444444"
version = "v2"

[discovery]
from_block = 4000000
block_batch_size = 10000
concurrency = 8

[verification]
max_chain_depth = 8
role_cache_ttl_secs = 300

[logging]
level = "debug"
format = "json"
        "#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.network.chain_id, 73799);
        assert_eq!(config.resolvers.len(), 2);
        assert_eq!(config.resolvers[1].version, ResolverVersion::V2);
        assert_eq!(config.discovery.from_block, 4_000_000);
        assert_eq!(config.discovery.max_topics_per_query, 100);
        assert_eq!(config.verification.max_chain_depth, 8);

        let contracts = config.hierarchy_contracts();
        assert_eq!(
            contracts.public_resolver,
            Some(Address::repeat_byte(0x33))
        );
        assert_eq!(config.discovery_options().block_batch_size, 10_000);
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert!(config.resolvers.is_empty());
        assert_eq!(config.discovery.block_batch_size, 50_000);
        assert_eq!(config.discovery.concurrency, 5);
        assert_eq!(config.verification.max_chain_depth, 16);
        assert_eq!(config.verification.role_cache_ttl_secs, 0);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.discovery_options(), DiscoveryOptions::default());
    }

    #[test]
    fn test_validation_empty_rpc_url() {
        let toml = MINIMAL.replace("https://volta-rpc.energyweb.org", "");
        let result = Config::from_toml_str(&toml);
        assert!(result.unwrap_err().to_string().contains("RPC URL"));
    }

    #[test]
    fn test_validation_zero_registry() {
        let toml = MINIMAL.replace(
            "0x1111111111111111111111111111111111111111",
            "0x0000000000000000000000000000000000000000",
        );
        let result = Config::from_toml_str(&toml);
        assert!(result.unwrap_err().to_string().contains("registry"));
    }

    #[test]
    fn test_validation_public_resolver_must_be_known() {
        let toml = MINIMAL.replace(
            "domain_notifier = \"0x2222222222222222222222222222222222222222\"",
            "domain_notifier = \"0x2222222222222222222222222222222222222222\"\npublic_resolver = \"0x3333333333333333333333333333333333333333\"",
        );
        let result = Config::from_toml_str(&toml);
        assert!(result.unwrap_err().to_string().contains("[[resolvers]]"));
    }

    #[test]
    fn test_validation_conflicting_resolver_versions() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
[[resolvers]]
address = "0x4444444444444444444444444444444444444444"
version = "v1"

[[resolvers]]
address = "0x4444444444444444444444444444444444444444"
version = "v2"
"#
        );
        let result = Config::from_toml_str(&toml);
        assert!(result.unwrap_err().to_string().contains("both"));
    }

    #[test]
    fn test_validation_unknown_resolver_version() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
[[resolvers]]
address = "0x4444444444444444444444444444444444444444"
version = "v9"
"#
        );
        assert!(Config::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_validation_zero_concurrency() {
        let toml = format!("{}\n[discovery]\nconcurrency = 0\n", MINIMAL);
        let result = Config::from_toml_str(&toml);
        assert!(result.unwrap_err().to_string().contains("concurrency"));
    }

    #[test]
    fn test_validation_invalid_log_format() {
        let toml = format!("{}\n[logging]\nformat = \"xml\"\n", MINIMAL);
        let result = Config::from_toml_str(&toml);
        assert!(result.unwrap_err().to_string().contains("log format"));
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("CREDGOV_TEST_VAR", "hello");
        std::env::set_var("CREDGOV_TEST_A", "foo");
        std::env::set_var("CREDGOV_TEST_B", "bar");

        assert_eq!(
            expand_env_vars("value is ${CREDGOV_TEST_VAR}").unwrap(),
            "value is hello"
        );
        assert_eq!(
            expand_env_vars("${CREDGOV_TEST_A} and ${CREDGOV_TEST_B}").unwrap(),
            "foo and bar"
        );
        assert_eq!(
            expand_env_vars("no variables here").unwrap(),
            "no variables here"
        );

        std::env::remove_var("CREDGOV_TEST_VAR");
        std::env::remove_var("CREDGOV_TEST_A");
        std::env::remove_var("CREDGOV_TEST_B");
    }

    #[test]
    fn test_expand_env_vars_errors() {
        let err = expand_env_vars("x = ${CREDGOV_UNDEFINED_12345}").unwrap_err();
        assert!(err.to_string().contains("CREDGOV_UNDEFINED_12345"));

        let err = expand_env_vars("x = ${}").unwrap_err();
        assert!(err.to_string().contains("Empty"));

        let err = expand_env_vars("x = ${UNCLOSED").unwrap_err();
        assert!(err.to_string().contains("Unclosed"));
    }

    #[test]
    fn test_expand_env_vars_skips_comments() {
        let input = "# rpc_url = \"${CREDGOV_NOT_SET_IN_COMMENT}\"\nkey = 1 # ${ALSO_NOT_SET}\n";
        assert_eq!(expand_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_expand_env_vars_hash_inside_strings() {
        std::env::set_var("CREDGOV_TEST_HASH", "v");

        let input = "a = \"x#${CREDGOV_TEST_HASH}\"\nb = 'y#${CREDGOV_TEST_HASH}'\n";
        assert_eq!(expand_env_vars(input).unwrap(), "a = \"x#v\"\nb = 'y#v'\n");

        let escaped = "a = \"quote \\\" # ${CREDGOV_TEST_HASH}\"";
        assert_eq!(
            expand_env_vars(escaped).unwrap(),
            "a = \"quote \\\" # v\""
        );

        let multiline = "a = \"\"\"\nline # ${CREDGOV_TEST_HASH}\n\"\"\"\n# ${UNSET_AFTER}\n";
        assert_eq!(
            expand_env_vars(multiline).unwrap(),
            "a = \"\"\"\nline # v\n\"\"\"\n# ${UNSET_AFTER}\n"
        );

        std::env::remove_var("CREDGOV_TEST_HASH");
    }

    #[test]
    fn test_config_from_file_with_env_vars() {
        std::env::set_var("CREDGOV_TEST_RPC", "https://rpc.example.org");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            MINIMAL.replace("https://volta-rpc.energyweb.org", "${CREDGOV_TEST_RPC}")
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.network.rpc_url, "https://rpc.example.org");

        std::env::remove_var("CREDGOV_TEST_RPC");
    }
}

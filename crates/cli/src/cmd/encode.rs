use anyhow::{Context, Result};
use clap::Args;
use credgov_core::{codec, Address, DomainName, RawRecord, ResolverVersion};
use credgov_registry::config::Config;
use credgov_registry::{DomainTransactionFactory, EncodedCall, PreconditionPolicy};

#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Domain the definition is written to
    domain: DomainName,

    /// JSON definition file (roleName / orgName / appName shape)
    #[arg(long)]
    definition: String,

    /// Resolver to write through; must be listed under [[resolvers]]
    #[arg(long)]
    resolver: Address,

    /// Also create the domain under its parent, owned by this address
    #[arg(long)]
    create_with_owner: Option<Address>,

    /// Reject empty, malformed or self-referencing preconditions
    #[arg(long)]
    validate_preconditions: bool,
}

pub fn run(config: &Config, args: EncodeArgs) -> Result<()> {
    let version = config
        .resolvers
        .iter()
        .find(|resolver| resolver.address == args.resolver)
        .map(|resolver| resolver.version)
        .with_context(|| format!("Resolver {} is not configured", args.resolver))?;

    let json = std::fs::read_to_string(&args.definition)
        .with_context(|| format!("Failed to read definition file: {}", args.definition))?;
    let definition = codec::decode(&RawRecord::Text(json), ResolverVersion::Legacy)
        .context("Failed to parse definition file")?;

    let factory = DomainTransactionFactory::new(
        version,
        args.resolver,
        config.contracts.registry,
        config.contracts.domain_notifier,
    );
    let policy = if args.validate_preconditions {
        PreconditionPolicy::Validated
    } else {
        PreconditionPolicy::Verbatim
    };

    let calls: Vec<EncodedCall> = match args.create_with_owner {
        Some(owner) => {
            let parent = args
                .domain
                .parent()
                .with_context(|| format!("{} has no parent to create it under", args.domain))?;
            factory.new_domain(&parent, args.domain.leaf_label(), owner, &definition, policy)?
        }
        None => vec![
            factory.new_domain_definition(&args.domain, &definition, policy)?,
            factory.domain_updated(args.domain.node()),
        ],
    };

    eprintln!(
        "Encoded {} {} call(s) for {} ({} resolver)",
        calls.len(),
        definition.kind(),
        args.domain,
        version
    );
    for call in &calls {
        eprintln!("  to={} data=0x{}", call.to, hex::encode(&call.data));
    }

    super::print_json(&calls)
}

use anyhow::Result;
use clap::{Args, ValueEnum};
use credgov_core::DomainName;
use credgov_registry::config::Config;
use credgov_registry::{DiscoveryStrategy, DomainHierarchy, SearchMode};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    /// Scan definition-update notifications (fast, may miss silent domains)
    Resolver,
    /// Walk registry ownership events level by level (complete)
    Registry,
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Domain to list sub-domains of (e.g. myorg.iam.ewc)
    domain: DomainName,

    /// Discovery strategy
    #[arg(long, value_enum, default_value = "resolver")]
    strategy: Strategy,

    /// Only direct children
    #[arg(long)]
    first_level: bool,

    /// Print a JSON array instead of one name per line
    #[arg(long)]
    json: bool,
}

pub async fn run(config: &Config, args: DiscoverArgs) -> Result<()> {
    let reader = super::connect(config).await?;
    let hierarchy = DomainHierarchy::new(
        reader,
        config.hierarchy_contracts(),
        config.discovery_options(),
    );

    let strategy = match args.strategy {
        Strategy::Resolver => DiscoveryStrategy::ResolverLogs,
        Strategy::Registry => DiscoveryStrategy::RegistryLogs,
    };
    let mode = if args.first_level {
        SearchMode::FirstLevel
    } else {
        SearchMode::All
    };

    let domains = hierarchy
        .get_sub_domains(&args.domain, strategy, mode)
        .await?;

    if args.json {
        super::print_json(&domains)?;
    } else {
        for domain in &domains {
            println!("{}", domain);
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::Args;
use credgov_core::{codec, DomainName, RawRecord, ResolverVersion};
use credgov_registry::config::Config;

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Domain to read (e.g. manager.roles.myorg.iam.ewc)
    domain: DomainName,

    /// Also print the reverse name record
    #[arg(long)]
    with_name: bool,
}

pub async fn run(config: &Config, args: ReadArgs) -> Result<()> {
    let reader = super::connect(config).await?;
    let node = args.domain.node();

    if args.with_name {
        let name = reader.read_name(node).await?;
        println!("name: {}", name);
        println!("node: {}", node);
    }

    let definition = reader.read(&args.domain).await?;

    // The legacy grammar is plain JSON of the canonical model.
    let RawRecord::Text(json) = codec::encode(&definition, ResolverVersion::Legacy)? else {
        anyhow::bail!("Legacy encoding did not produce text");
    };
    let value: serde_json::Value =
        serde_json::from_str(&json).context("Failed to render definition")?;

    println!("kind: {}", definition.kind());
    super::print_json(&value)
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use credgov_registry::config::{Config, LoggingConfig};

mod cmd;

#[derive(Debug, Parser)]
#[command(name = "credgov")]
#[command(about = "Credential governance operator CLI")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "credgov.toml", global = true)]
    config: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered sub-domains of a domain.
    Discover(cmd::discover::DiscoverArgs),
    /// Print the definition registered at a domain.
    Read(cmd::read::ReadArgs),
    /// Encode the calls that publish a definition.
    Encode(cmd::encode::EncodeArgs),
    /// Check whether a DID may issue a role.
    VerifyIssuer(cmd::verify::VerifyIssuerArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config).context("Failed to load configuration")?;
    init_logging(cli.debug, &config.logging)?;

    match cli.command {
        Command::Discover(args) => cmd::discover::run(&config, args).await?,
        Command::Read(args) => cmd::read::run(&config, args).await?,
        Command::Encode(args) => cmd::encode::run(&config, args)?,
        Command::VerifyIssuer(args) => cmd::verify::run(&config, args).await?,
    }

    Ok(())
}

/// Initialize logging. `RUST_LOG` overrides the configured level.
fn init_logging(debug: bool, logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if debug { "debug" } else { logging.level.as_str() };
    let default_filter = format!(
        "credgov={level},credgov_registry={level},credgov_engine={level}",
        level = level
    );
    let env_filter = if debug {
        EnvFilter::new(default_filter)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

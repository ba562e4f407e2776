use anyhow::{Context, Result};
use clap::Args;
use credgov_core::{Did, OffChainClaim};
use credgov_engine::{IssuerVerifier, StaticCredentialResolver};
use credgov_registry::config::Config;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Args)]
pub struct VerifyIssuerArgs {
    /// DID of the candidate issuer
    did: Did,

    /// Role namespace (e.g. user.roles.myorg.iam.ewc)
    role: String,

    /// JSON file with an array of decoded credentials
    #[arg(long)]
    credentials: Option<String>,

    /// Also check the enrolment preconditions of the role for this DID
    #[arg(long)]
    enrolment: bool,
}

pub async fn run(config: &Config, args: VerifyIssuerArgs) -> Result<()> {
    let claims: Vec<OffChainClaim> = match &args.credentials {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read credentials file: {}", path))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse credentials file: {}", path))?
        }
        None => Vec::new(),
    };
    let credentials: StaticCredentialResolver = claims.into_iter().collect();

    let reader = super::connect(config).await?;
    let mut verifier = IssuerVerifier::new(reader, Arc::new(credentials))
        .with_max_chain_depth(config.verification.max_chain_depth);
    if config.verification.role_cache_ttl_secs > 0 {
        verifier = verifier
            .with_role_cache_ttl(Duration::from_secs(config.verification.role_cache_ttl_secs));
    }

    let result = verifier.verify(&args.did, &args.role).await;
    super::print_json(&result)?;

    if args.enrolment {
        let caches = verifier.new_pass();
        match verifier.check_enrolment(&args.did, &args.role, &caches).await {
            Ok(()) => println!("enrolment: preconditions met"),
            Err(e) => println!("enrolment: {}", e),
        }
    }

    if !result.verified {
        std::process::exit(1);
    }

    Ok(())
}

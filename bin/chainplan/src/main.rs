//! chainplan deploys an ordered contract plan with forge, then verifies every
//! deployed contract on the block explorer.

mod cli;

use anyhow::Result;
use clap::Parser;

use chainplan_deploy::{
    Config, DeployError, DeploymentPlan, Forge, Orchestrator, ResolvedConfig, rpc,
};
use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Values from `.env` behave like regular environment variables.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Initialize the logger. Stdout is reserved for the report.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref(), &cli.overrides())?.validate()?;
    tracing::info!(deployer = %config.deployer, "Deploying contracts with account");

    let plan = match &cli.plan {
        Some(path) => DeploymentPlan::load_from_file(path)?,
        None => DeploymentPlan::default_stack(),
    };

    let chain_id = preflight(&config).await?;

    let report = Orchestrator::from_config(&config, chain_id).run(&plan).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    report.log_summary();

    report.into_result()?;
    Ok(())
}

/// Checks run before anything is deployed. Returns the chain id of the endpoint.
async fn preflight(config: &ResolvedConfig) -> Result<u64, DeployError> {
    let version = Forge::from_config(config)
        .version()
        .await
        .map_err(|e| DeployError::Configuration(format!("forge is not runnable: {e:#}")))?;
    tracing::debug!(version = %version, "Found forge");

    let client = rpc::create_client().map_err(|e| DeployError::Configuration(format!("{e:#}")))?;
    let chain_id = rpc::fetch_chain_id(&client, config.rpc_url.as_str())
        .await
        .map_err(|e| DeployError::Configuration(format!("{e:#}")))?;

    if let Some(expected) = config.chain_id
        && expected != chain_id
    {
        return Err(DeployError::Configuration(format!(
            "RPC endpoint serves chain {chain_id}, expected {expected}"
        )));
    }

    tracing::info!(
        chain_id,
        rpc_host = config.rpc_url.host_str().unwrap_or_default(),
        "RPC endpoint reachable"
    );
    Ok(chain_id)
}

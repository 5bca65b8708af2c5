use std::path::PathBuf;

use chainplan_deploy::{ConfigOverrides, Secret};
use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "chainplan")]
#[command(
    author,
    version,
    about = "Deploy an ordered set of contracts with forge, then verify them on the block explorer"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "CHAINPLAN_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a TOML config file. Defaults to `chainplan.toml` when present.
    #[arg(long, alias = "conf")]
    pub config: Option<PathBuf>,

    /// Path to a TOML deployment plan.
    ///
    /// Without it, MockERC20, Hook and DynamicPoolBasedMinter(MockERC20, Hook) are deployed.
    #[arg(long, env = "CHAINPLAN_PLAN")]
    pub plan: Option<PathBuf>,

    /// JSON-RPC endpoint of the target chain (also RPC_URL, BASE_RPC_URL or CHAINPLAN_RPC_URL).
    #[arg(long, alias = "rpc")]
    pub rpc_url: Option<String>,

    /// Block explorer API key (also ETHERSCAN_API_KEY or CHAINPLAN_EXPLORER_API_KEY).
    #[arg(long)]
    pub explorer_api_key: Option<String>,

    /// Custom verification endpoint for explorers forge does not know.
    #[arg(long)]
    pub verifier_url: Option<String>,

    /// Expected chain id. The run aborts when the RPC endpoint reports another one.
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Seconds to wait between the last deployment and the first verification.
    #[arg(long, alias = "delay")]
    pub confirmation_delay: Option<u64>,

    /// Maximum number of verification requests in flight.
    #[arg(long)]
    pub verify_concurrency: Option<usize>,

    /// Root of the Foundry project holding the contracts.
    #[arg(long, alias = "root")]
    pub project_root: Option<PathBuf>,

    /// Path to the forge binary.
    #[arg(long)]
    pub forge_bin: Option<String>,

    /// Only deploy, do not verify.
    #[arg(long, env = "CHAINPLAN_SKIP_VERIFY", default_value_t = false)]
    pub skip_verify: bool,

    /// Print the report as JSON instead of tables.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl Cli {
    /// Values that take precedence over every other configuration source.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            rpc_url: self.rpc_url.clone(),
            private_key: None,
            explorer_api_key: self.explorer_api_key.clone().map(Secret::from),
            verifier_url: self.verifier_url.clone(),
            chain_id: self.chain_id,
            confirmation_delay_secs: self.confirmation_delay,
            verify: self.skip_verify.then_some(false),
            verify_concurrency: self.verify_concurrency,
            project_root: self.project_root.clone(),
            forge_bin: self.forge_bin.clone(),
        }
    }
}

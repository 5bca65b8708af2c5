//! Foundry-backed chain and explorer clients.
//!
//! Contracts are created with `forge create` and verified with
//! `forge verify-contract`, both run from the Foundry project root so that
//! artifacts and compiler settings come from the project itself.

mod cmd;

use std::{path::PathBuf, process::Output, time::Duration};

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::process::Command;

pub use cmd::{ForgeCreateCmdBuilder, ForgeVerifyCmdBuilder, redacted};

use crate::{
    ChainClient, ContractSpec, ExplorerClient, VerificationOutcome,
    config::{ResolvedConfig, Secret},
};

/// Marker printed by forge when the explorer already has the source.
const ALREADY_VERIFIED_MARKER: &str = "already verified";

/// JSON line printed by `forge create --json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForgeCreateOutput {
    deployed_to: Address,
    transaction_hash: Option<String>,
}

/// Location and limits of the `forge` binary.
#[derive(Debug, Clone)]
pub struct Forge {
    bin: String,
    root: PathBuf,
    timeout: Duration,
}

impl Forge {
    pub fn new(bin: impl Into<String>, root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            root: root.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(
            config.forge_bin.clone(),
            config.project_root.clone(),
            config.forge_timeout,
        )
    }

    /// Check that the binary runs, returning its version line.
    pub async fn version(&self) -> Result<String> {
        let output = self.run(vec!["--version".to_string()]).await?;
        if !output.status.success() {
            anyhow::bail!("`{} --version` exited with {}", self.bin, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, args: Vec<String>) -> Result<Output> {
        tracing::debug!(bin = %self.bin, args = ?redacted(&args), "Running forge");

        let mut cmd = Command::new(&self.bin);
        cmd.args(&args).current_dir(&self.root).kill_on_drop(true);

        tokio::time::timeout(self.timeout, cmd.output())
            .await
            .with_context(|| format!("`{}` timed out after {:?}", self.bin, self.timeout))?
            .with_context(|| format!("Failed to run `{}`", self.bin))
    }
}

/// Deploys contracts with `forge create`.
#[derive(Debug, Clone)]
pub struct ForgeChainClient {
    forge: Forge,
    rpc_url: String,
    private_key: Secret,
}

impl ForgeChainClient {
    pub fn new(forge: Forge, rpc_url: impl Into<String>, private_key: Secret) -> Self {
        Self {
            forge,
            rpc_url: rpc_url.into(),
            private_key,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(
            Forge::from_config(config),
            config.rpc_url.to_string(),
            config.private_key.clone(),
        )
    }
}

impl ChainClient for ForgeChainClient {
    async fn create_contract(&self, spec: &ContractSpec, args: &[DynSolValue]) -> Result<Address> {
        let cmd = ForgeCreateCmdBuilder::new(spec.artifact_id())
            .root(&self.forge.root)
            .rpc_url(&self.rpc_url)
            .private_key(self.private_key.expose())
            .constructor_args(args)
            .build();

        let output = self.forge.run(cmd).await?;
        if !output.status.success() {
            anyhow::bail!(
                "forge create exited with {}: {}",
                output.status,
                last_line(&output)
            );
        }

        let created = parse_create_output(&String::from_utf8_lossy(&output.stdout))?;
        tracing::debug!(
            contract = spec.name(),
            tx_hash = created.transaction_hash.as_deref().unwrap_or("unknown"),
            "Creation transaction mined"
        );
        Ok(created.deployed_to)
    }
}

/// Verifies contracts with `forge verify-contract`.
#[derive(Debug, Clone)]
pub struct ForgeExplorerClient {
    forge: Forge,
    chain_id: u64,
    api_key: Option<Secret>,
    verifier_url: Option<String>,
}

impl ForgeExplorerClient {
    pub fn new(
        forge: Forge,
        chain_id: u64,
        api_key: Option<Secret>,
        verifier_url: Option<String>,
    ) -> Self {
        Self {
            forge,
            chain_id,
            api_key,
            verifier_url,
        }
    }

    /// Build from a validated configuration, for the chain reported by the endpoint.
    pub fn from_config(config: &ResolvedConfig, chain_id: u64) -> Self {
        Self::new(
            Forge::from_config(config),
            chain_id,
            config.explorer_api_key.clone(),
            config.verifier_url.as_ref().map(ToString::to_string),
        )
    }
}

impl ExplorerClient for ForgeExplorerClient {
    async fn verify(
        &self,
        spec: &ContractSpec,
        address: Address,
        args: &[DynSolValue],
    ) -> Result<VerificationOutcome> {
        let mut cmd = ForgeVerifyCmdBuilder::new(address, spec.artifact_id())
            .root(&self.forge.root)
            .chain_id(self.chain_id)
            .verifier_url(self.verifier_url.as_deref())
            .constructor_args(args);
        if let Some(key) = &self.api_key {
            cmd = cmd.etherscan_api_key(key.expose());
        }

        let output = self.forge.run(cmd.build()).await?;
        classify_verify_output(&output)
    }
}

fn parse_create_output(stdout: &str) -> Result<ForgeCreateOutput> {
    stdout
        .lines()
        .rev()
        .find_map(|line| serde_json::from_str::<ForgeCreateOutput>(line.trim()).ok())
        .context("forge create output does not contain a deployment address")
}

fn classify_verify_output(output: &Output) -> Result<VerificationOutcome> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if contains_already_verified(&stdout) || contains_already_verified(&stderr) {
        return Ok(VerificationOutcome::AlreadyVerified);
    }
    if output.status.success() {
        return Ok(VerificationOutcome::Verified);
    }
    anyhow::bail!("{}", last_line(output))
}

fn contains_already_verified(text: &str) -> bool {
    text.to_lowercase().contains(ALREADY_VERIFIED_MARKER)
}

/// Last non-empty line of stderr, or of stdout when stderr is empty.
fn last_line(output: &Output) -> String {
    let pick = |bytes: &[u8]| {
        String::from_utf8_lossy(bytes)
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    };
    pick(&output.stderr)
        .or_else(|| pick(&output.stdout))
        .unwrap_or_else(|| "no output".to_string())
}

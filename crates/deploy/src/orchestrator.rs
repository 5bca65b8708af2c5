//! Two-phase run: deploy the whole plan, then verify what was deployed.

use std::time::Duration;

use crate::{
    ChainClient, ConfirmationWaiter, DeploymentPlan, ExplorerClient, TokioWaiter,
    config::ResolvedConfig,
    dispatcher::{self, Dispatcher},
    forge::{ForgeChainClient, ForgeExplorerClient},
    report::RunReport,
    sequencer::{DeploymentAborted, Sequencer},
};

/// Default pause between the last deployment and the first verification.
pub const DEFAULT_CONFIRMATION_DELAY: Duration = Duration::from_secs(5);

/// Runs a deployment plan against its collaborators.
///
/// The deployment phase is strictly sequential and stops at the first failure.
/// Once it is over, the waiter lets the explorer index the new contracts and
/// every deployed contract is verified independently.
pub struct Orchestrator<C, E, W> {
    chain: C,
    explorer: E,
    waiter: W,
    confirmation_delay: Duration,
    verify: bool,
    verify_concurrency: usize,
}

impl<C, E, W> Orchestrator<C, E, W>
where
    C: ChainClient,
    E: ExplorerClient,
    W: ConfirmationWaiter,
{
    pub fn new(chain: C, explorer: E, waiter: W) -> Self {
        Self {
            chain,
            explorer,
            waiter,
            confirmation_delay: DEFAULT_CONFIRMATION_DELAY,
            verify: true,
            verify_concurrency: 1,
        }
    }

    pub fn confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// Disable to deploy only. Every contract is then recorded as skipped.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn verify_concurrency(mut self, concurrency: usize) -> Self {
        self.verify_concurrency = concurrency.max(1);
        self
    }

    /// Execute `plan` and collect every outcome.
    ///
    /// Never fails: a fatal deployment error ends up in [`RunReport::failure`].
    /// Contracts deployed before such an error are still verified.
    pub async fn run(&self, plan: &DeploymentPlan) -> RunReport {
        tracing::info!(contracts = plan.len(), "Starting deployment");

        let (deployment, failure) = match Sequencer::new(&self.chain).deploy(plan).await {
            Ok(deployment) => (deployment, None),
            Err(DeploymentAborted { deployment, error }) => (deployment, Some(error)),
        };

        let verifications = if !self.verify {
            tracing::info!("Verification disabled, skipping");
            dispatcher::skip_all(&deployment, "verification disabled")
        } else {
            // Nothing to index when nothing was deployed.
            if !deployment.addresses.is_empty() {
                tracing::info!(
                    delay_secs = self.confirmation_delay.as_secs(),
                    "Waiting for block confirmations before verifying..."
                );
                self.waiter.wait(self.confirmation_delay).await;
            }

            Dispatcher::new(&self.explorer)
                .concurrency(self.verify_concurrency)
                .verify_all(plan, &deployment)
                .await
        };

        RunReport {
            deployments: deployment.results,
            verifications,
            failure,
        }
    }
}

impl Orchestrator<ForgeChainClient, ForgeExplorerClient, TokioWaiter> {
    /// Forge-backed orchestrator for `chain_id`, as reported by the RPC endpoint.
    pub fn from_config(config: &ResolvedConfig, chain_id: u64) -> Self {
        Self::new(
            ForgeChainClient::from_config(config),
            ForgeExplorerClient::from_config(config, chain_id),
            TokioWaiter,
        )
        .confirmation_delay(config.confirmation_delay)
        .verify(config.verify)
        .verify_concurrency(config.verify_concurrency)
    }
}

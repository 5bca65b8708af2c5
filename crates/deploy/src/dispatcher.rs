//! Verification dispatcher.
//!
//! Every deployed contract gets its own verification request and its own
//! outcome. An explorer error is captured in the record of that contract and the
//! dispatcher moves on: nothing here returns an error.

use alloy_core::primitives::Address;
use futures::StreamExt;

use crate::{
    ContractSpec, DeployedAddresses, DeploymentPlan, ExplorerClient, VerificationOutcome,
    report::{DeploymentStatus, VerificationRecord, VerificationStatus},
    sequencer::Deployment,
};

const DEPLOYMENT_FAILED: &str = "deployment failed";
const NOT_DEPLOYED: &str = "not deployed";

pub struct Dispatcher<'a, E> {
    explorer: &'a E,
    concurrency: usize,
}

impl<'a, E: ExplorerClient> Dispatcher<'a, E> {
    pub fn new(explorer: &'a E) -> Self {
        Self {
            explorer,
            concurrency: 1,
        }
    }

    /// Maximum number of verification requests in flight. Clamped to at least 1.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Verify every deployed contract of `deployment`.
    ///
    /// Returns one record per deployment result, in the same order. Contracts that
    /// were not deployed are recorded as skipped.
    pub async fn verify_all(
        &self,
        plan: &DeploymentPlan,
        deployment: &Deployment,
    ) -> Vec<VerificationRecord> {
        let jobs = deployment.results.iter().map(|result| async move {
            let spec = plan.get(&result.name);
            match (&result.status, spec) {
                (DeploymentStatus::Deployed { address, .. }, Some(spec)) => {
                    self.verify_one(spec, *address, &deployment.addresses).await
                }
                (DeploymentStatus::Deployed { address, .. }, None) => VerificationRecord {
                    name: result.name.clone(),
                    address: Some(*address),
                    status: VerificationStatus::Failed {
                        error: "contract is not part of the deployment plan".to_string(),
                    },
                },
                (DeploymentStatus::Failed { .. }, _) => skipped(&result.name, DEPLOYMENT_FAILED),
                (DeploymentStatus::NotAttempted, _) => skipped(&result.name, NOT_DEPLOYED),
            }
        });

        // `buffered` yields in input order whatever the completion order.
        futures::stream::iter(jobs)
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn verify_one(
        &self,
        spec: &ContractSpec,
        address: Address,
        deployed: &DeployedAddresses,
    ) -> VerificationRecord {
        let record = |status| VerificationRecord {
            name: spec.name().to_string(),
            address: Some(address),
            status,
        };

        // Recomputed from the final mapping, which only grew since deployment.
        let args = match spec.resolve(deployed) {
            Ok(args) => args,
            Err(err) => {
                return record(VerificationStatus::Failed {
                    error: err.to_string(),
                });
            }
        };

        tracing::info!(contract = spec.name(), address = %address, "Verifying contract...");

        match self.explorer.verify(spec, address, &args).await {
            Ok(VerificationOutcome::Verified) => {
                tracing::info!(contract = spec.name(), "Contract verified successfully");
                record(VerificationStatus::Verified)
            }
            Ok(VerificationOutcome::AlreadyVerified) => {
                tracing::info!(contract = spec.name(), "Contract was already verified");
                record(VerificationStatus::AlreadyVerified)
            }
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(contract = spec.name(), error = %error, "Verification failed");
                record(VerificationStatus::Failed { error })
            }
        }
    }
}

/// Records for a run where verification does not happen at all.
///
/// `reason` applies to the deployed contracts. The others keep the reason
/// given by their deployment status.
pub fn skip_all(deployment: &Deployment, reason: &str) -> Vec<VerificationRecord> {
    deployment
        .results
        .iter()
        .map(|result| match &result.status {
            DeploymentStatus::Deployed { address, .. } => VerificationRecord {
                address: Some(*address),
                ..skipped(&result.name, reason)
            },
            DeploymentStatus::Failed { .. } => skipped(&result.name, DEPLOYMENT_FAILED),
            DeploymentStatus::NotAttempted => skipped(&result.name, NOT_DEPLOYED),
        })
        .collect()
}

fn skipped(name: &str, reason: &str) -> VerificationRecord {
    VerificationRecord {
        name: name.to_string(),
        address: None,
        status: VerificationStatus::Skipped {
            reason: reason.to_string(),
        },
    }
}

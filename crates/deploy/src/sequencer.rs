//! Deployment sequencer.
//!
//! Deploys the specs of a plan one after the other, feeding each mined address
//! into the resolvers of the specs that follow. A failure stops the sequence:
//! later specs may depend on the address that could not be created, so they are
//! recorded as not attempted and the chain client is never called for them.

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use thiserror::Error;

use crate::{
    ChainClient, ContractSpec, DeployedAddresses, DeploymentPlan,
    error::DeployError,
    report::{DeploymentResult, DeploymentStatus},
};

/// Results of a deployment phase, in plan order.
#[derive(Debug, Clone, Default)]
pub struct Deployment {
    pub results: Vec<DeploymentResult>,
    /// Name → address for every contract that was deployed.
    pub addresses: DeployedAddresses,
}

/// The sequence stopped at a failing spec.
///
/// Contracts deployed before the failure keep their `Deployed` status: on-chain
/// deployments cannot be rolled back.
#[derive(Debug, Error)]
#[error("deployment aborted: {error}")]
pub struct DeploymentAborted {
    pub deployment: Deployment,
    #[source]
    pub error: DeployError,
}

pub struct Sequencer<'a, C> {
    chain: &'a C,
}

impl<'a, C: ChainClient> Sequencer<'a, C> {
    pub fn new(chain: &'a C) -> Self {
        Self { chain }
    }

    /// Deploy every spec of `plan` in order.
    pub async fn deploy(&self, plan: &DeploymentPlan) -> Result<Deployment, DeploymentAborted> {
        let mut deployment = Deployment {
            results: Vec::with_capacity(plan.len()),
            addresses: DeployedAddresses::default(),
        };

        for (index, spec) in plan.iter().enumerate() {
            match self.deploy_one(spec, &deployment.addresses).await {
                Ok((address, constructor_args)) => {
                    tracing::info!(
                        contract = spec.name(),
                        address = %address,
                        "Contract deployed"
                    );
                    deployment.addresses.insert(spec.name(), address);
                    deployment.results.push(DeploymentResult {
                        name: spec.name().to_string(),
                        status: DeploymentStatus::Deployed {
                            address,
                            constructor_args,
                        },
                    });
                }
                Err(error) => {
                    let remaining = plan.len() - index - 1;
                    tracing::error!(
                        contract = spec.name(),
                        error = %error,
                        not_attempted = remaining,
                        "Deployment failed, aborting the remaining sequence"
                    );

                    deployment.results.push(DeploymentResult {
                        name: spec.name().to_string(),
                        status: DeploymentStatus::Failed {
                            error: error.to_string(),
                        },
                    });
                    deployment
                        .results
                        .extend(plan.iter().skip(index + 1).map(|spec| DeploymentResult {
                            name: spec.name().to_string(),
                            status: DeploymentStatus::NotAttempted,
                        }));

                    return Err(DeploymentAborted { deployment, error });
                }
            }
        }

        Ok(deployment)
    }

    async fn deploy_one(
        &self,
        spec: &ContractSpec,
        deployed: &DeployedAddresses,
    ) -> Result<(Address, Vec<DynSolValue>), DeployError> {
        let args = spec.resolve(deployed)?;

        tracing::info!(
            contract = spec.name(),
            artifact = spec.artifact_id(),
            constructor_args = args.len(),
            "Deploying contract..."
        );

        let address = self
            .chain
            .create_contract(spec, &args)
            .await
            .map_err(|e| DeployError::Deployment {
                contract: spec.name().to_string(),
                reason: format!("{e:#}"),
            })?;

        if address.is_zero() {
            return Err(DeployError::Deployment {
                contract: spec.name().to_string(),
                reason: "chain client returned the zero address".to_string(),
            });
        }

        Ok((address, args))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Hands out `0x..01`, `0x..02`, ... and fails on the configured contract.
    #[derive(Default)]
    struct CountingChain {
        calls: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl ChainClient for CountingChain {
        async fn create_contract(
            &self,
            spec: &ContractSpec,
            _args: &[DynSolValue],
        ) -> anyhow::Result<Address> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(spec.name().to_string());
            if self.fail_on == Some(spec.name()) {
                anyhow::bail!("execution reverted");
            }
            Ok(Address::with_last_byte(calls.len() as u8))
        }
    }

    fn plan() -> DeploymentPlan {
        DeploymentPlan::new(vec![
            ContractSpec::new("TokenA"),
            ContractSpec::new("Hook"),
            ContractSpec::new("Minter").with_address_args(["TokenA", "Hook"]),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_deploys_in_plan_order() {
        let chain = CountingChain::default();
        let deployment = Sequencer::new(&chain).deploy(&plan()).await.unwrap();

        let names: Vec<_> = deployment.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["TokenA", "Hook", "Minter"]);
        assert!(deployment.results.iter().all(|r| r.address().is_some()));
        assert_eq!(
            deployment.addresses.get("Minter"),
            Some(&Address::with_last_byte(3))
        );
    }

    #[tokio::test]
    async fn test_failure_stops_the_sequence() {
        let chain = CountingChain {
            fail_on: Some("Hook"),
            ..Default::default()
        };
        let aborted = Sequencer::new(&chain).deploy(&plan()).await.unwrap_err();

        assert_eq!(*chain.calls.lock().unwrap(), vec!["TokenA", "Hook"]);
        let results = &aborted.deployment.results;
        assert!(results[0].is_deployed());
        assert!(matches!(results[1].status, DeploymentStatus::Failed { .. }));
        assert_eq!(results[2].status, DeploymentStatus::NotAttempted);
        assert_eq!(aborted.error.contract(), Some("Hook"));
    }

    #[tokio::test]
    async fn test_forward_reference_is_fatal() {
        let chain = CountingChain::default();
        let plan = DeploymentPlan::new(vec![
            ContractSpec::new("Minter").with_address_args(["TokenA"]),
            ContractSpec::new("TokenA"),
        ])
        .unwrap();

        let aborted = Sequencer::new(&chain).deploy(&plan).await.unwrap_err();
        assert!(chain.calls.lock().unwrap().is_empty());
        assert_eq!(
            aborted.error,
            DeployError::UnresolvedDependency {
                contract: "Minter".to_string(),
                dependency: "TokenA".to_string(),
            }
        );
        assert_eq!(
            aborted.deployment.results[1].status,
            DeploymentStatus::NotAttempted
        );
    }

    #[tokio::test]
    async fn test_zero_address_is_a_failure() {
        struct ZeroChain;
        impl ChainClient for ZeroChain {
            async fn create_contract(
                &self,
                _spec: &ContractSpec,
                _args: &[DynSolValue],
            ) -> anyhow::Result<Address> {
                Ok(Address::ZERO)
            }
        }

        let aborted = Sequencer::new(&ZeroChain).deploy(&plan()).await.unwrap_err();
        assert!(matches!(aborted.error, DeployError::Deployment { .. }));
    }
}

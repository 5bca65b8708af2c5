//! End-to-end tests of the orchestrator with in-memory collaborators.
//!
//! Every fake appends to one shared event log, so tests can assert on the
//! relative order of chain calls, the confirmation wait and explorer calls.
//! Run with: cargo test --test orchestrator_test

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, U256},
};
use chainplan_deploy::{
    ChainClient, ConfirmationWaiter, ContractSpec, DeployError, DeploymentPlan, DeploymentStatus,
    ExplorerClient, NoopWaiter, Orchestrator, VerificationOutcome, VerificationStatus,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Create(String, Vec<DynSolValue>),
    Wait(Duration),
    Verify(String, Address, Vec<DynSolValue>),
}

type EventLog = Arc<Mutex<Vec<Event>>>;

/// Returns fixed addresses by name, or `0x..01`, `0x..02`, ... in call order.
#[derive(Default)]
struct FakeChain {
    log: EventLog,
    addresses: HashMap<String, Address>,
    fail_on: Option<String>,
    created: Mutex<u8>,
}

impl FakeChain {
    fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }

    fn failing_on(mut self, name: &str) -> Self {
        self.fail_on = Some(name.to_string());
        self
    }

    fn with_address(mut self, name: &str, address: Address) -> Self {
        self.addresses.insert(name.to_string(), address);
        self
    }
}

impl ChainClient for FakeChain {
    async fn create_contract(
        &self,
        spec: &ContractSpec,
        args: &[DynSolValue],
    ) -> anyhow::Result<Address> {
        self.log
            .lock()
            .unwrap()
            .push(Event::Create(spec.name().to_string(), args.to_vec()));

        if self.fail_on.as_deref() == Some(spec.name()) {
            anyhow::bail!("execution reverted");
        }

        let mut created = self.created.lock().unwrap();
        *created += 1;
        Ok(self
            .addresses
            .get(spec.name())
            .copied()
            .unwrap_or_else(|| Address::with_last_byte(*created)))
    }
}

#[derive(Default)]
struct FakeExplorer {
    log: EventLog,
    failures: HashMap<String, String>,
    already_verified: HashSet<String>,
}

impl FakeExplorer {
    fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }

    fn failing_on(mut self, name: &str, error: &str) -> Self {
        self.failures.insert(name.to_string(), error.to_string());
        self
    }

    fn already_verified(mut self, name: &str) -> Self {
        self.already_verified.insert(name.to_string());
        self
    }
}

impl ExplorerClient for FakeExplorer {
    async fn verify(
        &self,
        spec: &ContractSpec,
        address: Address,
        args: &[DynSolValue],
    ) -> anyhow::Result<VerificationOutcome> {
        self.log.lock().unwrap().push(Event::Verify(
            spec.name().to_string(),
            address,
            args.to_vec(),
        ));

        if let Some(error) = self.failures.get(spec.name()) {
            anyhow::bail!("{error}");
        }
        if self.already_verified.contains(spec.name()) {
            return Ok(VerificationOutcome::AlreadyVerified);
        }
        Ok(VerificationOutcome::Verified)
    }
}

struct RecordingWaiter {
    log: EventLog,
}

impl ConfirmationWaiter for RecordingWaiter {
    async fn wait(&self, duration: Duration) {
        self.log.lock().unwrap().push(Event::Wait(duration));
    }
}

fn minter_plan() -> DeploymentPlan {
    DeploymentPlan::new(vec![
        ContractSpec::new("TokenA"),
        ContractSpec::new("Hook"),
        ContractSpec::new("Minter").with_address_args(["TokenA", "Hook"]),
    ])
    .unwrap()
}

fn linear_plan(len: usize) -> (DeploymentPlan, Vec<String>) {
    let names: Vec<String> = (0..len).map(|i| format!("C{i}")).collect();
    let specs = names
        .iter()
        .enumerate()
        .map(|(i, name)| match i {
            0 => ContractSpec::new(name.clone()),
            _ => ContractSpec::new(name.clone()).with_address_args([names[i - 1].clone()]),
        })
        .collect();
    (DeploymentPlan::new(specs).unwrap(), names)
}

fn created(log: &EventLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            Event::Create(name, _) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

fn verified(log: &EventLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            Event::Verify(name, _, _) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_deploys_every_spec_in_plan_order() {
    let log = EventLog::default();
    let (plan, names) = linear_plan(6);
    let orchestrator = Orchestrator::new(FakeChain::new(&log), FakeExplorer::new(&log), NoopWaiter);

    let report = orchestrator.run(&plan).await;

    assert_eq!(created(&log), names);
    assert_eq!(report.deployments.len(), names.len());
    for (result, name) in report.deployments.iter().zip(&names) {
        assert_eq!(&result.name, name);
        let address = result.address().expect("deployed");
        assert!(!address.is_zero());
    }
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_failure_on_kth_spec_stops_the_sequence() {
    const LEN: usize = 5;

    for k in 0..LEN {
        let log = EventLog::default();
        let (plan, names) = linear_plan(LEN);
        let orchestrator = Orchestrator::new(
            FakeChain::new(&log).failing_on(&names[k]),
            FakeExplorer::new(&log),
            NoopWaiter,
        );

        let report = orchestrator.run(&plan).await;

        // No chain call after the failing spec.
        assert_eq!(created(&log), names[..=k]);

        for (i, result) in report.deployments.iter().enumerate() {
            match i.cmp(&k) {
                std::cmp::Ordering::Less => assert!(result.is_deployed(), "spec {i}, k={k}"),
                std::cmp::Ordering::Equal => {
                    assert!(matches!(result.status, DeploymentStatus::Failed { .. }))
                }
                std::cmp::Ordering::Greater => {
                    assert_eq!(result.status, DeploymentStatus::NotAttempted)
                }
            }
        }

        assert_eq!(report.exit_code(), 1);
        assert_eq!(
            report.failure().and_then(DeployError::contract),
            Some(names[k].as_str())
        );

        // The deployed prefix is still verified.
        assert_eq!(verified(&log), names[..k]);
        for record in &report.verifications[k..] {
            assert!(matches!(record.status, VerificationStatus::Skipped { .. }));
        }
    }
}

#[tokio::test]
async fn test_single_verification_failure_is_isolated() {
    const LEN: usize = 4;

    for failing in 0..LEN {
        let log = EventLog::default();
        let (plan, names) = linear_plan(LEN);
        let orchestrator = Orchestrator::new(
            FakeChain::new(&log),
            FakeExplorer::new(&log).failing_on(&names[failing], "rate limited"),
            NoopWaiter,
        );

        let report = orchestrator.run(&plan).await;

        assert_eq!(verified(&log), names);
        assert_eq!(report.verification_failures().count(), 1);
        assert_eq!(
            report
                .verifications
                .iter()
                .filter(|r| r.status == VerificationStatus::Verified)
                .count(),
            LEN - 1
        );
        assert_eq!(
            report.verifications[failing].status,
            VerificationStatus::Failed {
                error: "rate limited".to_string()
            }
        );
        assert_eq!(report.exit_code(), 0);
    }
}

#[tokio::test]
async fn test_minter_receives_token_and_hook_addresses() {
    let log = EventLog::default();
    let orchestrator = Orchestrator::new(FakeChain::new(&log), FakeExplorer::new(&log), NoopWaiter);

    let report = orchestrator.run(&minter_plan()).await;

    let token = report.deployments[0].address().unwrap();
    let hook = report.deployments[1].address().unwrap();
    let expected = vec![DynSolValue::Address(token), DynSolValue::Address(hook)];

    assert_eq!(report.deployments[2].constructor_args(), Some(expected.as_slice()));
    assert!(log
        .lock()
        .unwrap()
        .contains(&Event::Create("Minter".to_string(), expected.clone())));

    // Verification gets the same arguments the contract was created with.
    let minter = report.deployments[2].address().unwrap();
    assert!(log
        .lock()
        .unwrap()
        .contains(&Event::Verify("Minter".to_string(), minter, expected)));
}

#[tokio::test]
async fn test_hook_verification_timeout_scenario() {
    let log = EventLog::default();
    let token = Address::with_last_byte(0xa1);
    let hook = Address::with_last_byte(0xa2);
    let minter = Address::with_last_byte(0xa3);

    let chain = FakeChain::new(&log)
        .with_address("TokenA", token)
        .with_address("Hook", hook)
        .with_address("Minter", minter);
    let explorer = FakeExplorer::new(&log).failing_on("Hook", "explorer timeout");
    let orchestrator = Orchestrator::new(chain, explorer, NoopWaiter);

    let report = orchestrator.run(&minter_plan()).await;

    let addresses: Vec<_> = report.deployments.iter().map(|r| r.address()).collect();
    assert_eq!(addresses, vec![Some(token), Some(hook), Some(minter)]);
    assert_eq!(
        report.deployments[2].constructor_args(),
        Some([DynSolValue::Address(token), DynSolValue::Address(hook)].as_slice())
    );

    let statuses: Vec<_> = report.verifications.iter().map(|r| r.status.clone()).collect();
    assert_eq!(
        statuses,
        vec![
            VerificationStatus::Verified,
            VerificationStatus::Failed {
                error: "explorer timeout".to_string()
            },
            VerificationStatus::Verified,
        ]
    );
    assert!(report.failure().is_none());
    assert_eq!(report.exit_code(), 0);
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn test_already_verified_counts_as_success() {
    let log = EventLog::default();
    let orchestrator = Orchestrator::new(
        FakeChain::new(&log),
        FakeExplorer::new(&log).already_verified("Hook"),
        NoopWaiter,
    );

    let report = orchestrator.run(&minter_plan()).await;

    assert_eq!(
        report.verifications[1].status,
        VerificationStatus::AlreadyVerified
    );
    assert!(report.verifications.iter().all(|r| r.is_success()));
    assert_eq!(report.verification_failures().count(), 0);
    assert_eq!(report.verifications.len(), 3);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_waits_once_between_phases() {
    let log = EventLog::default();
    let orchestrator = Orchestrator::new(
        FakeChain::new(&log),
        FakeExplorer::new(&log),
        RecordingWaiter { log: log.clone() },
    )
    .confirmation_delay(Duration::from_secs(5));

    orchestrator.run(&minter_plan()).await;

    let events = log.lock().unwrap().clone();
    let wait_at = events
        .iter()
        .position(|e| matches!(e, Event::Wait(_)))
        .expect("waited");
    assert_eq!(events[wait_at], Event::Wait(Duration::from_secs(5)));
    assert_eq!(
        events.iter().filter(|e| matches!(e, Event::Wait(_))).count(),
        1
    );
    assert!(events[..wait_at].iter().all(|e| matches!(e, Event::Create(..))));
    assert!(events[wait_at + 1..].iter().all(|e| matches!(e, Event::Verify(..))));
}

#[tokio::test]
async fn test_skip_verify_never_calls_the_explorer() {
    let log = EventLog::default();
    let orchestrator = Orchestrator::new(
        FakeChain::new(&log),
        FakeExplorer::new(&log),
        RecordingWaiter { log: log.clone() },
    )
    .verify(false);

    let report = orchestrator.run(&minter_plan()).await;

    assert_eq!(created(&log).len(), 3);
    assert!(
        !log.lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, Event::Wait(_) | Event::Verify(..)))
    );
    assert!(report
        .verifications
        .iter()
        .all(|r| matches!(r.status, VerificationStatus::Skipped { .. })));
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_no_wait_when_nothing_was_deployed() {
    let log = EventLog::default();
    let orchestrator = Orchestrator::new(
        FakeChain::new(&log).failing_on("TokenA"),
        FakeExplorer::new(&log),
        RecordingWaiter { log: log.clone() },
    );

    let report = orchestrator.run(&minter_plan()).await;

    assert_eq!(*log.lock().unwrap(), vec![Event::Create("TokenA".to_string(), vec![])]);
    let statuses: Vec<_> = report.verifications.iter().map(|r| r.status.clone()).collect();
    assert_eq!(
        statuses,
        vec![
            VerificationStatus::Skipped {
                reason: "deployment failed".to_string()
            },
            VerificationStatus::Skipped {
                reason: "not deployed".to_string()
            },
            VerificationStatus::Skipped {
                reason: "not deployed".to_string()
            },
        ]
    );
    assert!(matches!(
        report.clone().into_result(),
        Err(DeployError::Deployment { contract, .. }) if contract == "TokenA"
    ));
}

#[tokio::test]
async fn test_manifest_plan_end_to_end() {
    let log = EventLog::default();
    let plan = DeploymentPlan::from_toml_str(
        r#"
        [[contract]]
        name = "MockERC20"

        [[contract]]
        name = "Hook"

        [[contract]]
        name = "DynamicPoolBasedMinter"
        args = ["@MockERC20", "@Hook", { type = "uint256", value = "1000" }]
        "#,
    )
    .unwrap();
    let orchestrator = Orchestrator::new(FakeChain::new(&log), FakeExplorer::new(&log), NoopWaiter);

    let report = orchestrator.run(&plan).await;

    let args = report.deployments[2].constructor_args().unwrap();
    assert_eq!(args.len(), 3);
    assert_eq!(args[0], DynSolValue::Address(Address::with_last_byte(1)));
    assert_eq!(args[1], DynSolValue::Address(Address::with_last_byte(2)));
    assert_eq!(args[2], DynSolValue::Uint(U256::from(1000), 256));
    assert_eq!(report.exit_code(), 0);
}

//! Run report: the terminal artifact of one orchestrator invocation.

use std::fmt;

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use comfy_table::Table;
use serde::{Serialize, Serializer};

use crate::{abi, error::DeployError};

/// Outcome of deploying one spec of the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentResult {
    pub name: String,
    #[serde(flatten)]
    pub status: DeploymentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, strum::Display)]
#[serde(tag = "status", rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeploymentStatus {
    Deployed {
        address: Address,
        #[serde(serialize_with = "abi::serialize_args")]
        constructor_args: Vec<DynSolValue>,
    },
    Failed {
        error: String,
    },
    NotAttempted,
}

impl DeploymentResult {
    pub fn address(&self) -> Option<Address> {
        match &self.status {
            DeploymentStatus::Deployed { address, .. } => Some(*address),
            _ => None,
        }
    }

    /// Constructor arguments used for the creation call, if it succeeded.
    pub fn constructor_args(&self) -> Option<&[DynSolValue]> {
        match &self.status {
            DeploymentStatus::Deployed {
                constructor_args, ..
            } => Some(constructor_args.as_slice()),
            _ => None,
        }
    }

    pub fn is_deployed(&self) -> bool {
        matches!(self.status, DeploymentStatus::Deployed { .. })
    }
}

/// Outcome of verifying one spec of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationRecord {
    pub name: String,
    pub address: Option<Address>,
    #[serde(flatten)]
    pub status: VerificationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::Display)]
#[serde(tag = "status", rename_all = "snake_case")]
#[strum(serialize_all = "kebab-case")]
pub enum VerificationStatus {
    Verified,
    /// The explorer already knew the source. Counts as a success.
    AlreadyVerified,
    Failed {
        error: String,
    },
    Skipped {
        reason: String,
    },
}

impl VerificationRecord {
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            VerificationStatus::Verified | VerificationStatus::AlreadyVerified
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, VerificationStatus::Failed { .. })
    }
}

/// Deployment results and verification records of one run, both in plan order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub deployments: Vec<DeploymentResult>,
    pub verifications: Vec<VerificationRecord>,
    /// The fatal error that stopped the deployment phase, if any.
    #[serde(serialize_with = "serialize_failure")]
    pub failure: Option<DeployError>,
}

impl RunReport {
    /// True when every spec of the plan was deployed.
    pub fn deployment_complete(&self) -> bool {
        self.failure.is_none() && self.deployments.iter().all(DeploymentResult::is_deployed)
    }

    /// Process exit code: verification outcomes never change it.
    pub fn exit_code(&self) -> u8 {
        if self.deployment_complete() { 0 } else { 1 }
    }

    pub fn failure(&self) -> Option<&DeployError> {
        self.failure.as_ref()
    }

    /// The fatal deployment error as an `Err`, once the report has been rendered.
    pub fn into_result(self) -> Result<(), DeployError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn verification_failures(&self) -> impl Iterator<Item = &VerificationRecord> {
        self.verifications.iter().filter(|record| record.is_failed())
    }

    pub fn not_attempted(&self) -> impl Iterator<Item = &DeploymentResult> {
        self.deployments
            .iter()
            .filter(|result| matches!(result.status, DeploymentStatus::NotAttempted))
    }

    pub fn deployment_table(&self) -> Table {
        let mut table = Table::new();
        table.set_header(vec!["Contract", "Deployment", "Address", "Constructor args"]);
        for result in &self.deployments {
            let (address, detail) = match &result.status {
                DeploymentStatus::Deployed {
                    address,
                    constructor_args,
                } => (
                    address.to_checksum(None),
                    constructor_args
                        .iter()
                        .map(abi::format_arg)
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                DeploymentStatus::Failed { error } => ("-".to_string(), error.clone()),
                DeploymentStatus::NotAttempted => ("-".to_string(), String::new()),
            };
            table.add_row(vec![
                result.name.clone(),
                result.status.to_string(),
                address,
                detail,
            ]);
        }
        table
    }

    pub fn verification_table(&self) -> Table {
        let mut table = Table::new();
        table.set_header(vec!["Contract", "Verification", "Details"]);
        for record in &self.verifications {
            let detail = match &record.status {
                VerificationStatus::Failed { error } => error.clone(),
                VerificationStatus::Skipped { reason } => reason.clone(),
                VerificationStatus::Verified | VerificationStatus::AlreadyVerified => {
                    String::new()
                }
            };
            table.add_row(vec![record.name.clone(), record.status.to_string(), detail]);
        }
        table
    }

    /// Emit a one-line summary plus one warning per failed verification.
    pub fn log_summary(&self) {
        for record in self.verification_failures() {
            if let VerificationStatus::Failed { error } = &record.status {
                tracing::warn!(contract = %record.name, error = %error, "Verification failed");
            }
        }

        let deployed = self.deployments.iter().filter(|r| r.is_deployed()).count();
        let verified = self.verifications.iter().filter(|r| r.is_success()).count();
        match &self.failure {
            Some(err) => tracing::error!(
                deployed,
                total = self.deployments.len(),
                not_attempted = self.not_attempted().count(),
                error = %err,
                "Deployment aborted"
            ),
            None => tracing::info!(
                deployed,
                verified,
                verification_failures = self.verification_failures().count(),
                "Run complete"
            ),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.deployment_table())?;
        write!(f, "{}", self.verification_table())?;
        if let Some(err) = &self.failure {
            write!(f, "\n\nDeployment aborted: {err}")?;
        }
        Ok(())
    }
}

fn serialize_failure<S>(failure: &Option<DeployError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match failure {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

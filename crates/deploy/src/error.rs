//! Error taxonomy of the orchestrator.
//!
//! Every variant of [`DeployError`] is fatal to a run. Verification failures are
//! not part of this taxonomy: they are recorded per contract in the report and
//! never propagate.

use thiserror::Error;

/// Fatal errors raised before or during the deployment phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeployError {
    /// Missing or invalid external configuration. Raised before any deployment.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The plan manifest could not be read or contains an invalid entry.
    #[error("invalid deployment plan: {0}")]
    InvalidPlan(String),

    /// Two specs of the same plan share a name.
    #[error("contract `{0}` appears more than once in the deployment plan")]
    DuplicateContract(String),

    /// A constructor argument references a contract that is not deployed yet.
    #[error("contract `{contract}` depends on `{dependency}`, which is not deployed before it")]
    UnresolvedDependency { contract: String, dependency: String },

    /// The chain client failed to create the contract.
    #[error("failed to deploy `{contract}`: {reason}")]
    Deployment { contract: String, reason: String },
}

impl DeployError {
    /// Name of the contract this error is attached to, if any.
    pub fn contract(&self) -> Option<&str> {
        match self {
            Self::UnresolvedDependency { contract, .. } | Self::Deployment { contract, .. } => {
                Some(contract)
            }
            Self::DuplicateContract(name) => Some(name),
            Self::Configuration(_) | Self::InvalidPlan(_) => None,
        }
    }
}

/// A resolver asked for an address that is not in the mapping yet.
///
/// Resolvers only know the name they looked up, the owning contract is attached
/// by [`crate::ContractSpec::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{dependency}` has not been deployed")]
pub struct MissingDependency {
    pub dependency: String,
}

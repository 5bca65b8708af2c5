//! chainplan-deploy - Ordered contract deployment with post-deployment verification.
//!
//! A [`DeploymentPlan`] lists the contracts to create, in order, each with a
//! resolver computing its constructor arguments from the addresses of the
//! contracts deployed before it. The [`Orchestrator`] deploys the plan through a
//! [`ChainClient`], waits for the explorer to catch up, then verifies every
//! deployed contract through an [`ExplorerClient`]. The outcome of both phases
//! is collected into a [`RunReport`].

mod abi;
mod manifest;

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod forge;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod rpc;
pub mod sequencer;
pub mod traits;

pub use abi::{encode_constructor_args, format_arg};
pub use config::{Config, ConfigOverrides, ResolvedConfig, Secret};
pub use dispatcher::Dispatcher;
pub use error::{DeployError, MissingDependency};
pub use forge::{Forge, ForgeChainClient, ForgeExplorerClient};
pub use orchestrator::Orchestrator;
pub use plan::{ContractSpec, DeployedAddresses, DeploymentPlan, Resolver};
pub use report::{
    DeploymentResult, DeploymentStatus, RunReport, VerificationRecord, VerificationStatus,
};
pub use sequencer::{Deployment, DeploymentAborted, Sequencer};
pub use traits::{
    ChainClient, ConfirmationWaiter, ExplorerClient, NoopWaiter, TokioWaiter, VerificationOutcome,
};

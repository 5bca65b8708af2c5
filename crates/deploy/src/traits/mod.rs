//! Collaborator seams of the orchestrator.
//!
//! The orchestrator only talks to the outside world through these traits:
//! - [`ChainClient`] creates contracts and returns their mined address
//! - [`ExplorerClient`] submits source verification for a deployed contract
//! - [`ConfirmationWaiter`] delays verification until the explorer caught up
//!
//! Production implementations live in [`crate::forge`] and in this module
//! ([`TokioWaiter`]). Tests plug in-memory fakes and [`NoopWaiter`].

mod chain;
mod explorer;
mod waiter;

pub use chain::ChainClient;
pub use explorer::{ExplorerClient, VerificationOutcome};
pub use waiter::{ConfirmationWaiter, NoopWaiter, TokioWaiter};

//! Explorer client trait.

use std::future::Future;

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use anyhow::Result;
use serde::Serialize;

use crate::ContractSpec;

/// Successful result of a verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum VerificationOutcome {
    /// The explorer accepted and verified the source.
    Verified,
    /// The explorer already had the source for this address.
    AlreadyVerified,
}

/// Submits source-code verification requests to a block explorer.
pub trait ExplorerClient: Send + Sync {
    /// Verify the contract deployed at `address`.
    fn verify(
        &self,
        spec: &ContractSpec,
        address: Address,
        args: &[DynSolValue],
    ) -> impl Future<Output = Result<VerificationOutcome>> + Send;
}

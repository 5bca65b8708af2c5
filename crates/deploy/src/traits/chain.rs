//! Chain client trait.

use std::future::Future;

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use anyhow::Result;

use crate::ContractSpec;

/// Submits contract-creation transactions.
pub trait ChainClient: Send + Sync {
    /// Deploy `spec` with the given constructor arguments.
    ///
    /// The returned future resolves once the creation transaction is mined, with
    /// the address of the new contract. Reverts, timeouts and network faults are
    /// returned as errors.
    fn create_contract(
        &self,
        spec: &ContractSpec,
        args: &[DynSolValue],
    ) -> impl Future<Output = Result<Address>> + Send;
}

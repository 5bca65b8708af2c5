//! Deployment plan model.
//!
//! A [`DeploymentPlan`] is an ordered list of [`ContractSpec`]s. The order is both
//! the dependency order and the deployment order: a spec's resolver may only look
//! up contracts that appear before it.

use std::{collections::HashMap, fmt, sync::Arc};

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use derive_more::Deref;

use crate::error::{DeployError, MissingDependency};

/// Pure function computing constructor arguments from the addresses deployed so far.
pub type Resolver =
    Arc<dyn Fn(&DeployedAddresses) -> Result<Vec<DynSolValue>, MissingDependency> + Send + Sync>;

/// Addresses of the contracts deployed so far, keyed by contract name.
///
/// Only the sequencer inserts into the mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct DeployedAddresses(HashMap<String, Address>);

impl DeployedAddresses {
    /// Look up the address of a previously deployed contract.
    pub fn require(&self, name: &str) -> Result<Address, MissingDependency> {
        self.0.get(name).copied().ok_or_else(|| MissingDependency {
            dependency: name.to_string(),
        })
    }

    /// Look up a previously deployed contract as an `address` argument.
    pub fn address_arg(&self, name: &str) -> Result<DynSolValue, MissingDependency> {
        self.require(name).map(DynSolValue::Address)
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, address: Address) {
        self.0.insert(name.into(), address);
    }
}

impl FromIterator<(String, Address)> for DeployedAddresses {
    fn from_iter<I: IntoIterator<Item = (String, Address)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A single contract to deploy.
#[derive(Clone)]
pub struct ContractSpec {
    name: String,
    artifact: String,
    resolver: Resolver,
}

impl ContractSpec {
    /// Create a spec whose constructor takes no arguments.
    ///
    /// The artifact identifier defaults to the contract name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            artifact: name.clone(),
            name,
            resolver: Arc::new(|_| Ok(Vec::new())),
        }
    }

    /// Set the artifact identifier (`path/To.sol:Name` or just `Name`).
    pub fn artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = artifact.into();
        self
    }

    /// Set the constructor argument resolver.
    pub fn with_args<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&DeployedAddresses) -> Result<Vec<DynSolValue>, MissingDependency>
            + Send
            + Sync
            + 'static,
    {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Constructor takes the addresses of the given contracts, in order.
    pub fn with_address_args<I, S>(self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dependencies: Vec<String> = dependencies.into_iter().map(Into::into).collect();
        self.with_args(move |deployed| {
            dependencies
                .iter()
                .map(|dep| deployed.address_arg(dep))
                .collect()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact
    }

    /// Evaluate the resolver against the current mapping.
    pub fn resolve(&self, deployed: &DeployedAddresses) -> Result<Vec<DynSolValue>, DeployError> {
        (self.resolver)(deployed).map_err(|missing| DeployError::UnresolvedDependency {
            contract: self.name.clone(),
            dependency: missing.dependency,
        })
    }
}

impl fmt::Debug for ContractSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractSpec")
            .field("name", &self.name)
            .field("artifact", &self.artifact)
            .finish_non_exhaustive()
    }
}

/// Ordered list of contracts to deploy.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    specs: Vec<ContractSpec>,
}

impl DeploymentPlan {
    /// Build a plan, rejecting duplicate names.
    pub fn new(specs: Vec<ContractSpec>) -> Result<Self, DeployError> {
        let mut seen = std::collections::HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name()) {
                return Err(DeployError::DuplicateContract(spec.name().to_string()));
            }
        }
        Ok(Self { specs })
    }

    /// The stack deployed by default: an ERC20 mock, a hook, and a minter wired to both.
    pub fn default_stack() -> Self {
        Self {
            specs: vec![
                ContractSpec::new("MockERC20"),
                ContractSpec::new("Hook"),
                ContractSpec::new("DynamicPoolBasedMinter")
                    .with_address_args(["MockERC20", "Hook"]),
            ],
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ContractSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ContractSpec> {
        self.specs.iter().find(|spec| spec.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(ContractSpec::name).collect()
    }
}

impl<'a> IntoIterator for &'a DeploymentPlan {
    type Item = &'a ContractSpec;
    type IntoIter = std::slice::Iter<'a, ContractSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

//! TOML plan manifests.
//!
//! ```toml
//! [[contract]]
//! name = "MockERC20"
//!
//! [[contract]]
//! name = "DynamicPoolBasedMinter"
//! artifact = "src/Minter.sol:DynamicPoolBasedMinter"
//! args = ["@MockERC20", { type = "uint256", value = "1000" }]
//! ```
//!
//! `"@Name"` refers to the address of a contract listed earlier in the file.
//! References are checked when the manifest is loaded, so a malformed plan is
//! rejected before anything is deployed.

use std::{collections::HashSet, path::Path};

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use serde::Deserialize;

use crate::{ContractSpec, DeploymentPlan, error::DeployError};

/// Prefix marking a reference to a previously deployed contract.
const REFERENCE_PREFIX: char = '@';

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanManifest {
    #[serde(rename = "contract", default)]
    contracts: Vec<ContractEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContractEntry {
    name: String,
    artifact: Option<String>,
    #[serde(default)]
    args: Vec<ArgEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArgEntry {
    Reference(String),
    Typed {
        #[serde(rename = "type")]
        ty: String,
        value: String,
    },
}

/// An argument with its literal already parsed.
#[derive(Debug, Clone)]
enum ArgTemplate {
    Address(String),
    Value(DynSolValue),
}

impl DeploymentPlan {
    /// Load a plan from a TOML manifest on disk.
    pub fn load_from_file(path: &Path) -> Result<Self, DeployError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::InvalidPlan(format!("failed to read {}: {e}", path.display()))
        })?;
        let plan = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), contracts = plan.len(), "Deployment plan loaded");
        Ok(plan)
    }

    /// Parse a plan from TOML manifest content.
    pub fn from_toml_str(content: &str) -> Result<Self, DeployError> {
        let manifest: PlanManifest = toml::from_str(content)
            .map_err(|e| DeployError::InvalidPlan(format!("failed to parse manifest: {e}")))?;

        if manifest.contracts.is_empty() {
            return Err(DeployError::InvalidPlan(
                "manifest does not list any contract".to_string(),
            ));
        }

        let mut earlier: HashSet<String> = HashSet::new();
        let mut specs = Vec::with_capacity(manifest.contracts.len());

        for entry in manifest.contracts {
            if earlier.contains(&entry.name) {
                return Err(DeployError::DuplicateContract(entry.name));
            }

            let templates = entry
                .args
                .into_iter()
                .enumerate()
                .map(|(index, arg)| parse_arg(&entry.name, index, arg, &earlier))
                .collect::<Result<Vec<_>, _>>()?;

            let mut spec = ContractSpec::new(entry.name.clone()).with_args(move |deployed| {
                templates
                    .iter()
                    .map(|template| match template {
                        ArgTemplate::Address(dep) => deployed.address_arg(dep),
                        ArgTemplate::Value(value) => Ok(value.clone()),
                    })
                    .collect()
            });
            if let Some(artifact) = entry.artifact {
                spec = spec.artifact(artifact);
            }

            earlier.insert(entry.name);
            specs.push(spec);
        }

        DeploymentPlan::new(specs)
    }
}

fn parse_arg(
    contract: &str,
    index: usize,
    arg: ArgEntry,
    earlier: &HashSet<String>,
) -> Result<ArgTemplate, DeployError> {
    match arg {
        ArgEntry::Reference(raw) => {
            let Some(dependency) = raw.strip_prefix(REFERENCE_PREFIX) else {
                return Err(DeployError::InvalidPlan(format!(
                    "argument {index} of `{contract}` is a bare string `{raw}`; use \"@Name\" or {{ type = \"...\", value = \"...\" }}"
                )));
            };
            if !earlier.contains(dependency) {
                return Err(DeployError::UnresolvedDependency {
                    contract: contract.to_string(),
                    dependency: dependency.to_string(),
                });
            }
            Ok(ArgTemplate::Address(dependency.to_string()))
        }
        ArgEntry::Typed { ty, value } => {
            let sol_type: DynSolType = ty.parse().map_err(|e| {
                DeployError::InvalidPlan(format!(
                    "argument {index} of `{contract}` has invalid type `{ty}`: {e}"
                ))
            })?;
            let value = sol_type.coerce_str(&value).map_err(|e| {
                DeployError::InvalidPlan(format!(
                    "argument {index} of `{contract}` is not a valid {ty}: {e}"
                ))
            })?;
            Ok(ArgTemplate::Value(value))
        }
    }
}

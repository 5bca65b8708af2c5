//! Layered run configuration.
//!
//! Sources, lowest to highest precedence:
//! 1. built-in defaults
//! 2. the TOML config file (`chainplan.toml` unless another path is given)
//! 3. the plain `.env` names `BASE_RPC_URL`, `RPC_URL`, `PRIVATE_KEY` and `ETHERSCAN_API_KEY`
//! 4. `CHAINPLAN_*` environment variables
//! 5. command-line overrides

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use alloy_core::primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, Visitor},
};
use url::Url;

use crate::error::DeployError;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "chainplan.toml";

/// Prefix of the environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "CHAINPLAN_";

/// A string that never shows up in `Debug` output or logs.
///
/// Environment values made only of digits reach serde as integers, so those
/// are accepted too and kept in their decimal form.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SecretVisitor)
    }
}

struct SecretVisitor;

impl Visitor<'_> for SecretVisitor {
    type Value = Secret;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or an integer")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Secret, E> {
        Ok(Secret::new(value))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Secret, E> {
        Ok(Secret(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Secret, E> {
        Ok(Secret(value.to_string()))
    }

    fn visit_u128<E: de::Error>(self, value: u128) -> Result<Secret, E> {
        Ok(Secret(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Secret, E> {
        Ok(Secret(value.to_string()))
    }

    fn visit_i128<E: de::Error>(self, value: i128) -> Result<Secret, E> {
        Ok(Secret(value.to_string()))
    }
}

/// Raw configuration as merged from every source. Not validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON-RPC endpoint of the target chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    /// Hex-encoded key of the deployer account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<Secret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_api_key: Option<Secret>,
    /// Custom verification endpoint, for explorers forge does not know.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_url: Option<String>,
    /// Expected chain id. Checked against the endpoint before deploying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    pub confirmation_delay_secs: u64,
    pub verify: bool,
    pub verify_concurrency: usize,
    /// Foundry project holding the contract sources.
    pub project_root: PathBuf,
    pub forge_bin: String,
    /// Upper bound for a single forge invocation.
    pub forge_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: None,
            private_key: None,
            explorer_api_key: None,
            verifier_url: None,
            chain_id: None,
            confirmation_delay_secs: 5,
            verify: true,
            verify_concurrency: 1,
            project_root: PathBuf::from("."),
            forge_bin: "forge".to_string(),
            forge_timeout_secs: 300,
        }
    }
}

/// Values set on the command line. `None` leaves the lower layers untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<Secret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_api_key: Option<Secret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_delay_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forge_bin: Option<String>,
}

impl Config {
    /// Merge every configuration source.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// read when present.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, DeployError> {
        let file = match path {
            Some(path) if !path.exists() => {
                return Err(DeployError::Configuration(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        Self::figment(&file, overrides)
            .extract()
            .map_err(|e| DeployError::Configuration(e.to_string()))
    }

    fn figment(file: &Path, overrides: &ConfigOverrides) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            // RPC_URL wins over BASE_RPC_URL when both are set.
            .merge(Env::raw().only(&["BASE_RPC_URL"]).map(|_| "rpc_url".into()))
            .merge(Env::raw().only(&["RPC_URL", "PRIVATE_KEY"]))
            .merge(
                Env::raw()
                    .only(&["ETHERSCAN_API_KEY"])
                    .map(|_| "explorer_api_key".into()),
            )
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    /// Check every value needed for a run.
    pub fn validate(&self) -> Result<ResolvedConfig, DeployError> {
        let rpc_url = self
            .rpc_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                config_error("RPC URL is not set (RPC_URL, BASE_RPC_URL or CHAINPLAN_RPC_URL)")
            })?;
        let rpc_url = Url::parse(rpc_url)
            .map_err(|e| config_error(format!("invalid RPC URL `{rpc_url}`: {e}")))?;

        let private_key = self
            .private_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| config_error("private key is not set (PRIVATE_KEY)"))?;
        // The parse error is dropped, it may echo the key.
        let signer = PrivateKeySigner::from_str(private_key.expose().trim())
            .map_err(|_| config_error("private key is not a valid secp256k1 key"))?;

        let explorer_api_key = self.explorer_api_key.clone().filter(|key| !key.is_empty());
        if self.verify && explorer_api_key.is_none() {
            return Err(config_error(
                "explorer API key is not set (ETHERSCAN_API_KEY), required unless verification is skipped",
            ));
        }

        let verifier_url = self
            .verifier_url
            .as_deref()
            .map(|url| {
                Url::parse(url).map_err(|e| config_error(format!("invalid verifier URL `{url}`: {e}")))
            })
            .transpose()?;

        if self.verify_concurrency == 0 {
            return Err(config_error("verify_concurrency must be at least 1"));
        }

        Ok(ResolvedConfig {
            rpc_url,
            deployer: signer.address(),
            private_key,
            explorer_api_key,
            verifier_url,
            chain_id: self.chain_id,
            confirmation_delay: Duration::from_secs(self.confirmation_delay_secs),
            verify: self.verify,
            verify_concurrency: self.verify_concurrency,
            project_root: self.project_root.clone(),
            forge_bin: self.forge_bin.clone(),
            forge_timeout: Duration::from_secs(self.forge_timeout_secs),
        })
    }
}

/// Configuration that passed [`Config::validate`].
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub rpc_url: Url,
    pub private_key: Secret,
    /// Address derived from `private_key`.
    pub deployer: Address,
    /// Always set when `verify` is true.
    pub explorer_api_key: Option<Secret>,
    pub verifier_url: Option<Url>,
    pub chain_id: Option<u64>,
    pub confirmation_delay: Duration,
    pub verify: bool,
    pub verify_concurrency: usize,
    pub project_root: PathBuf,
    pub forge_bin: String,
    pub forge_timeout: Duration,
}

fn config_error(message: impl Into<String>) -> DeployError {
    DeployError::Configuration(message.into())
}

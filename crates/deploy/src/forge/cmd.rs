//! Command builders for `forge create` and `forge verify-contract`.

use std::path::Path;

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};

use crate::abi;

/// Placeholder printed instead of secrets.
const REDACTED: &str = "<redacted>";

/// Flags whose value must never be logged.
const SECRET_FLAGS: &[&str] = &["--private-key", "--etherscan-api-key"];

/// Builder for `forge create` commands.
#[derive(Debug, Clone)]
pub struct ForgeCreateCmdBuilder {
    artifact: String,
    rpc_url: Option<String>,
    private_key: Option<String>,
    root: Option<String>,
    constructor_args: Vec<String>,
}

impl ForgeCreateCmdBuilder {
    /// Create a new builder for the given contract identifier.
    pub fn new(artifact: impl Into<String>) -> Self {
        Self {
            artifact: artifact.into(),
            rpc_url: None,
            private_key: None,
            root: None,
            constructor_args: Vec::new(),
        }
    }

    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    pub fn private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    /// Set the Foundry project root.
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = Some(root.as_ref().display().to_string());
        self
    }

    pub fn constructor_args(mut self, args: &[DynSolValue]) -> Self {
        self.constructor_args = args.iter().map(abi::format_arg).collect();
        self
    }

    /// Build the arguments, without the `forge` binary itself.
    pub fn build(self) -> Vec<String> {
        let mut cmd = vec![
            "create".to_string(),
            self.artifact,
            "--broadcast".to_string(),
            "--json".to_string(),
        ];

        if let Some(root) = self.root {
            cmd.push("--root".to_string());
            cmd.push(root);
        }

        if let Some(rpc_url) = self.rpc_url {
            cmd.push("--rpc-url".to_string());
            cmd.push(rpc_url);
        }

        if let Some(private_key) = self.private_key {
            cmd.push("--private-key".to_string());
            cmd.push(private_key);
        }

        // Variadic flag, must stay last.
        if !self.constructor_args.is_empty() {
            cmd.push("--constructor-args".to_string());
            cmd.extend(self.constructor_args);
        }

        cmd
    }
}

/// Builder for `forge verify-contract` commands.
#[derive(Debug, Clone)]
pub struct ForgeVerifyCmdBuilder {
    address: Address,
    artifact: String,
    chain_id: Option<u64>,
    etherscan_api_key: Option<String>,
    verifier_url: Option<String>,
    root: Option<String>,
    encoded_args: String,
}

impl ForgeVerifyCmdBuilder {
    pub fn new(address: Address, artifact: impl Into<String>) -> Self {
        Self {
            address,
            artifact: artifact.into(),
            chain_id: None,
            etherscan_api_key: None,
            verifier_url: None,
            root: None,
            encoded_args: String::new(),
        }
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn etherscan_api_key(mut self, key: impl Into<String>) -> Self {
        self.etherscan_api_key = Some(key.into());
        self
    }

    /// Use a custom explorer verification endpoint.
    pub fn verifier_url(mut self, url: Option<impl Into<String>>) -> Self {
        self.verifier_url = url.map(Into::into);
        self
    }

    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = Some(root.as_ref().display().to_string());
        self
    }

    /// ABI-encode the constructor arguments for the explorer.
    pub fn constructor_args(mut self, args: &[DynSolValue]) -> Self {
        self.encoded_args = abi::encode_constructor_args(args);
        self
    }

    pub fn build(self) -> Vec<String> {
        let mut cmd = vec![
            "verify-contract".to_string(),
            self.address.to_checksum(None),
            self.artifact,
        ];

        if let Some(root) = self.root {
            cmd.push("--root".to_string());
            cmd.push(root);
        }

        if let Some(chain_id) = self.chain_id {
            cmd.push("--chain".to_string());
            cmd.push(chain_id.to_string());
        }

        if let Some(key) = self.etherscan_api_key {
            cmd.push("--etherscan-api-key".to_string());
            cmd.push(key);
        }

        if let Some(url) = self.verifier_url {
            cmd.push("--verifier-url".to_string());
            cmd.push(url);
        }

        if !self.encoded_args.is_empty() {
            cmd.push("--constructor-args".to_string());
            cmd.push(format!("0x{}", self.encoded_args));
        }

        // Block until the explorer has processed the submission.
        cmd.push("--watch".to_string());

        cmd
    }
}

/// Copy of `args` safe to log: values of secret flags are replaced.
pub fn redacted(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            out.push(REDACTED.to_string());
            hide_next = false;
        } else {
            hide_next = SECRET_FLAGS.contains(&arg.as_str());
            out.push(arg.clone());
        }
    }
    out
}

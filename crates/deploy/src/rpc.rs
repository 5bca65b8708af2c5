//! JSON-RPC helpers used by the preflight checks.

use std::time::Duration;

use anyhow::Context;
use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempts of the chain-id probe after the first one.
const CHAIN_ID_RETRIES: usize = 3;

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error: {}",
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Query `eth_chainId`, retrying with exponential backoff.
pub async fn fetch_chain_id(client: &reqwest::Client, url: &str) -> Result<u64, anyhow::Error> {
    let probe = || async {
        let raw: String = json_rpc_call(client, url, "eth_chainId", vec![]).await?;
        parse_quantity(&raw)
    };

    probe
        .retry(ExponentialBuilder::default().with_max_times(CHAIN_ID_RETRIES))
        .sleep(tokio::time::sleep)
        .notify(|err, after| {
            tracing::debug!(error = %err, retry_in = ?after, "eth_chainId failed, retrying...");
        })
        .await
        .with_context(|| format!("RPC endpoint {url} did not answer eth_chainId"))
}

/// Parse a hex-encoded JSON-RPC quantity such as `0x14a34`.
fn parse_quantity(raw: &str) -> Result<u64, anyhow::Error> {
    let digits = raw
        .strip_prefix("0x")
        .with_context(|| format!("Quantity `{raw}` is not 0x-prefixed"))?;
    u64::from_str_radix(digits, 16).with_context(|| format!("Invalid quantity `{raw}`"))
}

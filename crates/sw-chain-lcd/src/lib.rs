use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use sw_api_types::{Address, ChainConfig, ChainId, ContractAddress, Denom, GasPriceStep, Permit, TxHash};
use sw_chain_client::{BroadcastOutcome, ChainTransport, ExecuteMsg, TransportConnector};
use sw_wallet_bridge::OfflineSigner;
use tracing::debug;

/// Real LCD (REST) adapter for a Secret-style chain.
///
/// Bound to one signer and one sender address at construction. Honors a
/// `SECRETWRAP_LCD_URL` override so the testnet endpoint can be swapped
/// without rebuilding.
pub struct LcdTransport {
    endpoint: String,
    chain_id: ChainId,
    minimal_denom: Denom,
    gas_price_step: GasPriceStep,
    http: reqwest::Client,
    signer: Arc<dyn OfflineSigner>,
    sender: Address,
}

impl LcdTransport {
    pub fn new(config: &ChainConfig, signer: Arc<dyn OfflineSigner>, sender: Address) -> Self {
        let endpoint = std::env::var("SECRETWRAP_LCD_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| config.lcd_url.clone());
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            chain_id: config.chain_id.clone(),
            minimal_denom: config.minimal_denom.clone(),
            gas_price_step: config.gas_price_step,
            http: reqwest::Client::new(),
            signer,
            sender,
        }
    }

    async fn account_meta(&self) -> (String, String) {
        let url = format!(
            "{}/cosmos/auth/v1beta1/accounts/{}",
            self.endpoint, self.sender.0
        );
        // A missing account (never funded) signs with fresh meta.
        let fallback = ("0".to_owned(), "0".to_owned());
        let Ok(response) = self.http.get(&url).send().await else {
            return fallback;
        };
        if !response.status().is_success() {
            return fallback;
        }
        let Ok(body) = response.json::<AccountResponse>().await else {
            return fallback;
        };
        (body.account.account_number, body.account.sequence)
    }
}

// ── LCD REST API types ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BankBalanceResponse {
    balance: CoinDto,
}

#[derive(Debug, Deserialize)]
struct CoinDto {
    #[allow(dead_code)]
    denom: String,
    amount: String,
}

#[derive(Debug, Deserialize)]
struct ComputeQueryResponse {
    data: Value,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: AccountDto,
}

#[derive(Debug, Deserialize)]
struct AccountDto {
    #[serde(default)]
    account_number: String,
    #[serde(default)]
    sequence: String,
}

#[derive(Debug, Serialize)]
struct BroadcastRequest {
    tx_bytes: String,
    mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    tx_response: TxResponseDto,
}

#[derive(Debug, Deserialize)]
struct TxResponseDto {
    #[serde(default)]
    txhash: String,
    #[serde(default)]
    code: u32,
    #[serde(default)]
    raw_log: String,
}

/// Amino representation of an ordered execute-message list.
fn amino_msgs(msgs: &[ExecuteMsg]) -> Value {
    let values: Vec<Value> = msgs
        .iter()
        .map(|msg| {
            json!({
                "type": "wasm/MsgExecuteContract",
                "value": {
                    "sender": msg.sender.0,
                    "contract": msg.contract.0,
                    "msg": msg.msg,
                    "sent_funds": msg.funds,
                }
            })
        })
        .collect();
    Value::Array(values)
}

/// Fee in minimal units for a fixed gas limit at the average gas price,
/// rounded up so the fee never undershoots.
fn fee_minor(gas_price: f64, gas_limit: u64) -> u128 {
    (gas_price * gas_limit as f64).ceil() as u128
}

#[async_trait(?Send)]
impl ChainTransport for LcdTransport {
    async fn bank_balance(&self, address: &Address, denom: &Denom) -> Result<u128> {
        let url = format!(
            "{}/cosmos/bank/v1beta1/balances/{}/by_denom?denom={}",
            self.endpoint, address.0, denom.0
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("bank balance transport")?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            // Unfunded account: zero balance
            return Ok(0);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("bank balance HTTP {status}: {text}");
        }

        let body: BankBalanceResponse = response.json().await.context("bank balance parse")?;
        body.balance
            .amount
            .parse()
            .context("bank balance amount not an integer")
    }

    async fn contract_query(
        &self,
        contract: &ContractAddress,
        query: Value,
        permit: Option<&Permit>,
    ) -> Result<Value> {
        let envelope = match permit {
            Some(permit) => json!({ "with_permit": { "query": query, "permit": permit } }),
            None => query,
        };
        let encoded = STANDARD.encode(serde_json::to_vec(&envelope)?);
        let url = format!(
            "{}/compute/v1beta1/query/{}?query={}",
            self.endpoint, contract.0, encoded
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("contract query transport")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("contract query HTTP {status}: {text}");
        }

        let body: ComputeQueryResponse = response.json().await.context("contract query parse")?;
        Ok(body.data)
    }

    async fn broadcast(&self, msgs: Vec<ExecuteMsg>, gas_limit: u64) -> Result<BroadcastOutcome> {
        let (account_number, sequence) = self.account_meta().await;
        let fee = fee_minor(self.gas_price_step.average, gas_limit);

        let sign_doc = json!({
            "chain_id": self.chain_id.0,
            "account_number": account_number,
            "sequence": sequence,
            "fee": {
                "amount": [{ "denom": self.minimal_denom.0, "amount": fee.to_string() }],
                "gas": gas_limit.to_string(),
            },
            "msgs": amino_msgs(&msgs),
            "memo": "",
        });

        let signed = self
            .signer
            .sign_amino(sign_doc)
            .await
            .map_err(|err| anyhow::anyhow!("wallet signing failed: {err}"))?;

        let tx_bytes = STANDARD.encode(serde_json::to_vec(&signed)?);
        let url = format!("{}/cosmos/tx/v1beta1/txs", self.endpoint);
        let response = self
            .http
            .post(&url)
            .json(&BroadcastRequest {
                tx_bytes: tx_bytes.clone(),
                mode: "BROADCAST_MODE_SYNC",
            })
            .send()
            .await
            .context("broadcast transport")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("broadcast HTTP {status}: {text}");
        }

        let body: BroadcastResponse = response.json().await.context("broadcast parse")?;
        let tx_hash = if body.tx_response.txhash.is_empty() {
            // Some gateways omit the hash on sync broadcast; derive a
            // deterministic one from the signed bytes.
            use sha2::{Digest, Sha256};
            let hash = Sha256::digest(tx_bytes.as_bytes());
            format!("txn_{}", hex_lower(&hash))
        } else {
            body.tx_response.txhash
        };

        debug!(tx_hash = %tx_hash, code = body.tx_response.code, "broadcast included");
        Ok(BroadcastOutcome {
            tx_hash: TxHash(tx_hash),
            code: body.tx_response.code,
            raw_log: body.tx_response.raw_log,
        })
    }
}

/// Builds an [`LcdTransport`] bound to the session's signer and address.
pub struct LcdConnector;

impl TransportConnector for LcdConnector {
    fn connect(
        &self,
        config: &ChainConfig,
        signer: Arc<dyn OfflineSigner>,
        address: &Address,
    ) -> Result<Arc<dyn ChainTransport>> {
        Ok(Arc::new(LcdTransport::new(config, signer, address.clone())))
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_api_types::Coin;

    #[test]
    fn fee_rounds_up_at_the_average_gas_price() {
        assert_eq!(fee_minor(0.25, 100_000), 25_000);
        assert_eq!(fee_minor(0.1, 100_001), 10_001);
    }

    #[test]
    fn amino_msgs_carry_funds_and_entry_point() {
        let msg = ExecuteMsg::deposit(
            Address("secret1sender".to_owned()),
            ContractAddress("secret1sscrt".to_owned()),
            Coin {
                denom: "uscrt".to_owned(),
                amount: "10000000".to_owned(),
            },
        );
        let value = amino_msgs(std::slice::from_ref(&msg));

        assert_eq!(value[0]["type"], "wasm/MsgExecuteContract");
        assert_eq!(value[0]["value"]["msg"], json!({ "deposit": {} }));
        assert_eq!(value[0]["value"]["sent_funds"][0]["amount"], "10000000");
        assert_eq!(value[0]["value"]["sent_funds"][0]["denom"], "uscrt");
    }
}

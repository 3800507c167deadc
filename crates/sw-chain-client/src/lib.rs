use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use sw_api_types::{Address, ChainConfig, Coin, ContractAddress, Denom, Permit, TxHash};
use sw_wallet_bridge::OfflineSigner;

/// A contract-execution instruction: the on-chain form of one conversion.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExecuteMsg {
    pub sender: Address,
    pub contract: ContractAddress,
    pub msg: Value,
    pub funds: Vec<Coin>,
}

impl ExecuteMsg {
    /// Deposit call: the attached funds *are* the deposit amount; the
    /// message body carries no amount argument.
    pub fn deposit(sender: Address, contract: ContractAddress, funds: Coin) -> Self {
        Self {
            sender,
            contract,
            msg: json!({ "deposit": {} }),
            funds: vec![funds],
        }
    }

    /// Redeem call: the scaled amount is an explicit argument, no funds.
    pub fn redeem(sender: Address, contract: ContractAddress, amount_minor: u128) -> Self {
        Self {
            sender,
            contract,
            msg: json!({ "redeem": { "amount": amount_minor.to_string() } }),
            funds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BroadcastOutcome {
    pub tx_hash: TxHash,
    pub code: u32,
    pub raw_log: String,
}

impl BroadcastOutcome {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Opaque RPC/query/broadcast transport bound to one chain and one signer.
#[async_trait(?Send)]
pub trait ChainTransport {
    /// Bank-module balance lookup, in minimal units.
    async fn bank_balance(&self, address: &Address, denom: &Denom) -> Result<u128>;

    /// Smart-contract query; `permit` gates access to private state.
    async fn contract_query(
        &self,
        contract: &ContractAddress,
        query: Value,
        permit: Option<&Permit>,
    ) -> Result<Value>;

    /// Signs and broadcasts an ordered message list with a fixed gas limit.
    async fn broadcast(&self, msgs: Vec<ExecuteMsg>, gas_limit: u64) -> Result<BroadcastOutcome>;
}

/// Builds a transport bound to (config, signer, address); this is the
/// construct-client step of session establishment.
pub trait TransportConnector {
    fn connect(
        &self,
        config: &ChainConfig,
        signer: Arc<dyn OfflineSigner>,
        address: &Address,
    ) -> Result<Arc<dyn ChainTransport>>;
}

// ── In-memory transport ──

#[derive(Default)]
struct Ledger {
    bank: HashMap<(String, String), u128>,
    wrapped: HashMap<(String, String), u128>,
    broadcasts: Vec<Vec<ExecuteMsg>>,
    last_gas_limit: Option<u64>,
    owner: Option<Address>,
    fail_bank: bool,
    fail_wrapped: bool,
    fail_broadcast: bool,
    revert: Option<(u32, String)>,
}

/// Deterministic in-process transport with real deposit/redeem ledger
/// semantics plus injectable failures. Backs the session and conversion
/// tests the same way the production LCD adapter backs the browser shell.
pub struct InMemoryTransport {
    native_denom: Denom,
    ledger: Mutex<Ledger>,
}

impl InMemoryTransport {
    pub fn new(native_denom: Denom) -> Self {
        Self {
            native_denom,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Binds the account the permit-gated queries answer for. Done by the
    /// connector at session establishment.
    pub fn bind_owner(&self, address: &Address) {
        self.ledger.lock().unwrap().owner = Some(address.clone());
    }

    pub fn set_bank_balance(&self, address: &Address, denom: &Denom, amount: u128) {
        let mut ledger = self.ledger.lock().unwrap();
        ledger
            .bank
            .insert((address.0.clone(), denom.0.clone()), amount);
    }

    pub fn set_wrapped_balance(&self, contract: &ContractAddress, address: &Address, amount: u128) {
        let mut ledger = self.ledger.lock().unwrap();
        ledger
            .wrapped
            .insert((contract.0.clone(), address.0.clone()), amount);
    }

    pub fn fail_bank_queries(&self, fail: bool) {
        self.ledger.lock().unwrap().fail_bank = fail;
    }

    pub fn fail_wrapped_queries(&self, fail: bool) {
        self.ledger.lock().unwrap().fail_wrapped = fail;
    }

    pub fn fail_broadcasts(&self, fail: bool) {
        self.ledger.lock().unwrap().fail_broadcast = fail;
    }

    /// Makes the next broadcast come back included-but-reverted.
    pub fn revert_next_broadcast(&self, code: u32, raw_log: &str) {
        self.ledger.lock().unwrap().revert = Some((code, raw_log.to_owned()));
    }

    pub fn broadcast_count(&self) -> usize {
        self.ledger.lock().unwrap().broadcasts.len()
    }

    pub fn last_broadcast(&self) -> Option<Vec<ExecuteMsg>> {
        self.ledger.lock().unwrap().broadcasts.last().cloned()
    }

    pub fn last_gas_limit(&self) -> Option<u64> {
        self.ledger.lock().unwrap().last_gas_limit
    }

    fn apply(&self, ledger: &mut Ledger, msg: &ExecuteMsg) -> Result<()> {
        if msg.msg.get("deposit").is_some() {
            let Some(coin) = msg.funds.first() else {
                bail!("deposit requires attached funds");
            };
            let amount: u128 = coin.amount.parse()?;
            let bank_key = (msg.sender.0.clone(), coin.denom.clone());
            let held = ledger.bank.get(&bank_key).copied().unwrap_or(0);
            if held < amount {
                bail!("insufficient funds: {} < {}", held, amount);
            }
            ledger.bank.insert(bank_key, held - amount);
            let wrapped_key = (msg.contract.0.clone(), msg.sender.0.clone());
            *ledger.wrapped.entry(wrapped_key).or_insert(0) += amount;
        } else if let Some(redeem) = msg.msg.get("redeem") {
            let amount: u128 = redeem
                .get("amount")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .parse()?;
            let wrapped_key = (msg.contract.0.clone(), msg.sender.0.clone());
            let held = ledger.wrapped.get(&wrapped_key).copied().unwrap_or(0);
            if held < amount {
                bail!("insufficient wrapped balance: {} < {}", held, amount);
            }
            ledger.wrapped.insert(wrapped_key, held - amount);
            let bank_key = (msg.sender.0.clone(), self.native_denom.0.clone());
            *ledger.bank.entry(bank_key).or_insert(0) += amount;
        } else {
            bail!("unsupported execute message: {}", msg.msg);
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ChainTransport for InMemoryTransport {
    async fn bank_balance(&self, address: &Address, denom: &Denom) -> Result<u128> {
        let ledger = self.ledger.lock().unwrap();
        if ledger.fail_bank {
            bail!("bank query unavailable");
        }
        Ok(ledger
            .bank
            .get(&(address.0.clone(), denom.0.clone()))
            .copied()
            .unwrap_or(0))
    }

    async fn contract_query(
        &self,
        contract: &ContractAddress,
        query: Value,
        permit: Option<&Permit>,
    ) -> Result<Value> {
        let ledger = self.ledger.lock().unwrap();
        if ledger.fail_wrapped {
            bail!("contract unreachable");
        }
        let Some(permit) = permit else {
            bail!("query requires a permit");
        };
        if query.get("balance").is_none() {
            bail!("unsupported query: {query}");
        }
        let scoped = permit
            .params
            .allowed_tokens
            .iter()
            .any(|token| token == contract);
        if !scoped {
            bail!("permit not scoped to contract {}", contract.0);
        }
        let Some(owner) = ledger.owner.clone() else {
            bail!("transport not bound to an account");
        };
        let amount = ledger
            .wrapped
            .get(&(contract.0.clone(), owner.0))
            .copied()
            .unwrap_or(0);
        Ok(json!({ "balance": { "amount": amount.to_string() } }))
    }

    async fn broadcast(&self, msgs: Vec<ExecuteMsg>, gas_limit: u64) -> Result<BroadcastOutcome> {
        let mut ledger = self.ledger.lock().unwrap();
        if ledger.fail_broadcast {
            bail!("broadcast transport unavailable");
        }
        ledger.broadcasts.push(msgs.clone());
        ledger.last_gas_limit = Some(gas_limit);
        let seq = ledger.broadcasts.len();

        if let Some((code, raw_log)) = ledger.revert.take() {
            return Ok(BroadcastOutcome {
                tx_hash: TxHash(format!("inmem-{seq}")),
                code,
                raw_log,
            });
        }

        // The whole tx applies atomically: any failing message undoes the
        // effects of the ones before it, as on a real chain.
        let checkpoint = (ledger.bank.clone(), ledger.wrapped.clone());
        for msg in &msgs {
            if let Err(err) = self.apply(&mut ledger, msg) {
                (ledger.bank, ledger.wrapped) = checkpoint.clone();
                return Ok(BroadcastOutcome {
                    tx_hash: TxHash(format!("inmem-{seq}")),
                    code: 5,
                    raw_log: err.to_string(),
                });
            }
        }

        Ok(BroadcastOutcome {
            tx_hash: TxHash(format!("inmem-{seq}")),
            code: 0,
            raw_log: String::new(),
        })
    }
}

/// Connector over a pre-seeded [`InMemoryTransport`].
pub struct InMemoryConnector(pub Arc<InMemoryTransport>);

impl TransportConnector for InMemoryConnector {
    fn connect(
        &self,
        _config: &ChainConfig,
        _signer: Arc<dyn OfflineSigner>,
        address: &Address,
    ) -> Result<Arc<dyn ChainTransport>> {
        self.0.bind_owner(address);
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_api_types::{PermitParams, PermitSignature, PubKey};

    fn permit_for(contract: &ContractAddress) -> Permit {
        Permit {
            params: PermitParams {
                permit_name: "test".to_owned(),
                allowed_tokens: vec![contract.clone()],
                chain_id: sw_api_types::ChainId("pulsar-2".to_owned()),
                permissions: vec!["owner".to_owned(), "balance".to_owned()],
            },
            signature: PermitSignature {
                pub_key: PubKey {
                    key_type: "tendermint/PubKeySecp256k1".to_owned(),
                    value: "AA==".to_owned(),
                },
                signature: "c2ln".to_owned(),
            },
        }
    }

    #[tokio::test]
    async fn deposit_moves_native_into_wrapped() -> anyhow::Result<()> {
        let address = Address("secret1sender".to_owned());
        let contract = ContractAddress("secret1sscrt".to_owned());
        let denom = Denom("uscrt".to_owned());
        let transport = InMemoryTransport::new(denom.clone());
        transport.bind_owner(&address);
        transport.set_bank_balance(&address, &denom, 100_000_000);

        let msg = ExecuteMsg::deposit(
            address.clone(),
            contract.clone(),
            Coin {
                denom: denom.0.clone(),
                amount: "10000000".to_owned(),
            },
        );
        let outcome = transport.broadcast(vec![msg], 100_000).await?;
        assert!(outcome.is_success());

        assert_eq!(transport.bank_balance(&address, &denom).await?, 90_000_000);
        let result = transport
            .contract_query(&contract, json!({ "balance": {} }), Some(&permit_for(&contract)))
            .await?;
        assert_eq!(result["balance"]["amount"], "10000000");
        Ok(())
    }

    #[tokio::test]
    async fn redeem_moves_wrapped_back_to_native() -> anyhow::Result<()> {
        let address = Address("secret1sender".to_owned());
        let contract = ContractAddress("secret1sscrt".to_owned());
        let denom = Denom("uscrt".to_owned());
        let transport = InMemoryTransport::new(denom.clone());
        transport.set_wrapped_balance(&contract, &address, 5_000_000);

        let msg = ExecuteMsg::redeem(address.clone(), contract.clone(), 2_000_000);
        let outcome = transport.broadcast(vec![msg], 100_000).await?;
        assert!(outcome.is_success());
        assert_eq!(transport.bank_balance(&address, &denom).await?, 2_000_000);
        Ok(())
    }

    #[tokio::test]
    async fn overdrawn_deposit_comes_back_as_reverted_inclusion() -> anyhow::Result<()> {
        let address = Address("secret1sender".to_owned());
        let contract = ContractAddress("secret1sscrt".to_owned());
        let denom = Denom("uscrt".to_owned());
        let transport = InMemoryTransport::new(denom.clone());
        transport.set_bank_balance(&address, &denom, 1);

        let msg = ExecuteMsg::deposit(
            address.clone(),
            contract,
            Coin {
                denom: denom.0.clone(),
                amount: "10".to_owned(),
            },
        );
        let outcome = transport.broadcast(vec![msg], 100_000).await?;
        assert!(!outcome.is_success());
        // Failed execution must not move funds.
        assert_eq!(transport.bank_balance(&address, &denom).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failing_message_rolls_back_the_whole_broadcast() -> anyhow::Result<()> {
        let address = Address("secret1sender".to_owned());
        let contract = ContractAddress("secret1sscrt".to_owned());
        let denom = Denom("uscrt".to_owned());
        let transport = InMemoryTransport::new(denom.clone());
        transport.bind_owner(&address);
        transport.set_bank_balance(&address, &denom, 10_000_000);

        // The first deposit fits, the second overdraws what is left.
        let coin = |amount: &str| Coin {
            denom: denom.0.clone(),
            amount: amount.to_owned(),
        };
        let msgs = vec![
            ExecuteMsg::deposit(address.clone(), contract.clone(), coin("6000000")),
            ExecuteMsg::deposit(address.clone(), contract.clone(), coin("6000000")),
        ];
        let outcome = transport.broadcast(msgs, 100_000).await?;
        assert!(!outcome.is_success());

        // The first message's effects were undone with the rest of the tx.
        assert_eq!(transport.bank_balance(&address, &denom).await?, 10_000_000);
        let result = transport
            .contract_query(&contract, json!({ "balance": {} }), Some(&permit_for(&contract)))
            .await?;
        assert_eq!(result["balance"]["amount"], "0");
        Ok(())
    }

    #[tokio::test]
    async fn wrapped_query_without_permit_is_refused() {
        let transport = InMemoryTransport::new(Denom("uscrt".to_owned()));
        let contract = ContractAddress("secret1sscrt".to_owned());
        let result = transport
            .contract_query(&contract, json!({ "balance": {} }), None)
            .await;
        assert!(result.is_err());
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainId(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Denom(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractAddress(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxHash(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GasPriceStep {
    pub low: f64,
    pub average: f64,
    pub high: f64,
}

/// Immutable descriptor of the target chain. Built once at startup and
/// passed by reference everywhere; never mutated.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub rpc_url: String,
    pub lcd_url: String,
    pub coin_type: u32,
    pub denom: String,
    pub minimal_denom: Denom,
    pub decimals: u32,
    pub bech32_prefix: String,
    pub gas_price_step: GasPriceStep,
    pub gas_limit: u64,
    pub wrapped_token: ContractAddress,
    pub features: Vec<String>,
}

impl ChainConfig {
    /// The pulsar-2 Secret testnet with the sSCRT wrapping contract.
    pub fn pulsar_testnet() -> Self {
        Self {
            chain_id: ChainId("pulsar-2".to_owned()),
            chain_name: "Secret Testnet".to_owned(),
            rpc_url: "https://rpc.pulsar.scrttestnet.com".to_owned(),
            lcd_url: "https://api.pulsar.scrttestnet.com".to_owned(),
            coin_type: 529,
            denom: "SCRT".to_owned(),
            minimal_denom: Denom("uscrt".to_owned()),
            decimals: 6,
            bech32_prefix: "secret".to_owned(),
            gas_price_step: GasPriceStep {
                low: 0.1,
                average: 0.25,
                high: 0.4,
            },
            gas_limit: 100_000,
            wrapped_token: ContractAddress(
                "secret18vd8fpwxzck93qlwghaj6arh4p7c5n8978vsyg".to_owned(),
            ),
            features: vec!["secretwasm".to_owned()],
        }
    }
}

// ── Wallet chain-suggestion descriptor ──
//
// The wallet's JS surface takes a camelCase structured descriptor; these
// DTOs serialize to exactly that shape.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub coin_denom: String,
    pub coin_minimal_denom: String,
    pub coin_decimals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bip44 {
    pub coin_type: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bech32Config {
    pub bech32_prefix_acc_addr: String,
    pub bech32_prefix_acc_pub: String,
    pub bech32_prefix_val_addr: String,
    pub bech32_prefix_val_pub: String,
    pub bech32_prefix_cons_addr: String,
    pub bech32_prefix_cons_pub: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub chain_id: String,
    pub chain_name: String,
    pub rpc: String,
    pub rest: String,
    pub bip44: Bip44,
    pub coin_type: u32,
    pub stake_currency: Currency,
    pub bech32_config: Bech32Config,
    pub currencies: Vec<Currency>,
    pub fee_currencies: Vec<Currency>,
    pub gas_price_step: GasPriceStep,
    pub features: Vec<String>,
}

impl From<&ChainConfig> for ChainInfo {
    fn from(config: &ChainConfig) -> Self {
        let currency = Currency {
            coin_denom: config.denom.clone(),
            coin_minimal_denom: config.minimal_denom.0.clone(),
            coin_decimals: config.decimals,
        };
        let prefix = &config.bech32_prefix;
        Self {
            chain_id: config.chain_id.0.clone(),
            chain_name: config.chain_name.clone(),
            rpc: config.rpc_url.clone(),
            rest: config.lcd_url.clone(),
            bip44: Bip44 {
                coin_type: config.coin_type,
            },
            coin_type: config.coin_type,
            stake_currency: currency.clone(),
            bech32_config: Bech32Config {
                bech32_prefix_acc_addr: prefix.clone(),
                bech32_prefix_acc_pub: format!("{prefix}pub"),
                bech32_prefix_val_addr: format!("{prefix}valoper"),
                bech32_prefix_val_pub: format!("{prefix}valoperpub"),
                bech32_prefix_cons_addr: format!("{prefix}valcons"),
                bech32_prefix_cons_pub: format!("{prefix}valconspub"),
            },
            currencies: vec![currency.clone()],
            fee_currencies: vec![currency],
            gas_price_step: config.gas_price_step,
            features: config.features.clone(),
        }
    }
}

// ── Query permit ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermitParams {
    pub permit_name: String,
    pub allowed_tokens: Vec<ContractAddress>,
    pub chain_id: ChainId,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PubKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermitSignature {
    pub pub_key: PubKey,
    pub signature: String,
}

/// A user-signed, scope-limited read credential for private contract state.
/// Reusable for the whole session; never re-signed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permit {
    pub params: PermitParams,
    pub signature: PermitSignature,
}

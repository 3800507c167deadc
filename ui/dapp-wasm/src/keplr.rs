//! Bindings to the injected Keplr wallet object.
//!
//! Keplr is an opaque capability provider living on `window`; everything
//! here goes through `Reflect` so the extension's surface stays untyped at
//! the boundary and the rest of the app only sees the bridge traits.

use async_trait::async_trait;
use js_sys::{Array, Function, Promise, Reflect};
use serde_json::{Value, json};
use std::sync::Arc;
use sw_api_types::{
    Address, ChainConfig, ChainId, ChainInfo, ContractAddress, Permit, PermitParams,
    PermitSignature,
};
use sw_wallet_bridge::{OfflineSigner, PermitSigner, WalletCapability, WalletError};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

pub struct KeplrWallet {
    keplr: JsValue,
    fee_denom: String,
}

impl KeplrWallet {
    /// Probe for the full capability surface. `None` until the extension
    /// has injected all three entry points.
    pub fn detect(config: &ChainConfig) -> Option<Self> {
        let window: JsValue = web_sys::window()?.into();
        let keplr = Reflect::get(&window, &JsValue::from_str("keplr")).ok()?;
        let signer = Reflect::get(&window, &JsValue::from_str("getOfflineSignerOnlyAmino")).ok()?;
        let enigma = Reflect::get(&window, &JsValue::from_str("getEnigmaUtils")).ok()?;
        if keplr.is_undefined() || !signer.is_function() || !enigma.is_function() {
            return None;
        }
        Some(Self {
            keplr,
            fee_denom: config.minimal_denom.0.clone(),
        })
    }
}

fn to_js(value: &impl serde::Serialize) -> Result<JsValue, WalletError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| WalletError::Capability(format!("serialize: {err}")))
}

fn from_js(value: JsValue) -> Result<Value, WalletError> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|err| WalletError::Capability(format!("deserialize: {err}")))
}

fn js_error_text(err: JsValue) -> String {
    match err.dyn_ref::<js_sys::Error>() {
        Some(error) => String::from(error.message()),
        None => format!("{err:?}"),
    }
}

/// The wallet reports a user decline only as a rejected promise; the
/// message is the one observable distinction from other failures.
fn sign_error(message: String) -> WalletError {
    if message.to_ascii_lowercase().contains("reject") {
        WalletError::UserRejected
    } else {
        WalletError::Capability(message)
    }
}

/// Invokes `target.name(args…)`, awaiting the result when it is a promise.
async fn call(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, String> {
    let method = Reflect::get(target, &JsValue::from_str(name)).map_err(js_error_text)?;
    let method: &Function = method
        .dyn_ref()
        .ok_or_else(|| format!("{name} is not a function"))?;

    let arg_list = Array::new();
    for arg in args {
        arg_list.push(arg);
    }

    let result = method.apply(target, &arg_list).map_err(js_error_text)?;
    match result.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await.map_err(js_error_text),
        Err(value) => Ok(value),
    }
}

#[async_trait(?Send)]
impl WalletCapability for KeplrWallet {
    async fn suggest_chain(&self, info: &ChainInfo) -> Result<(), WalletError> {
        let descriptor = to_js(info)?;
        call(&self.keplr, "experimentalSuggestChain", &[descriptor])
            .await
            .map_err(WalletError::ChainRegistration)?;
        Ok(())
    }

    async fn enable(&self, chain_id: &ChainId) -> Result<(), WalletError> {
        call(&self.keplr, "enable", &[JsValue::from_str(&chain_id.0)])
            .await
            .map_err(sign_error)?;
        Ok(())
    }

    async fn offline_signer(
        &self,
        chain_id: &ChainId,
    ) -> Result<Arc<dyn OfflineSigner>, WalletError> {
        let window: JsValue = web_sys::window()
            .ok_or_else(|| WalletError::Capability("no window".to_owned()))?
            .into();
        let signer = call(
            &window,
            "getOfflineSignerOnlyAmino",
            &[JsValue::from_str(&chain_id.0)],
        )
        .await
        .map_err(WalletError::Capability)?;

        let accounts = call(&signer, "getAccounts", &[])
            .await
            .map_err(WalletError::Capability)?;
        let address = Array::from(&accounts)
            .get(0)
            .dyn_ref::<js_sys::Object>()
            .and_then(|first| Reflect::get(first, &JsValue::from_str("address")).ok())
            .and_then(|v| v.as_string())
            .ok_or_else(|| {
                WalletError::Capability("signer exposed no account address".to_owned())
            })?;

        Ok(Arc::new(KeplrSigner {
            signer,
            address: Address(address),
        }))
    }
}

pub struct KeplrSigner {
    signer: JsValue,
    address: Address,
}

#[async_trait(?Send)]
impl OfflineSigner for KeplrSigner {
    fn address(&self) -> Address {
        self.address.clone()
    }

    async fn sign_amino(&self, sign_doc: Value) -> Result<Value, WalletError> {
        let doc = to_js(&sign_doc)?;
        let signed = call(
            &self.signer,
            "signAmino",
            &[JsValue::from_str(&self.address.0), doc],
        )
        .await
        .map_err(sign_error)?;
        from_js(signed)
    }
}

#[async_trait(?Send)]
impl PermitSigner for KeplrWallet {
    async fn sign_permit(
        &self,
        address: &Address,
        chain_id: &ChainId,
        permit_name: &str,
        allowed_tokens: &[ContractAddress],
        permissions: &[&str],
    ) -> Result<Permit, WalletError> {
        // Query-permit amino document: zero fee, constant nonce fields.
        let sign_doc = json!({
            "chain_id": chain_id.0,
            "account_number": "0",
            "sequence": "0",
            "fee": { "amount": [{ "denom": self.fee_denom, "amount": "0" }], "gas": "1" },
            "msgs": [{
                "type": "query_permit",
                "value": {
                    "permit_name": permit_name,
                    "allowed_tokens": allowed_tokens,
                    "permissions": permissions,
                },
            }],
            "memo": "",
        });

        let response = call(
            &self.keplr,
            "signAmino",
            &[
                JsValue::from_str(&chain_id.0),
                JsValue::from_str(&address.0),
                to_js(&sign_doc)?,
            ],
        )
        .await
        .map_err(sign_error)?;
        let response = from_js(response)?;

        let signature: PermitSignature = serde_json::from_value(
            response.get("signature").cloned().unwrap_or(Value::Null),
        )
        .map_err(|err| WalletError::Capability(format!("malformed permit signature: {err}")))?;

        Ok(Permit {
            params: PermitParams {
                permit_name: permit_name.to_owned(),
                allowed_tokens: allowed_tokens.to_vec(),
                chain_id: chain_id.clone(),
                permissions: permissions.iter().map(|p| (*p).to_owned()).collect(),
            },
            signature,
        })
    }
}

//! Seam to the injected browser wallet.
//!
//! The wallet is an opaque capability provider: it appears on the page at
//! some point after load, registers chains, asks the user for permission in
//! its own UI, and hands out signing handles. Everything here is a trait so
//! the session layer can run against a mock as easily as against Keplr.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use sw_api_types::{Address, ChainId, ChainInfo, ContractAddress, Permit};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet rejected the chain descriptor: {0}")]
    ChainRegistration(String),
    #[error("user declined wallet authorization")]
    UserRejected,
    #[error("wallet capability failure: {0}")]
    Capability(String),
    #[error("wallet detection cancelled")]
    Cancelled,
}

/// The injected wallet's capability surface. `?Send` because the concrete
/// implementation lives on the single-threaded browser main thread.
#[async_trait(?Send)]
pub trait WalletCapability {
    /// Proposes the chain to the wallet. Idempotent for a given chain id.
    async fn suggest_chain(&self, info: &ChainInfo) -> Result<(), WalletError>;

    /// Requests user permission for the chain; pops the wallet's own UI.
    async fn enable(&self, chain_id: &ChainId) -> Result<(), WalletError>;

    /// Returns the signer handle. Only valid after `enable` succeeded.
    async fn offline_signer(&self, chain_id: &ChainId)
    -> Result<Arc<dyn OfflineSigner>, WalletError>;
}

/// Wallet-provided signing handle bound to one account.
#[async_trait(?Send)]
pub trait OfflineSigner {
    fn address(&self) -> Address;

    /// Signs an amino document, prompting the user. Returns the signed
    /// document including the signature object.
    async fn sign_amino(&self, sign_doc: Value) -> Result<Value, WalletError>;
}

/// The credential-signing surface: produces a scope-limited query permit.
#[async_trait(?Send)]
pub trait PermitSigner {
    async fn sign_permit(
        &self,
        address: &Address,
        chain_id: &ChainId,
        permit_name: &str,
        allowed_tokens: &[ContractAddress],
        permissions: &[&str],
    ) -> Result<Permit, WalletError>;
}

/// Cancellation hook for the capability poll, so the surrounding UI can
/// stop the loop on unmount instead of leaking it.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Polls `probe` at a fixed interval until the wallet capability appears.
///
/// The wait is unbounded by design (the user may still be installing or
/// unlocking the extension); the only way out besides success is the cancel
/// token. `sleep` is injected because the timer source differs between the
/// browser (gloo) and native test runs (tokio).
pub async fn await_wallet<T, P, S, F>(
    mut probe: P,
    sleep: S,
    interval: Duration,
    cancel: &CancelToken,
) -> Result<T, WalletError>
where
    P: FnMut() -> Option<T>,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    loop {
        if cancel.is_cancelled() {
            return Err(WalletError::Cancelled);
        }
        if let Some(capability) = probe() {
            return Ok(capability);
        }
        sleep(interval).await;
    }
}

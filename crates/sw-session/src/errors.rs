use sw_amount::{Amount, AmountError};
use sw_wallet_bridge::WalletError;
use thiserror::Error;

/// Terminal failure of session establishment, wrapping the first step that
/// failed. The caller never observes partial session state.
#[derive(Debug, Error)]
#[error("session establishment failed at {step}")]
pub struct SessionEstablishmentError {
    pub step: &'static str,
    #[source]
    pub source: anyhow::Error,
}

impl SessionEstablishmentError {
    pub(crate) fn at(step: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self {
            step,
            source: source.into(),
        }
    }

    /// True when the underlying cause is the user declining in the wallet UI.
    pub fn user_rejected(&self) -> bool {
        matches!(
            self.source.downcast_ref::<WalletError>(),
            Some(WalletError::UserRejected)
        )
    }
}

/// Fatal failure of a balance refresh: the native bank query failed. The
/// wrapped-balance read never produces this; it degrades instead.
#[derive(Debug, Error)]
#[error("native balance query failed")]
pub struct BalanceQueryError(#[source] pub anyhow::Error);

#[derive(Debug, Error)]
pub enum ConvertError {
    /// Un-parseable input, too many fractional digits, or overflow.
    #[error(transparent)]
    Amount(#[from] AmountError),
    /// User-visible and non-retryable; no message was built, no broadcast
    /// attempted.
    #[error("insufficient balance: requested {requested} but only {available} available")]
    InsufficientBalance { requested: Amount, available: Amount },
    /// Another conversion is in flight on this session; fail fast instead
    /// of racing its snapshot.
    #[error("a conversion is already in flight for this session")]
    SessionBusy,
    /// Broadcast or on-chain execution failed; balances were not refreshed
    /// and the pending amount is retryable as-is.
    #[error("transaction submission failed")]
    Submission(#[source] anyhow::Error),
}

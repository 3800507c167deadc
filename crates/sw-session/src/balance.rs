use serde_json::{Value, json};
use sw_amount::Amount;
use tracing::warn;

use crate::Session;
use crate::errors::BalanceQueryError;

/// Balances for the current address, recomputed wholesale on every refresh.
/// `wrapped` is `None` when the permit-gated query is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub native: Amount,
    pub wrapped: Option<Amount>,
}

#[derive(Debug, Default)]
pub struct BalanceService;

impl BalanceService {
    pub fn new() -> Self {
        Self
    }

    /// Two independent reads. A native-balance failure is fatal to the
    /// refresh; a wrapped-balance failure degrades to `wrapped: None` so
    /// the rest of the snapshot stays usable.
    pub async fn refresh(&self, session: &Session) -> Result<BalanceSnapshot, BalanceQueryError> {
        let raw = session
            .transport
            .bank_balance(&session.address, &session.config.minimal_denom)
            .await
            .map_err(BalanceQueryError)?;
        let native = Amount::from_minor(raw, session.config.decimals);

        let wrapped = match session
            .transport
            .contract_query(
                &session.config.wrapped_token,
                json!({ "balance": {} }),
                Some(&session.permit),
            )
            .await
        {
            Ok(value) => parse_wrapped(&value, session.config.decimals),
            Err(err) => {
                warn!(error = %err, "wrapped balance unavailable");
                None
            }
        };

        Ok(BalanceSnapshot { native, wrapped })
    }
}

fn parse_wrapped(value: &Value, decimals: u32) -> Option<Amount> {
    let amount = value.get("balance")?.get("amount")?.as_str()?;
    match amount.parse() {
        Ok(minor) => Some(Amount::from_minor(minor, decimals)),
        Err(_) => {
            warn!(amount, "wrapped balance amount not an integer");
            None
        }
    }
}

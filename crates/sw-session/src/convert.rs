use sw_amount::Amount;
use sw_api_types::Coin;
use sw_chain_client::{BroadcastOutcome, ExecuteMsg};
use tracing::{info, warn};

use crate::balance::{BalanceService, BalanceSnapshot};
use crate::errors::ConvertError;
use crate::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionDirection {
    NativeToWrapped,
    WrappedToNative,
}

/// One conversion attempt as entered by the user; never persisted.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub direction: ConversionDirection,
    /// Un-scaled decimal text, exactly as typed.
    pub amount: String,
}

/// Result of a confirmed conversion. `snapshot` is `None` only when the
/// post-broadcast refresh itself failed; the transaction still went through.
#[derive(Debug, Clone)]
pub struct ConversionReceipt {
    pub outcome: BroadcastOutcome,
    pub snapshot: Option<BalanceSnapshot>,
}

#[derive(Debug, Default)]
pub struct ConversionEngine {
    balances: BalanceService,
}

impl ConversionEngine {
    pub fn new() -> Self {
        Self {
            balances: BalanceService::new(),
        }
    }

    /// Validate, scale, build, broadcast, refresh. A failed submission is
    /// surfaced once; retry is an explicit user-initiated repeat.
    pub async fn convert(
        &self,
        session: &Session,
        request: &ConversionRequest,
        snapshot: &BalanceSnapshot,
    ) -> Result<ConversionReceipt, ConvertError> {
        // Held through the refresh so no concurrent attempt can race the
        // snapshot this validation read.
        let _guard = session.begin_conversion().ok_or(ConvertError::SessionBusy)?;

        let amount = Amount::parse(&request.amount, session.config.decimals)?;

        let available = match request.direction {
            ConversionDirection::NativeToWrapped => snapshot.native,
            ConversionDirection::WrappedToNative => snapshot
                .wrapped
                .unwrap_or_else(|| Amount::zero(session.config.decimals)),
        };
        if amount.minor() > available.minor() {
            return Err(ConvertError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let msg = match request.direction {
            ConversionDirection::NativeToWrapped => ExecuteMsg::deposit(
                session.address.clone(),
                session.config.wrapped_token.clone(),
                Coin {
                    denom: session.config.minimal_denom.0.clone(),
                    amount: amount.minor().to_string(),
                },
            ),
            ConversionDirection::WrappedToNative => ExecuteMsg::redeem(
                session.address.clone(),
                session.config.wrapped_token.clone(),
                amount.minor(),
            ),
        };

        let outcome = session
            .transport
            .broadcast(vec![msg], session.config.gas_limit)
            .await
            .map_err(ConvertError::Submission)?;
        if !outcome.is_success() {
            return Err(ConvertError::Submission(anyhow::anyhow!(
                "execution failed on-chain (code {}): {}",
                outcome.code,
                outcome.raw_log
            )));
        }
        info!(tx_hash = %outcome.tx_hash.0, amount = %amount, "conversion confirmed");

        let snapshot = match self.balances.refresh(session).await {
            Ok(fresh) => Some(fresh),
            Err(err) => {
                warn!(error = %err, "post-conversion balance refresh failed");
                None
            }
        };

        Ok(ConversionReceipt { outcome, snapshot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::session_over_ledger;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use sw_amount::AmountError;
    use sw_api_types::{Address, ContractAddress, Denom, Permit};
    use sw_chain_client::{ChainTransport, InMemoryTransport};
    use tokio::sync::Notify;

    fn deposit(amount: &str) -> ConversionRequest {
        ConversionRequest {
            direction: ConversionDirection::NativeToWrapped,
            amount: amount.to_owned(),
        }
    }

    fn redeem(amount: &str) -> ConversionRequest {
        ConversionRequest {
            direction: ConversionDirection::WrappedToNative,
            amount: amount.to_owned(),
        }
    }

    #[tokio::test]
    async fn deposit_attaches_the_scaled_amount_as_funds() {
        let (session, transport) = session_over_ledger(100_000_000, 0).await;
        let snapshot = BalanceService::new().refresh(&session).await.unwrap();
        assert_eq!(snapshot.native.to_string(), "100");

        let receipt = ConversionEngine::new()
            .convert(&session, &deposit("10"), &snapshot)
            .await
            .expect("conversion should succeed");

        let msgs = transport.last_broadcast().expect("one broadcast");
        assert_eq!(msgs[0].msg, json!({ "deposit": {} }));
        assert_eq!(msgs[0].funds.len(), 1);
        assert_eq!(msgs[0].funds[0].amount, "10000000");
        assert_eq!(msgs[0].funds[0].denom, "uscrt");
        assert_eq!(transport.last_gas_limit(), Some(100_000));

        // Broadcast success triggered a refresh reflecting the move.
        let fresh = receipt.snapshot.expect("refresh after success");
        assert_eq!(fresh.native.minor(), 90_000_000);
        assert_eq!(fresh.wrapped.unwrap().minor(), 10_000_000);
    }

    #[tokio::test]
    async fn redeem_carries_the_amount_as_an_argument_with_no_funds() {
        let (session, transport) = session_over_ledger(0, 5_000_000).await;
        let snapshot = BalanceService::new().refresh(&session).await.unwrap();

        let receipt = ConversionEngine::new()
            .convert(&session, &redeem("2"), &snapshot)
            .await
            .expect("redeem should succeed");

        let msgs = transport.last_broadcast().expect("one broadcast");
        assert_eq!(msgs[0].msg, json!({ "redeem": { "amount": "2000000" } }));
        assert!(msgs[0].funds.is_empty());

        let fresh = receipt.snapshot.expect("refresh after success");
        assert_eq!(fresh.native.minor(), 2_000_000);
        assert_eq!(fresh.wrapped.unwrap().minor(), 3_000_000);
    }

    #[tokio::test]
    async fn insufficient_balance_never_reaches_broadcast() {
        let (session, transport) = session_over_ledger(5_000_000, 0).await;
        let snapshot = BalanceService::new().refresh(&session).await.unwrap();

        let err = ConversionEngine::new()
            .convert(&session, &deposit("10"), &snapshot)
            .await
            .expect_err("requesting 10 against a balance of 5 must fail");

        assert!(matches!(err, ConvertError::InsufficientBalance { .. }));
        assert_eq!(transport.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn absent_wrapped_balance_counts_as_zero() {
        let (session, transport) = session_over_ledger(100_000_000, 5_000_000).await;
        transport.fail_wrapped_queries(true);
        let snapshot = BalanceService::new().refresh(&session).await.unwrap();
        assert_eq!(snapshot.wrapped, None);

        let err = ConversionEngine::new()
            .convert(&session, &redeem("1"), &snapshot)
            .await
            .expect_err("unknown wrapped balance must not be spendable");

        assert!(matches!(err, ConvertError::InsufficientBalance { .. }));
        assert_eq!(transport.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn excess_precision_fails_before_any_message_is_built() {
        let (session, transport) = session_over_ledger(100_000_000, 0).await;
        let snapshot = BalanceService::new().refresh(&session).await.unwrap();

        let err = ConversionEngine::new()
            .convert(&session, &deposit("1.0000001"), &snapshot)
            .await
            .expect_err("seven fractional digits cannot be represented");

        assert!(matches!(
            err,
            ConvertError::Amount(AmountError::PrecisionOverflow { got: 7, max: 6 })
        ));
        assert_eq!(transport.broadcast_count(), 0);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_once_and_skips_the_refresh() {
        let (session, transport) = session_over_ledger(100_000_000, 0).await;
        let snapshot = BalanceService::new().refresh(&session).await.unwrap();
        transport.fail_broadcasts(true);

        let engine = ConversionEngine::new();
        let err = engine
            .convert(&session, &deposit("10"), &snapshot)
            .await
            .expect_err("a dead transport must fail the submission");
        assert!(matches!(err, ConvertError::Submission(_)));

        // Nothing moved, and the same request is retryable as-is.
        transport.fail_broadcasts(false);
        let receipt = engine
            .convert(&session, &deposit("10"), &snapshot)
            .await
            .expect("explicit retry should succeed");
        assert_eq!(receipt.snapshot.unwrap().native.minor(), 90_000_000);
    }

    #[tokio::test]
    async fn on_chain_revert_is_a_submission_error_without_refresh() {
        let (session, transport) = session_over_ledger(100_000_000, 0).await;
        let snapshot = BalanceService::new().refresh(&session).await.unwrap();
        transport.revert_next_broadcast(11, "out of gas");

        let err = ConversionEngine::new()
            .convert(&session, &deposit("10"), &snapshot)
            .await
            .expect_err("reverted execution must fail the conversion");

        assert!(matches!(err, ConvertError::Submission(_)));
        // The revert consumed the broadcast but moved nothing.
        assert_eq!(transport.broadcast_count(), 1);
        let fresh = BalanceService::new().refresh(&session).await.unwrap();
        assert_eq!(fresh.native.minor(), 100_000_000);
    }

    /// Delegating transport whose broadcast parks until released, so a test
    /// can observe a conversion mid-flight.
    struct GatedTransport {
        inner: Arc<InMemoryTransport>,
        gate: Notify,
    }

    #[async_trait(?Send)]
    impl ChainTransport for GatedTransport {
        async fn bank_balance(&self, address: &Address, denom: &Denom) -> anyhow::Result<u128> {
            self.inner.bank_balance(address, denom).await
        }

        async fn contract_query(
            &self,
            contract: &ContractAddress,
            query: Value,
            permit: Option<&Permit>,
        ) -> anyhow::Result<Value> {
            self.inner.contract_query(contract, query, permit).await
        }

        async fn broadcast(
            &self,
            msgs: Vec<ExecuteMsg>,
            gas_limit: u64,
        ) -> anyhow::Result<BroadcastOutcome> {
            self.gate.notified().await;
            self.inner.broadcast(msgs, gas_limit).await
        }
    }

    #[tokio::test]
    async fn second_convert_while_one_is_in_flight_fails_fast() {
        let (mut session, transport) = session_over_ledger(100_000_000, 0).await;
        let snapshot = BalanceService::new().refresh(&session).await.unwrap();
        let gated = Arc::new(GatedTransport {
            inner: transport.clone(),
            gate: Notify::new(),
        });
        session.transport = gated.clone();

        let engine = ConversionEngine::new();
        let request = deposit("10");
        let first = engine.convert(&session, &request, &snapshot);
        let second = async {
            // Let the first attempt reach its parked broadcast.
            tokio::task::yield_now().await;
            let result = engine.convert(&session, &request, &snapshot).await;
            gated.gate.notify_one();
            result
        };

        let (first, second) = tokio::join!(first, second);
        assert!(matches!(second, Err(ConvertError::SessionBusy)));
        let receipt = first.expect("the in-flight attempt must be unaffected");
        assert!(receipt.outcome.is_success());
        assert_eq!(transport.broadcast_count(), 1);
        assert_eq!(receipt.snapshot.unwrap().native.minor(), 90_000_000);
    }
}

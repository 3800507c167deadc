//! Wallet session, balance reads, and native<->wrapped conversion.
//!
//! The session is an explicit value built once per page lifetime and passed
//! by reference to every component that needs it; there is no module-level
//! client or credential state.

mod balance;
mod convert;
mod errors;
mod establish;

pub use balance::{BalanceService, BalanceSnapshot};
pub use convert::{
    ConversionDirection, ConversionEngine, ConversionReceipt, ConversionRequest,
};
pub use errors::{BalanceQueryError, ConvertError, SessionEstablishmentError};
pub use establish::{PERMIT_NAME, SessionManager};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use sw_api_types::{Address, ChainConfig, Permit};
use sw_chain_client::ChainTransport;
use sw_wallet_bridge::OfflineSigner;

/// An authenticated, permit-carrying connection to the chain.
///
/// Effectively immutable once built: the permit is never re-signed and the
/// transport never re-bound. `busy` is the one mutable bit and serializes
/// conversions (and the refresh each triggers) per session.
pub struct Session {
    pub address: Address,
    pub signer: Arc<dyn OfflineSigner>,
    pub transport: Arc<dyn ChainTransport>,
    pub permit: Permit,
    pub config: ChainConfig,
    busy: AtomicBool,
}

impl Session {
    fn begin_conversion(&self) -> Option<ConversionGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ConversionGuard { flag: &self.busy })
    }
}

struct ConversionGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ConversionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

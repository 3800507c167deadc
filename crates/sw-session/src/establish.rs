use std::sync::atomic::{AtomicBool, Ordering};
use sw_api_types::{ChainConfig, ChainInfo};
use sw_chain_client::TransportConnector;
use sw_wallet_bridge::{PermitSigner, WalletCapability};
use tracing::info;

use crate::errors::SessionEstablishmentError;
use crate::Session;

pub const PERMIT_NAME: &str = "secretwrap-balance";

/// The two read capabilities the permit grants, and nothing more.
const PERMIT_PERMISSIONS: [&str; 2] = ["owner", "balance"];

/// Runs the one-shot establishment sequence: register chain, authorize,
/// obtain signer, derive address, construct the transport, sign the permit.
pub struct SessionManager {
    started: AtomicBool,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
        }
    }

    /// At most one establishment runs per manager (and the shell keeps one
    /// manager per page lifetime); a re-entrant call from a UI re-render
    /// fails fast instead of racing the first.
    pub async fn establish<W>(
        &self,
        config: &ChainConfig,
        wallet: &W,
        connector: &dyn TransportConnector,
    ) -> Result<Session, SessionEstablishmentError>
    where
        W: WalletCapability + PermitSigner,
    {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SessionEstablishmentError::at(
                "duplicate-initialization",
                anyhow::anyhow!("session establishment already ran for this page lifetime"),
            ));
        }

        let info = ChainInfo::from(config);
        wallet
            .suggest_chain(&info)
            .await
            .map_err(|err| SessionEstablishmentError::at("register-chain", err))?;

        wallet
            .enable(&config.chain_id)
            .await
            .map_err(|err| SessionEstablishmentError::at("authorize", err))?;

        let signer = wallet
            .offline_signer(&config.chain_id)
            .await
            .map_err(|err| SessionEstablishmentError::at("offline-signer", err))?;
        let address = signer.address();

        let transport = connector
            .connect(config, signer.clone(), &address)
            .map_err(|err| SessionEstablishmentError::at("construct-client", err))?;

        // Scoped to exactly the fixed wrapped-token contract and the two
        // declared read capabilities; never requested broader.
        let permit = wallet
            .sign_permit(
                &address,
                &config.chain_id,
                PERMIT_NAME,
                std::slice::from_ref(&config.wrapped_token),
                &PERMIT_PERMISSIONS,
            )
            .await
            .map_err(|err| SessionEstablishmentError::at("sign-permit", err))?;

        info!(address = %address.0, chain_id = %config.chain_id.0, "session established");
        Ok(Session {
            address,
            signer,
            transport,
            permit,
            config: config.clone(),
            busy: AtomicBool::new(false),
        })
    }
}

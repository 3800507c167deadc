//! SecretWrap browser shell.
//!
//! Thin presentation layer over the session/balance/conversion crates:
//! waits for the injected wallet, establishes the session once, renders
//! balances, and forwards wrap/unwrap intents to the conversion engine.

pub mod dom;
pub mod events;
pub mod keplr;
pub mod state;

use gloo_timers::future::TimeoutFuture;
use std::rc::Rc;
use std::time::Duration;
use sw_api_types::ChainConfig;
use sw_chain_lcd::LcdConnector;
use sw_session::BalanceService;
use sw_wallet_bridge::{CancelToken, await_wallet};
use wasm_bindgen::prelude::*;

const WALLET_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// WASM entry point – called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    // Improve panic messages in the browser console
    console_error_panic_hook::set_once();

    init().await
}

/// Cancellation hook for the host page: stops the wallet poll on unmount.
#[wasm_bindgen]
pub fn teardown() {
    state::cancel_poll();
}

async fn init() -> Result<(), JsValue> {
    let els = dom::Elements::bind()?;
    events::bind_events(&els);
    dom::set_text(&els.status, "Waiting for Keplr wallet integration...");

    let config = Rc::new(ChainConfig::pulsar_testnet());

    let cancel = CancelToken::new();
    state::set_poll_cancel(cancel.clone());
    let probe_config = config.clone();
    let wallet = match await_wallet(
        move || keplr::KeplrWallet::detect(&probe_config),
        |interval| TimeoutFuture::new(interval.as_millis() as u32),
        WALLET_POLL_INTERVAL,
        &cancel,
    )
    .await
    {
        Ok(wallet) => wallet,
        // Cancelled: the page is going away, nothing to render.
        Err(_) => return Ok(()),
    };

    let session = match state::session_manager()
        .establish(&config, &wallet, &LcdConnector)
        .await
    {
        Ok(session) => Rc::new(session),
        Err(err) => {
            // Terminal for this page load; the user reloads to retry.
            dom::set_text(&els.status, &format!("wallet session failed: {}", events::error_chain(&err)));
            return Ok(());
        }
    };

    dom::set_text(&els.status, "Connected");
    dom::set_text(&els.address, &session.address.0);
    state::set_session(session.clone());

    match BalanceService::new().refresh(&session).await {
        Ok(snapshot) => {
            state::set_snapshot(snapshot);
            dom::render_balances(&els, &snapshot);
        }
        Err(err) => dom::set_notice(&els, &events::error_chain(&err)),
    }

    Ok(())
}

//! Global application state.
//!
//! `RefCell`-wrapped `thread_local!` storage (WASM is single-threaded). The
//! page-wide state is exactly the session, the latest snapshot, the one
//! session manager, and the poll cancellation token.

use std::cell::RefCell;
use std::rc::Rc;
use sw_session::{BalanceSnapshot, Session, SessionManager};
use sw_wallet_bridge::CancelToken;

#[derive(Default)]
struct AppState {
    session: Option<Rc<Session>>,
    snapshot: Option<BalanceSnapshot>,
    manager: Option<Rc<SessionManager>>,
    poll_cancel: Option<CancelToken>,
}

thread_local! {
    static STATE: RefCell<AppState> = RefCell::new(AppState::default());
}

pub fn session() -> Option<Rc<Session>> {
    STATE.with(|s| s.borrow().session.clone())
}

pub fn set_session(session: Rc<Session>) {
    STATE.with(|s| s.borrow_mut().session = Some(session));
}

pub fn snapshot() -> Option<BalanceSnapshot> {
    STATE.with(|s| s.borrow().snapshot)
}

pub fn set_snapshot(snapshot: BalanceSnapshot) {
    STATE.with(|s| s.borrow_mut().snapshot = Some(snapshot));
}

/// One manager per page lifetime; its internal guard refuses a duplicate
/// establishment if the host page re-enters init.
pub fn session_manager() -> Rc<SessionManager> {
    STATE.with(|s| {
        s.borrow_mut()
            .manager
            .get_or_insert_with(|| Rc::new(SessionManager::new()))
            .clone()
    })
}

pub fn set_poll_cancel(token: CancelToken) {
    STATE.with(|s| s.borrow_mut().poll_cancel = Some(token));
}

pub fn cancel_poll() {
    STATE.with(|s| {
        if let Some(token) = s.borrow().poll_cancel.as_ref() {
            token.cancel();
        }
    });
}

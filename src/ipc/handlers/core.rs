use crate::error::Notice;
use crate::ipc::error::{err, notices_json, ok};
use crate::ipc::handlers::active_session;
use crate::ipc::types::{AppState, Request};
use crate::store::open_store;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "sessionId": state.session.as_ref().map(|s| s.id().to_string()),
            "store": state.config.store.kind.as_str(),
        }),
    )
}

fn handle_session_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(p) = req.params.get("seedPath") {
        match p.as_str() {
            Some(s) if !s.trim().is_empty() => state.config.seed_path = PathBuf::from(s.trim()),
            _ => return err(&req.id, "bad_params", "seedPath must be a non-empty string", None),
        }
    }

    let store = match state.store.as_ref() {
        Some(s) => s.clone(),
        None => match open_store(&state.config.store, &state.config.columns) {
            Ok(s) => {
                state.store = Some(s.clone());
                s
            }
            Err(e) => {
                return err(
                    &req.id,
                    "store_failed",
                    e.to_string(),
                    Some(json!({ "store": state.config.store.kind.as_str() })),
                )
            }
        },
    };

    let (session, notices) =
        crate::session::Session::open(store, &mut state.seeds, &state.config);
    info!(session = %session.id(), seed = %state.config.seed_path.display(), "session.open");
    let mut result = json!(session.state());
    result["notices"] = notices_json(&notices);
    if session.table().is_empty() && notices.is_empty() {
        result["notices"] = notices_json(&[Notice::info(
            "The table is empty. Check that the seed file exists and is readable.",
        )]);
    }
    state.session = Some(session);
    ok(&req.id, result)
}

fn handle_session_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    match active_session(&mut state.session, req) {
        Ok(session) => ok(&req.id, json!(session.state())),
        Err(resp) => resp,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.open" => Some(handle_session_open(state, req)),
        "session.state" => Some(handle_session_state(state, req)),
        _ => None,
    }
}

use crate::error::Notice;
use crate::ipc::error::{err, gradebook_err, notices_json, ok};
use crate::ipc::handlers::active_session;
use crate::ipc::types::{AppState, Request};
use crate::session::CellEdit;
use serde_json::json;

const GRID_UPDATE_MAX_EDITS: usize = 5000;

fn handle_grid_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match active_session(&mut state.session, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    ok(&req.id, json!(session.grid_view()))
}

fn parse_edits(req: &Request) -> Result<Vec<CellEdit>, serde_json::Value> {
    let Some(raw) = req.params.get("edits") else {
        return Err(err(&req.id, "bad_params", "missing edits", None));
    };
    let edits: Vec<CellEdit> = serde_json::from_value(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("invalid edits: {e}"), None))?;
    if edits.len() > GRID_UPDATE_MAX_EDITS {
        return Err(err(
            &req.id,
            "bad_params",
            "too many edits in one request",
            Some(json!({
                "count": edits.len(),
                "maxEdits": GRID_UPDATE_MAX_EDITS
            })),
        ));
    }
    Ok(edits)
}

fn handle_grid_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match active_session(&mut state.session, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let edits = match parse_edits(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match session.apply_edits(&edits) {
        Ok(outcome) => ok(
            &req.id,
            json!({
                "changed": outcome.changed,
                "applied": outcome.applied,
                "dirty": session.state().dirty,
            }),
        ),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_grid_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match active_session(&mut state.session, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match session.save() {
        Ok(receipt) => {
            let mut result = json!(receipt);
            result["notices"] = notices_json(&[Notice::success("Changes saved.")]);
            ok(&req.id, result)
        }
        Err(e) => gradebook_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grid.get" => Some(handle_grid_get(state, req)),
        "grid.update" => Some(handle_grid_update(state, req)),
        "grid.save" => Some(handle_grid_save(state, req)),
        _ => None,
    }
}

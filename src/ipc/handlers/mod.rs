pub mod core;
pub mod grid;
pub mod reports;

use crate::ipc::error::err;
use crate::ipc::types::Request;
use crate::session::Session;

pub(crate) fn active_session<'a>(
    session: &'a mut Option<Session>,
    req: &Request,
) -> Result<&'a mut Session, serde_json::Value> {
    session
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_session", "open a session first", None))
}

use serde_json::json;

use crate::error::{GradebookError, Notice};

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn gradebook_err(id: &str, e: &GradebookError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), None)
}

pub fn notices_json(notices: &[Notice]) -> serde_json::Value {
    serde_json::to_value(notices).unwrap_or_else(|_| json!([]))
}

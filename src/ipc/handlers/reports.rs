use crate::error::{GradebookError, Notice};
use crate::ipc::error::{err, gradebook_err, notices_json, ok};
use crate::ipc::handlers::active_session;
use crate::ipc::types::{AppState, Request};
use crate::reports::{export_report_csv, ReportKind};
use serde_json::json;
use std::path::PathBuf;

/// A missing report is a warning with a null report, not a failed request.
fn handle_report(state: &mut AppState, req: &Request, kind: ReportKind) -> serde_json::Value {
    let session = match active_session(&mut state.session, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let report = match kind {
        ReportKind::Absences => session.absence_report(),
        ReportKind::Grades => session.grade_report(),
    };
    match report {
        Ok(report) => {
            let message = match kind {
                ReportKind::Absences => "Absence report generated.",
                ReportKind::Grades => "Grade average report generated.",
            };
            ok(
                &req.id,
                json!({
                    "report": report,
                    "notices": notices_json(&[Notice::success(message)]),
                }),
            )
        }
        Err(e @ GradebookError::ReportUnavailable { .. }) => ok(
            &req.id,
            json!({
                "report": null,
                "notices": notices_json(&[Notice::from_error(&e)]),
            }),
        ),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_reports_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let kind = match req.params.get("kind").and_then(|v| v.as_str()) {
        Some(s) => match ReportKind::parse(s) {
            Some(k) => k,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "kind must be one of: absences, grades",
                    Some(json!({ "kind": s })),
                )
            }
        },
        None => return err(&req.id, "bad_params", "missing kind", None),
    };
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing outPath", None),
    };
    let session = match active_session(&mut state.session, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let report = match session.report(kind) {
        Ok(r) => r,
        Err(e) => return gradebook_err(&req.id, &e),
    };
    match export_report_csv(&report, &PathBuf::from(&out_path)) {
        Ok(rows) => ok(
            &req.id,
            json!({ "rowsExported": rows, "path": out_path, "kind": kind }),
        ),
        Err(e) => err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": out_path })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.absences" => Some(handle_report(state, req, ReportKind::Absences)),
        "reports.grades" => Some(handle_report(state, req, ReportKind::Grades)),
        "reports.exportCsv" => Some(handle_reports_export_csv(state, req)),
        _ => None,
    }
}

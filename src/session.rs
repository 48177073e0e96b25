use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, GradeBounds};
use crate::error::{GradebookError, Notice, Result};
use crate::reports::{self, ReportKind, ReportTable};
use crate::seed::SeedCache;
use crate::store::{TableStore, WriteReceipt};
use crate::table::{Cell, ColumnRole, ColumnRules, Table};

/// One grid edit as sent by the front end.
#[derive(Debug, Clone, Deserialize)]
pub struct CellEdit {
    pub row: usize,
    pub column: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    pub changed: bool,
    pub applied: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub store: &'static str,
    pub row_count: usize,
    pub column_count: usize,
    pub dirty: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "editor", rename_all = "camelCase")]
pub enum ColumnEditor {
    #[serde(rename = "text")]
    Text { disabled: bool },
    #[serde(rename = "checkbox")]
    Checkbox { default: bool },
    #[serde(rename = "number", rename_all = "camelCase")]
    Number {
        min_value: f64,
        max_value: f64,
        step: f64,
        format: &'static str,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridColumn {
    pub name: String,
    pub role: ColumnRole,
    #[serde(flatten)]
    pub editor: ColumnEditor,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridView {
    pub columns: Vec<GridColumn>,
    pub rows: Vec<Vec<Cell>>,
    pub fixed_rows: bool,
}

/// Owns the active table for one front-end session. Edits stay in memory
/// until `save` is called.
pub struct Session {
    id: Uuid,
    table: Table,
    store: Arc<dyn TableStore>,
    rules: ColumnRules,
    bounds: GradeBounds,
    dirty: bool,
}

impl Session {
    /// Loads from the store, falling back to the seed on first run. Never
    /// fails: problems come back as notices next to an empty table.
    ///
    /// A slot that exists but cannot be read is left as it is and the
    /// session opens on an empty table.
    pub fn open(
        store: Arc<dyn TableStore>,
        seeds: &mut SeedCache,
        cfg: &Config,
    ) -> (Session, Vec<Notice>) {
        let mut notices = Vec::new();

        let table = match store.init().and_then(|_| store.fetch()) {
            Ok(stored) if !stored.is_empty() => {
                notices.push(Notice::success(
                    "Loaded from the store; earlier changes are kept.",
                ));
                stored
            }
            Ok(_) => {
                let loaded = seeds.load(&cfg.seed_path, &cfg.columns, cfg.delimiter_byte());
                notices.extend(loaded.notice);
                if !loaded.table.is_empty() {
                    match store.write(&loaded.table) {
                        Ok(_) => notices.push(Notice::info(
                            "Initialized from the seed file and written to the store.",
                        )),
                        Err(e) => {
                            warn!(error = %e, "seeding the store failed");
                            notices.push(Notice::from_error(&e));
                        }
                    }
                }
                loaded.table
            }
            Err(e) => {
                warn!(error = %e, "stored table unreadable; slot left untouched");
                notices.push(Notice::from_error(&e));
                Table::default()
            }
        };

        let session = Session {
            id: Uuid::new_v4(),
            table,
            store,
            rules: cfg.columns.clone(),
            bounds: cfg.grades,
            dirty: false,
        };
        info!(
            session = %session.id,
            rows = session.table.row_count(),
            columns = session.table.column_count(),
            "session opened"
        );
        (session, notices)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            session_id: self.id.to_string(),
            store: self.store.kind().as_str(),
            row_count: self.table.row_count(),
            column_count: self.table.column_count(),
            dirty: self.dirty,
        }
    }

    pub fn grid_view(&self) -> GridView {
        let columns = self
            .table
            .columns()
            .iter()
            .map(|c| GridColumn {
                name: c.name.clone(),
                role: c.role,
                editor: match c.role {
                    ColumnRole::Identifier => ColumnEditor::Text { disabled: true },
                    ColumnRole::Attendance => ColumnEditor::Checkbox { default: false },
                    ColumnRole::Grade => ColumnEditor::Number {
                        min_value: self.bounds.min,
                        max_value: self.bounds.max,
                        step: 0.01,
                        format: "%.2f",
                    },
                    ColumnRole::Other => ColumnEditor::Text { disabled: false },
                },
            })
            .collect();
        GridView {
            columns,
            rows: self.table.rows().to_vec(),
            fixed_rows: true,
        }
    }

    /// Applies a batch of edits all-or-nothing. The active table is only
    /// replaced when the result differs from it.
    pub fn apply_edits(&mut self, edits: &[CellEdit]) -> Result<EditOutcome> {
        let mut next = self.table.clone();
        for edit in edits {
            let col = next
                .column_index(&edit.column)
                .ok_or_else(|| GradebookError::InvalidEdit(format!("unknown column {}", edit.column)))?;
            let role = next.columns()[col].role;
            let cell = self.editor_value(role, edit)?;
            next.set_cell(edit.row, &edit.column, cell)?;
        }

        let changed = next != self.table;
        if changed {
            self.table = next;
            self.dirty = true;
        }
        debug!(session = %self.id, edits = edits.len(), changed, "edits applied");
        Ok(EditOutcome {
            changed,
            applied: edits.len(),
        })
    }

    fn editor_value(&self, role: ColumnRole, edit: &CellEdit) -> Result<Cell> {
        let bad = |what: &str| {
            GradebookError::InvalidEdit(format!(
                "{} expects {}, got {}",
                edit.column, what, edit.value
            ))
        };
        match role {
            ColumnRole::Identifier => Err(GradebookError::ReadOnlyColumn(edit.column.clone())),
            ColumnRole::Attendance => match &edit.value {
                serde_json::Value::Bool(b) => Ok(Cell::Bool(*b)),
                serde_json::Value::Null => Ok(Cell::Bool(false)),
                _ => Err(bad("a boolean")),
            },
            ColumnRole::Grade => match &edit.value {
                serde_json::Value::Null => Ok(Cell::Null),
                serde_json::Value::Number(n) => {
                    let v = n.as_f64().ok_or_else(|| bad("a number"))?;
                    if !self.bounds.contains(v) {
                        return Err(GradebookError::InvalidEdit(format!(
                            "{} must be between {} and {}, got {}",
                            edit.column, self.bounds.min, self.bounds.max, v
                        )));
                    }
                    Ok(Cell::Number(v))
                }
                _ => Err(bad("a number")),
            },
            ColumnRole::Other => Cell::from_json(&edit.value).ok_or_else(|| bad("a scalar")),
        }
    }

    /// Explicit persistence of the whole table. An empty table is never
    /// written, so a session opened on an unreadable slot cannot clear it.
    pub fn save(&mut self) -> Result<WriteReceipt> {
        if self.table.is_empty() {
            return Err(GradebookError::InvalidEdit(
                "nothing to save: the table is empty".to_string(),
            ));
        }
        let receipt = self.store.write(&self.table)?;
        self.dirty = false;
        Ok(receipt)
    }

    pub fn report(&self, kind: ReportKind) -> Result<ReportTable> {
        let report = match kind {
            ReportKind::Absences => reports::absence_report(&self.table, &self.rules),
            ReportKind::Grades => reports::grade_report(&self.table, &self.rules),
        };
        report.ok_or_else(|| GradebookError::ReportUnavailable {
            report: kind.as_str(),
            token: match kind.source_role() {
                ColumnRole::Attendance => self.rules.attendance_token.clone(),
                _ => self.rules.grade_token.clone(),
            },
        })
    }

    pub fn absence_report(&self) -> Result<ReportTable> {
        self.report(ReportKind::Absences)
    }

    pub fn grade_report(&self) -> Result<ReportTable> {
        self.report(ReportKind::Grades)
    }
}

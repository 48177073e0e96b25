use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{GradebookError, Notice, Result};
use crate::table::{parse_flag, Cell, ColumnRole, ColumnRules, Table};

/// Result of a seed load: the table (possibly empty) plus a banner when it failed.
#[derive(Debug, Clone)]
pub struct SeedLoad {
    pub table: Table,
    pub notice: Option<Notice>,
}

/// Reads a delimited seed file with a header row. Column names are trimmed.
pub fn read_seed(path: &Path, rules: &ColumnRules, delimiter: u8) -> Result<Table> {
    let malformed = |detail: String| GradebookError::SeedMalformed {
        path: path.to_path_buf(),
        detail,
    };

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GradebookError::SeedUnavailable {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(malformed(e.to_string())),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(file);

    let headers = reader.headers().map_err(|e| malformed(e.to_string()))?.clone();
    let mut names = Vec::with_capacity(headers.len());
    for (i, raw) in headers.iter().enumerate() {
        let raw = if i == 0 {
            raw.trim_start_matches('\u{feff}')
        } else {
            raw
        };
        let clean = raw.trim();
        if clean != raw {
            debug!(from = raw, to = clean, "renamed seed column");
        }
        names.push(clean.to_string());
    }
    if names.is_empty() || names.iter().all(|n| n.is_empty()) {
        return Err(malformed("no columns in header row".to_string()));
    }

    let roles: Vec<ColumnRole> = names.iter().map(|n| rules.classify(n)).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| malformed(e.to_string()))?;
        let cells = record
            .iter()
            .zip(roles.iter())
            .map(|(raw, role)| seed_cell(raw, *role))
            .collect();
        rows.push(cells);
    }

    let table = Table::new(rules, names, rows).map_err(|e| malformed(e.to_string()))?;
    info!(
        path = %path.display(),
        rows = table.row_count(),
        columns = ?table.column_names(),
        "loaded seed file"
    );
    Ok(table)
}

/// Attendance and grade text is left for the table to normalize.
fn seed_cell(raw: &str, role: ColumnRole) -> Cell {
    match role {
        ColumnRole::Identifier => Cell::Text(raw.to_string()),
        ColumnRole::Attendance | ColumnRole::Grade => {
            if raw.trim().is_empty() {
                Cell::Null
            } else {
                Cell::Text(raw.trim().to_string())
            }
        }
        ColumnRole::Other => infer_cell(raw),
    }
}

fn infer_cell(raw: &str) -> Cell {
    let t = raw.trim();
    if t.is_empty() {
        return Cell::Null;
    }
    if let Ok(n) = t.parse::<f64>() {
        if n.is_finite() {
            return Cell::Number(n);
        }
    }
    match t.to_ascii_lowercase().as_str() {
        "true" | "false" => parse_flag(t).map(Cell::Bool).unwrap_or(Cell::Null),
        _ => Cell::Text(raw.to_string()),
    }
}

/// Never fails: a missing or unreadable seed yields an empty table and an error banner.
pub fn load_seed(path: &Path, rules: &ColumnRules, delimiter: u8) -> SeedLoad {
    match read_seed(path, rules, delimiter) {
        Ok(table) => SeedLoad {
            table,
            notice: None,
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "seed load failed");
            SeedLoad {
                table: Table::default(),
                notice: Some(Notice::from_error(&e)),
            }
        }
    }
}

/// Keeps successfully loaded seeds for the life of the process. Failures are
/// not cached so a corrected file is picked up on the next session.
#[derive(Debug, Default)]
pub struct SeedCache {
    entries: HashMap<PathBuf, Table>,
}

impl SeedCache {
    pub fn load(&mut self, path: &Path, rules: &ColumnRules, delimiter: u8) -> SeedLoad {
        if let Some(table) = self.entries.get(path) {
            debug!(path = %path.display(), "seed served from cache");
            return SeedLoad {
                table: table.clone(),
                notice: None,
            };
        }
        let loaded = load_seed(path, rules, delimiter);
        if loaded.notice.is_none() {
            self.entries.insert(path.to_path_buf(), loaded.table.clone());
        }
        loaded
    }
}

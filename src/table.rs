use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnRole {
    Identifier,
    Attendance,
    Grade,
    Other,
}

/// Name-based rules that tag every column with a role when a table is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRules {
    #[serde(default = "default_identifiers")]
    pub identifiers: Vec<String>,
    #[serde(default = "default_attendance_token")]
    pub attendance_token: String,
    #[serde(default = "default_grade_token")]
    pub grade_token: String,
}

fn default_identifiers() -> Vec<String> {
    vec!["Nom".to_string(), "S1".to_string()]
}
fn default_attendance_token() -> String {
    "Présence".to_string()
}
fn default_grade_token() -> String {
    "Note".to_string()
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self {
            identifiers: default_identifiers(),
            attendance_token: default_attendance_token(),
            grade_token: default_grade_token(),
        }
    }
}

impl ColumnRules {
    /// Identifier names win over tokens, then attendance, then grade.
    pub fn classify(&self, name: &str) -> ColumnRole {
        if self.identifiers.iter().any(|id| id == name) {
            ColumnRole::Identifier
        } else if !self.attendance_token.is_empty() && name.contains(&self.attendance_token) {
            ColumnRole::Attendance
        } else if !self.grade_token.is_empty() && name.contains(&self.grade_token) {
            ColumnRole::Grade
        } else {
            ColumnRole::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn from_json(v: &serde_json::Value) -> Option<Cell> {
        match v {
            serde_json::Value::Null => Some(Cell::Null),
            serde_json::Value::Bool(b) => Some(Cell::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Cell::Number),
            serde_json::Value::String(s) => Some(Cell::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Null => serde_json::Value::Null,
            Cell::Bool(b) => serde_json::Value::Bool(*b),
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Cell::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Cell::Null => "null".to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => format!("{:?}", s),
        }
    }
}

/// Boolean spellings accepted in attendance cells, case-insensitive.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "1.0" | "yes" | "y" | "oui" | "vrai" | "x" => Some(true),
        "false" | "0" | "0.0" | "no" | "n" | "non" | "faux" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row}, column {column}: {value} is not a valid {expected} value")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },
    #[error("row {row} is out of range ({rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("unknown column: {0}")]
    UnknownColumn(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub role: ColumnRole,
}

/// Fixed-shape table: every row has exactly one cell per column, and
/// attendance cells are always booleans.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(
        rules: &ColumnRules,
        names: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, TableError> {
        {
            let mut seen = HashSet::new();
            for name in &names {
                if !seen.insert(name.as_str()) {
                    return Err(TableError::DuplicateColumn(name.clone()));
                }
            }
        }
        let columns: Vec<Column> = names
            .into_iter()
            .map(|name| Column {
                role: rules.classify(&name),
                name,
            })
            .collect();

        let mut normalized = Vec::with_capacity(rows.len());
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RaggedRow {
                    row: row_idx,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            let cells = row
                .into_iter()
                .zip(columns.iter())
                .map(|(cell, col)| normalize_cell(cell, col, row_idx))
                .collect::<Result<Vec<_>, _>>()?;
            normalized.push(cells);
        }

        Ok(Self {
            columns,
            rows: normalized,
        })
    }

    /// True when there is nothing to show: no columns or no rows.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn columns_with_role(&self, role: ColumnRole) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.role == role)
            .map(|(i, _)| i)
            .collect()
    }

    #[cfg(test)]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Replaces one cell, normalizing it for the column's role. Range limits
    /// on grades are an editor concern and are not checked here.
    pub fn set_cell(&mut self, row: usize, column: &str, value: Cell) -> Result<(), TableError> {
        let rows = self.rows.len();
        let col = self
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        if row >= rows {
            return Err(TableError::RowOutOfRange { row, rows });
        }
        let cell = normalize_cell(value, &self.columns[col], row)?;
        self.rows[row][col] = cell;
        Ok(())
    }
}

fn normalize_cell(cell: Cell, col: &Column, row: usize) -> Result<Cell, TableError> {
    let invalid = |cell: &Cell, expected: &'static str| TableError::InvalidCell {
        row,
        column: col.name.clone(),
        value: cell.describe(),
        expected,
    };
    match col.role {
        ColumnRole::Attendance => match cell {
            Cell::Bool(_) => Ok(cell),
            Cell::Null => Ok(Cell::Bool(false)),
            Cell::Number(n) => Ok(Cell::Bool(n != 0.0)),
            Cell::Text(ref s) if s.trim().is_empty() => Ok(Cell::Bool(false)),
            Cell::Text(ref s) => parse_flag(s)
                .map(Cell::Bool)
                .ok_or_else(|| invalid(&cell, "attendance")),
        },
        ColumnRole::Grade => match cell {
            Cell::Number(n) if n.is_finite() => Ok(cell),
            Cell::Number(_) | Cell::Null => Ok(Cell::Null),
            Cell::Text(ref s) if s.trim().is_empty() => Ok(Cell::Null),
            Cell::Text(ref s) => match s.trim().replace(',', ".").parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Cell::Number(n)),
                Ok(_) => Ok(Cell::Null),
                Err(_) => Err(invalid(&cell, "grade")),
            },
            Cell::Bool(_) => Err(invalid(&cell, "grade")),
        },
        ColumnRole::Identifier => match cell {
            Cell::Number(n) => Ok(Cell::Text(n.to_string())),
            other => Ok(other),
        },
        ColumnRole::Other => Ok(cell),
    }
}

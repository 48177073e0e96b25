use serde::Serialize;
use std::cmp::Ordering;
use std::path::Path;

use crate::error::Result;
use crate::table::{Cell, ColumnRole, ColumnRules, Table};

pub const TOTAL_ABSENCES: &str = "Total Absences";
pub const AVERAGE_GRADE: &str = "Moyenne Notes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportKind {
    Absences,
    Grades,
}

impl ReportKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absences" => Some(ReportKind::Absences),
            "grades" => Some(ReportKind::Grades),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Absences => "absences",
            ReportKind::Grades => "grades",
        }
    }

    pub fn source_role(self) -> ColumnRole {
        match self {
            ReportKind::Absences => ColumnRole::Attendance,
            ReportKind::Grades => ColumnRole::Grade,
        }
    }

    pub fn value_column(self) -> &'static str {
        match self {
            ReportKind::Absences => TOTAL_ABSENCES,
            ReportKind::Grades => AVERAGE_GRADE,
        }
    }
}

/// A derived, read-only view: identifier columns in configured order, then
/// one value column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub kind: ReportKind,
    pub columns: Vec<String>,
    pub data: Vec<Vec<Cell>>,
}

impl ReportTable {
    #[cfg(test)]
    pub fn value(&self, row: usize) -> Option<&Cell> {
        self.data.get(row).and_then(|r| r.last())
    }
}

/// Round half away from zero to 2 decimals.
pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Absences per student: attendance cells that are not `true`. Null counts
/// as absent. `None` when the table has no attendance column.
pub fn absence_report(table: &Table, rules: &ColumnRules) -> Option<ReportTable> {
    let cols = table.columns_with_role(ColumnRole::Attendance);
    if cols.is_empty() {
        return None;
    }
    Some(build_report(table, rules, ReportKind::Absences, |row| {
        let absent = cols
            .iter()
            .filter(|&&c| row[c].as_bool() != Some(true))
            .count();
        Cell::Number(absent as f64)
    }))
}

/// Mean of the non-null grade cells per student, rounded to 2 decimals.
/// A student with no grades at all gets a null average.
pub fn grade_report(table: &Table, rules: &ColumnRules) -> Option<ReportTable> {
    let cols = table.columns_with_role(ColumnRole::Grade);
    if cols.is_empty() {
        return None;
    }
    Some(build_report(table, rules, ReportKind::Grades, |row| {
        let values: Vec<f64> = cols.iter().filter_map(|&c| row[c].as_f64()).collect();
        if values.is_empty() {
            Cell::Null
        } else {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            Cell::Number(round_2_decimals(mean))
        }
    }))
}

fn build_report<F>(table: &Table, rules: &ColumnRules, kind: ReportKind, value_of: F) -> ReportTable
where
    F: Fn(&[Cell]) -> Cell,
{
    let id_cols: Vec<usize> = rules
        .identifiers
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect();
    let mut columns: Vec<String> = id_cols
        .iter()
        .map(|&c| table.columns()[c].name.clone())
        .collect();
    columns.push(kind.value_column().to_string());

    let mut data: Vec<Vec<Cell>> = table
        .rows()
        .iter()
        .map(|row| {
            let mut out: Vec<Cell> = id_cols.iter().map(|&c| row[c].clone()).collect();
            out.push(value_of(row.as_slice()));
            out
        })
        .collect();

    // sort_by is stable: ties keep table order.
    data.sort_by(|a, b| descending_nulls_last(a.last(), b.last()));

    ReportTable {
        kind,
        columns,
        data,
    }
}

fn descending_nulls_last(a: Option<&Cell>, b: Option<&Cell>) -> Ordering {
    match (a.and_then(Cell::as_f64), b.and_then(Cell::as_f64)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn render_cell(cell: &Cell, kind: ReportKind, is_value: bool) -> String {
    match cell {
        Cell::Null => String::new(),
        Cell::Bool(b) => b.to_string(),
        Cell::Number(n) if is_value && kind == ReportKind::Grades => format!("{:.2}", n),
        Cell::Number(n) => n.to_string(),
        Cell::Text(s) => s.clone(),
    }
}

/// Writes a report as CSV with a header row. Returns the number of data rows.
pub fn export_report_csv(report: &ReportTable, out: &Path) -> Result<usize> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(out)?;
    writer.write_record(&report.columns)?;
    let last = report.columns.len().saturating_sub(1);
    for row in &report.data {
        let record: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| render_cell(cell, report.kind, i == last))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(report.data.len())
}

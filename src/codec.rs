use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{GradebookError, Result};
use crate::table::{Cell, ColumnRules, Table};

/// Stored layout: ordered column names plus row-major values, no row index.
#[derive(Debug, Serialize, Deserialize)]
struct SplitPayload {
    columns: Vec<String>,
    data: Vec<Vec<serde_json::Value>>,
}

pub fn encode_table(table: &Table) -> Result<String> {
    let payload = SplitPayload {
        columns: table.columns().iter().map(|c| c.name.clone()).collect(),
        data: table
            .rows()
            .iter()
            .map(|row| row.iter().map(Cell::to_json).collect())
            .collect(),
    };
    serde_json::to_string(&payload).map_err(|e| GradebookError::Payload(e.to_string()))
}

/// Decodes a stored payload. Attendance columns come back as booleans
/// whatever spelling the payload used (0/1, "true"/"false", native).
pub fn decode_table(payload: &str, rules: &ColumnRules) -> Result<Table> {
    let parsed: SplitPayload =
        serde_json::from_str(payload).map_err(|e| GradebookError::Payload(e.to_string()))?;

    let mut rows = Vec::with_capacity(parsed.data.len());
    for (row_idx, raw) in parsed.data.iter().enumerate() {
        let cells = raw
            .iter()
            .map(|v| {
                Cell::from_json(v).ok_or_else(|| {
                    GradebookError::Payload(format!("row {}: nested value {}", row_idx, v))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(cells);
    }

    Table::new(rules, parsed.columns, rows).map_err(|e| GradebookError::Payload(e.to_string()))
}

pub fn payload_digest(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            &ColumnRules::default(),
            vec![
                "Nom".into(),
                "S1".into(),
                "Présence_S1".into(),
                "Note_S1".into(),
                "Commentaire".into(),
            ],
            vec![
                vec![
                    Cell::Text("Alice".into()),
                    Cell::Text("A".into()),
                    Cell::Bool(true),
                    Cell::Number(15.0),
                    Cell::Null,
                ],
                vec![
                    Cell::Text("Bob".into()),
                    Cell::Text("B".into()),
                    Cell::Bool(false),
                    Cell::Number(10.25),
                    Cell::Text("retard".into()),
                ],
            ],
        )
        .expect("sample table")
    }

    #[test]
    fn round_trip_preserves_values_order_and_types() {
        let table = sample();
        let payload = encode_table(&table).expect("encode");
        let back = decode_table(&payload, &ColumnRules::default()).expect("decode");
        assert_eq!(back, table);
        assert_eq!(back.column_names(), vec!["Nom", "S1", "Présence_S1", "Note_S1", "Commentaire"]);
    }

    #[test]
    fn payload_has_no_row_index() {
        let payload = encode_table(&sample()).expect("encode");
        let v: serde_json::Value = serde_json::from_str(&payload).expect("json");
        assert!(v.get("index").is_none());
        assert_eq!(v["data"][0][2], serde_json::json!(true));
    }

    #[test]
    fn integer_attendance_reads_back_as_bool() {
        let payload = r#"{"columns":["Nom","Présence_S1"],"data":[["A",1],["B",0],["C",1]]}"#;
        let t = decode_table(payload, &ColumnRules::default()).expect("decode");
        let flags: Vec<Option<bool>> = (0..3).map(|r| t.cell(r, 1).and_then(Cell::as_bool)).collect();
        assert_eq!(flags, vec![Some(true), Some(false), Some(true)]);
    }

    #[test]
    fn string_attendance_reads_back_as_bool() {
        let payload = r#"{"columns":["Nom","Présence_S1"],"data":[["A","true"],["B","false"]]}"#;
        let t = decode_table(payload, &ColumnRules::default()).expect("decode");
        assert_eq!(t.cell(0, 1), Some(&Cell::Bool(true)));
        assert_eq!(t.cell(1, 1), Some(&Cell::Bool(false)));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let rules = ColumnRules::default();
        assert!(matches!(
            decode_table("not json", &rules),
            Err(GradebookError::Payload(_))
        ));
        assert!(matches!(
            decode_table(r#"{"columns":["Nom"],"data":[["A","extra"]]}"#, &rules),
            Err(GradebookError::Payload(_))
        ));
        assert!(matches!(
            decode_table(r#"{"columns":["Nom"],"data":[[{"x":1}]]}"#, &rules),
            Err(GradebookError::Payload(_))
        ));
    }

    #[test]
    fn empty_table_round_trips() {
        let payload = encode_table(&Table::default()).expect("encode");
        assert_eq!(payload, r#"{"columns":[],"data":[]}"#);
        let back = decode_table(&payload, &ColumnRules::default()).expect("decode");
        assert!(back.is_empty());
    }

    #[test]
    fn digest_is_stable_hex() {
        let d = payload_digest("abc");
        assert_eq!(
            d,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

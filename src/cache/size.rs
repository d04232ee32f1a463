//! Heuristic result size estimation.
//!
//! The estimate is deliberately approximate; its only job is to reject
//! pathologically large payloads before they bloat memory.

use crate::executor::QueryValue;

/// Assumed bytes per columnar cell.
const COLUMNAR_CELL_BYTES: usize = 20;

/// Estimate the in-memory footprint of a result.
///
/// Columnar handles cost `rows × fields × 20`; row sets cost the row count
/// times the serialized size of one sample row.
pub fn estimate_size(value: &QueryValue) -> usize {
    match value {
        QueryValue::None => 0,
        QueryValue::Rows(rows) => match rows.first() {
            Some(sample) => rows.len() * sample.to_string().len(),
            None => 0,
        },
        QueryValue::Columnar(batch) => {
            batch.row_count() * batch.field_count() * COLUMNAR_CELL_BYTES
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ColumnarBatch;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_none_is_free() {
        assert_eq!(estimate_size(&QueryValue::None), 0);
    }

    #[test]
    fn test_empty_rows_are_free() {
        assert_eq!(estimate_size(&QueryValue::Rows(vec![])), 0);
    }

    #[test]
    fn test_rows_scale_with_count() {
        let row = json!({ "id": 1, "name": "alice" });
        let one = estimate_size(&QueryValue::Rows(vec![row.clone()]));
        let ten = estimate_size(&QueryValue::Rows(vec![row; 10]));
        assert_eq!(ten, one * 10);
        assert!(one > 0);
    }

    #[test]
    fn test_columnar_uses_fixed_cell_cost() {
        let batch = ColumnarBatch {
            fields: vec!["a".to_string(), "b".to_string()],
            columns: vec![vec![json!(1); 100], vec![json!(2); 100]],
        };
        assert_eq!(
            estimate_size(&QueryValue::Columnar(Arc::new(batch))),
            100 * 2 * 20
        );
    }
}

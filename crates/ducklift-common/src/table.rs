//! In-memory tabular representation
//!
//! A [`StructuredTable`] is the common currency between the format decoders
//! and the analytical-store sink: ordered column names plus ordered rows of
//! JSON scalar cells. Tables exist only within a single ingestion run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IngestError, Result};

/// How column-set divergence is handled when concatenating tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnPolicy {
    /// All tables must carry the same column set; divergence fails loudly
    Exact,
    /// Outer-join style union: columns appear in first-seen order and
    /// missing cells are filled with null
    #[default]
    Union,
}

/// An ordered sequence of rows sharing one column set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl StructuredTable {
    /// Create a table with the given columns and no rows
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table with no columns and no rows
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row. The caller is responsible for matching the column arity;
    /// the decoders always produce full-width rows.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Concatenate tables in order, renumbering rows sequentially
    ///
    /// Row order within each table and the table order itself are preserved.
    /// Column handling follows `policy`; under [`ColumnPolicy::Exact`] any
    /// divergence in column sets returns [`IngestError::ColumnMismatch`].
    /// An empty input slice yields an empty table.
    pub fn concat(tables: Vec<StructuredTable>, policy: ColumnPolicy) -> Result<StructuredTable> {
        let mut iter = tables.into_iter();
        let Some(first) = iter.next() else {
            return Ok(StructuredTable::empty());
        };

        let mut merged = first;
        for table in iter {
            match policy {
                ColumnPolicy::Exact => {
                    if table.columns != merged.columns {
                        return Err(IngestError::ColumnMismatch(format!(
                            "expected columns [{}], found [{}]",
                            merged.columns.join(", "),
                            table.columns.join(", ")
                        )));
                    }
                    merged.rows.extend(table.rows);
                },
                ColumnPolicy::Union => {
                    for name in &table.columns {
                        if !merged.columns.contains(name) {
                            merged.columns.push(name.clone());
                            for row in &mut merged.rows {
                                row.push(Value::Null);
                            }
                        }
                    }
                    // Remap each incoming row into the merged column order.
                    let indices: Vec<Option<usize>> = merged
                        .columns
                        .iter()
                        .map(|name| table.columns.iter().position(|c| c == name))
                        .collect();
                    for row in table.rows {
                        let remapped = indices
                            .iter()
                            .map(|idx| match idx {
                                Some(i) => row[*i].clone(),
                                None => Value::Null,
                            })
                            .collect();
                        merged.rows.push(remapped);
                    }
                },
            }
        }

        Ok(merged)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> StructuredTable {
        StructuredTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn test_concat_empty_input_yields_empty_table() {
        let merged = StructuredTable::concat(Vec::new(), ColumnPolicy::Exact).unwrap();
        assert_eq!(merged.num_rows(), 0);
        assert_eq!(merged.num_columns(), 0);
    }

    #[test]
    fn test_concat_exact_preserves_row_order() {
        let a = table(&["x", "y"], vec![vec![json!(1), json!(2)]]);
        let b = table(
            &["x", "y"],
            vec![vec![json!(3), json!(4)], vec![json!(5), json!(6)]],
        );

        let merged = StructuredTable::concat(vec![a, b], ColumnPolicy::Exact).unwrap();
        assert_eq!(merged.num_rows(), 3);
        assert_eq!(merged.rows[0], vec![json!(1), json!(2)]);
        assert_eq!(merged.rows[2], vec![json!(5), json!(6)]);
    }

    #[test]
    fn test_concat_exact_rejects_divergent_columns() {
        let a = table(&["x", "y"], vec![]);
        let b = table(&["x", "z"], vec![]);

        let err = StructuredTable::concat(vec![a, b], ColumnPolicy::Exact).unwrap_err();
        assert!(matches!(err, IngestError::ColumnMismatch(_)));
    }

    #[test]
    fn test_concat_union_fills_missing_cells_with_null() {
        let a = table(&["x", "y"], vec![vec![json!(1), json!(2)]]);
        let b = table(&["y", "z"], vec![vec![json!(3), json!(4)]]);

        let merged = StructuredTable::concat(vec![a, b], ColumnPolicy::Union).unwrap();
        assert_eq!(merged.columns, vec!["x", "y", "z"]);
        assert_eq!(merged.rows[0], vec![json!(1), json!(2), Value::Null]);
        assert_eq!(merged.rows[1], vec![Value::Null, json!(3), json!(4)]);
    }

    #[test]
    fn test_push_row() {
        let mut t = StructuredTable::new(vec!["a".into(), "b".into()]);
        assert!(t.is_empty());
        t.push_row(vec![json!("v"), json!(1)]);
        assert_eq!(t.num_rows(), 1);
    }
}

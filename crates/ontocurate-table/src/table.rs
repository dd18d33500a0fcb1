//! Header-aligned tables of string cells.
//!
//! The editor exchanges rows as JSON objects keyed by column name; inside the
//! crate every row is a `Vec<String>` aligned with the header. `null` and the
//! empty string are the same thing (a blank cell).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{TableSchema, LABEL, ROW_SEQUENCE};
use crate::TableError;

pub type Row = Vec<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Row>,
}

fn cell_from_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(header: Vec<String>, rows: Vec<Row>) -> Result<Self, TableError> {
        let mut table = Self::new(header);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Rows must already match the header width.
    pub(crate) fn from_parts(header: Vec<String>, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == header.len()));
        Self { header, rows }
    }

    /// Build a table from editor records.
    ///
    /// When `header` is empty the header is taken from the keys of the first
    /// record. Keys missing from a record read as blank; keys not in the header
    /// are dropped.
    pub fn from_records(header: &[String], records: &[Value]) -> Result<Self, TableError> {
        let header: Vec<String> = if header.is_empty() {
            match records.first() {
                Some(Value::Object(first)) => first.keys().cloned().collect(),
                Some(_) => return Err(TableError::NotAnObject { row: 0 }),
                None => Vec::new(),
            }
        } else {
            header.to_vec()
        };

        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let Value::Object(map) = record else {
                return Err(TableError::NotAnObject { row: i });
            };
            rows.push(
                header
                    .iter()
                    .map(|col| map.get(col).map(cell_from_value).unwrap_or_default())
                    .collect(),
            );
        }
        Ok(Self { header, rows })
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut map = Map::new();
                for (col, cell) in self.header.iter().zip(row) {
                    map.insert(col.clone(), Value::String(cell.clone()));
                }
                Value::Object(map)
            })
            .collect()
    }

    /// Rows as JSON objects with a fresh 1-based row-sequence column.
    pub fn to_records_with_row_ids(&self) -> Vec<Value> {
        self.to_records()
            .into_iter()
            .enumerate()
            .map(|(i, mut record)| {
                if let Value::Object(map) = &mut record {
                    map.insert(ROW_SEQUENCE.to_string(), Value::from(i + 1));
                }
                record
            })
            .collect()
    }

    pub fn push_row(&mut self, row: Row) -> Result<(), TableError> {
        if row.len() != self.header.len() {
            return Err(TableError::RowWidth {
                row: self.rows.len(),
                expected: self.header.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    pub fn schema(&self) -> TableSchema {
        TableSchema::resolve(&self.header)
    }

    /// Drop a column, if present.
    pub fn without_column(&self, name: &str) -> Table {
        let Some(col) = self.column(name) else {
            return self.clone();
        };
        let mut header = self.header.clone();
        header.remove(col);
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.remove(col);
                row
            })
            .collect();
        Table { header, rows }
    }

    /// Re-shape onto `header`, blank-filling columns this table lacks.
    pub fn project(&self, header: &[String]) -> Table {
        let mapping: Vec<Option<usize>> = header.iter().map(|h| self.column(h)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                mapping
                    .iter()
                    .map(|m| m.map(|c| row[c].clone()).unwrap_or_default())
                    .collect()
            })
            .collect();
        Table {
            header: header.to_vec(),
            rows,
        }
    }

    /// Stable sort on one column. Returns `false` when the column is absent.
    pub fn sort_by_column(&mut self, name: &str) -> bool {
        let Some(col) = self.column(name) else {
            return false;
        };
        self.rows.sort_by(|a, b| a[col].cmp(&b[col]));
        true
    }

    /// Strip the UI row-sequence column and sort by label.
    pub fn normalized_for_diff(&self) -> Table {
        let mut table = self.without_column(ROW_SEQUENCE);
        if !table.sort_by_column(LABEL) {
            tracing::debug!("no Label column present, table left unsorted");
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn records_map_null_to_blank() {
        let records = vec![
            json!({"id": 1, "ID": "ABC:0001", "Label": "Foo", "Definition": null}),
            json!({"id": 2, "ID": "", "Label": "Bar"}),
        ];
        let table = Table::from_records(&[], &records).unwrap();
        assert_eq!(table.cell(0, "Definition"), Some(""));
        assert_eq!(table.cell(1, "Definition"), Some(""));
        assert_eq!(table.cell(0, "id"), Some("1"));
    }

    #[test]
    fn non_object_record_is_rejected() {
        let err = Table::from_records(&header(&["ID"]), &[json!(["ABC:1"])]).unwrap_err();
        assert!(matches!(err, TableError::NotAnObject { row: 0 }));
    }

    #[test]
    fn row_width_is_enforced() {
        let mut table = Table::new(header(&["ID", "Label"]));
        assert!(table.push_row(vec!["ABC:1".into()]).is_err());
        assert!(table.push_row(vec!["ABC:1".into(), "Foo".into()]).is_ok());
    }

    #[test]
    fn normalization_strips_row_sequence_and_sorts_by_label() {
        let table = Table::from_rows(
            header(&["id", "ID", "Label"]),
            vec![
                vec!["1".into(), "ABC:2".into(), "zeta".into()],
                vec!["2".into(), "ABC:1".into(), "alpha".into()],
            ],
        )
        .unwrap();
        let normalized = table.normalized_for_diff();
        assert_eq!(normalized.header(), &header(&["ID", "Label"])[..]);
        assert_eq!(normalized.rows()[0], vec!["ABC:1".to_string(), "alpha".to_string()]);
    }

    #[test]
    fn sorting_without_label_column_is_skipped() {
        let mut table = Table::from_rows(
            header(&["ID"]),
            vec![vec!["ABC:2".into()], vec!["ABC:1".into()]],
        )
        .unwrap();
        assert!(!table.sort_by_column(LABEL));
        assert_eq!(table.rows()[0][0], "ABC:2");
    }

    #[test]
    fn row_ids_are_one_based() {
        let table =
            Table::from_rows(header(&["Label"]), vec![vec!["a".into()], vec!["b".into()]]).unwrap();
        let records = table.to_records_with_row_ids();
        assert_eq!(records[0]["id"], json!(1));
        assert_eq!(records[1]["id"], json!(2));
        assert_eq!(records[1]["Label"], json!("b"));
    }
}

//! Flattening the nested user records into a typed table.
//!
//! Each record becomes one row whose columns are the dotted paths of its leaf
//! values (`location.street.number`). The catalog crawler infers its schema
//! from samples of the files we write, so the column types have to be stable
//! from run to run: allow-listed columns are always integers, everything else
//! is always text. A column that mixes strings and numbers across rows would
//! otherwise flip types between files.

use serde_json::Value;
use std::collections::HashMap;

use crate::{
    config::{NumericColumns, NumericWidth},
    error::IngestionError,
};

/// How null and missing values are rendered in text columns.
pub const NULL_TEXT: &str = "null";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColumnKind {
    Integer(NumericWidth),
    Text,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Cell {
    Integer(i64),
    Text(String),
}

/// One flattened record. Cells line up with [`NormalizedTable::columns`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NormalizedRow(pub Vec<Cell>);

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NormalizedTable {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedTable {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// All of the cells of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r.0[idx]).collect())
    }
}

/// Flatten and type a batch of raw records.
///
/// The column set is the union of the flattened keys of every record, ordered
/// by first appearance. Rows that lack a column get the null rendering for it
/// (`0` for integer columns).
pub fn normalize(
    records: &[Value],
    numeric: &NumericColumns,
) -> Result<NormalizedTable, IngestionError> {
    let mut names: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut flat_records = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let obj = record.as_object().ok_or_else(|| {
            IngestionError::invalid_response(format!(
                "Invalid response from API: results[{i}] is not a JSON object"
            ))
        })?;

        let mut leaves = Vec::new();
        flatten_into("", obj, &mut leaves);

        let mut flat: HashMap<String, &Value> = HashMap::with_capacity(leaves.len());

        for (key, value) in leaves {
            if !index.contains_key(&key) {
                index.insert(key.clone(), names.len());
                names.push(key.clone());
            }

            // Later duplicates of a dotted path win, as with map insertion.
            flat.insert(key, value);
        }

        flat_records.push(flat);
    }

    let columns: Vec<ColumnSpec> = names
        .into_iter()
        .map(|name| {
            let kind = match numeric.width(&name) {
                Some(w) => ColumnKind::Integer(w),
                None => ColumnKind::Text,
            };
            ColumnSpec { name, kind }
        })
        .collect();

    let rows = flat_records
        .iter()
        .map(|flat| {
            NormalizedRow(
                columns
                    .iter()
                    .map(|col| {
                        let value = flat.get(&col.name).copied();

                        match col.kind {
                            ColumnKind::Integer(w) => Cell::Integer(coerce_integer(value, w)),
                            ColumnKind::Text => Cell::Text(coerce_text(value)),
                        }
                    })
                    .collect(),
            )
        })
        .collect();

    Ok(NormalizedTable { columns, rows })
}

fn flatten_into<'a>(
    prefix: &str,
    obj: &'a serde_json::Map<String, Value>,
    out: &mut Vec<(String, &'a Value)>,
) {
    for (key, value) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(&path, inner, out),
            _ => out.push((path, value)),
        }
    }
}

/// Best-effort integer coercion. Anything we can't make sense of is `0`.
pub fn coerce_integer(value: Option<&Value>, width: NumericWidth) -> i64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Some(Value::String(s)) => parse_integer_text(s),
        Some(Value::Bool(b)) => Some(*b as i64),
        _ => None,
    };

    n.filter(|v| width.contains(*v)).unwrap_or(0)
}

pub fn coerce_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NULL_TEXT.to_owned(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn parse_integer_text(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(truncate))
}

fn truncate(f: f64) -> Option<i64> {
    // `i64::MAX as f64` rounds up to 2^63, hence the strict upper bound.
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

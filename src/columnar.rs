//! Encoding a normalized table as an in-memory Parquet file.

use arrow::{
    array::{ArrayRef, Int32Builder, Int64Builder, StringBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use parquet::{
    arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties, format::KeyValue,
};
use std::sync::Arc;

use crate::{
    config::NumericWidth,
    normalize::{Cell, ColumnKind, NormalizedTable},
};

#[derive(Debug, thiserror::Error)]
pub enum ColumnarError {
    #[error("Arrow conversion error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet write error: {0}")]
    Write(#[from] parquet::errors::ParquetError),
}

fn arrow_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Integer(NumericWidth::Int32) => DataType::Int32,
        ColumnKind::Integer(NumericWidth::Int64) => DataType::Int64,
        ColumnKind::Text => DataType::Utf8,
    }
}

pub fn build_schema(table: &NormalizedTable) -> Schema {
    let fields: Vec<Field> = table
        .columns
        .iter()
        .map(|col| Field::new(&col.name, arrow_type(col.kind), false))
        .collect();
    Schema::new(fields)
}

pub fn to_record_batch(table: &NormalizedTable) -> Result<RecordBatch, ColumnarError> {
    let schema = Arc::new(build_schema(table));
    let num_rows = table.num_rows();
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns.len());

    for (idx, col) in table.columns.iter().enumerate() {
        let cells = table.rows.iter().map(|r| &r.0[idx]);

        // The normalizer guarantees that every cell matches its column kind;
        // the fallbacks below are never hit in practice.
        let array: ArrayRef = match col.kind {
            ColumnKind::Integer(NumericWidth::Int64) => {
                let mut builder = Int64Builder::with_capacity(num_rows);
                for cell in cells {
                    builder.append_value(match cell {
                        Cell::Integer(v) => *v,
                        Cell::Text(_) => 0,
                    });
                }
                Arc::new(builder.finish())
            }

            ColumnKind::Integer(NumericWidth::Int32) => {
                let mut builder = Int32Builder::with_capacity(num_rows);
                for cell in cells {
                    builder.append_value(match cell {
                        Cell::Integer(v) => i32::try_from(*v).unwrap_or(0),
                        Cell::Text(_) => 0,
                    });
                }
                Arc::new(builder.finish())
            }

            ColumnKind::Text => {
                let mut builder = StringBuilder::with_capacity(num_rows, num_rows * 16);
                for cell in cells {
                    match cell {
                        Cell::Text(s) => builder.append_value(s),
                        Cell::Integer(v) => builder.append_value(v.to_string()),
                    }
                }
                Arc::new(builder.finish())
            }
        };

        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

/// Write the table to a complete Parquet file in memory.
///
/// `metadata` lands in the file footer as key-value pairs.
pub fn write_parquet_bytes(
    table: &NormalizedTable,
    metadata: Vec<(String, String)>,
) -> Result<Vec<u8>, ColumnarError> {
    let batch = to_record_batch(table)?;

    let kv = metadata
        .into_iter()
        .map(|(k, v)| KeyValue::new(k, Some(v)))
        .collect();

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .set_key_value_metadata(Some(kv))
        .build();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(buf)
}

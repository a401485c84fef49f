//! Arrow to ClickHouse type mapping and batch encoding.

use arrow::array::RecordBatch;
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::json::LineDelimitedWriter;
use std::sync::Arc;

use crate::gateway::clickhouse::quote_identifier;

/// Column type used for an Arrow field in the destination table.
pub fn arrow_to_clickhouse(data_type: &DataType) -> &'static str {
    match data_type {
        dt if dt.is_integer() => "Int64",
        dt if dt.is_floating() => "Float64",
        DataType::Boolean => "UInt8",
        DataType::Timestamp(_, _) => "DateTime",
        _ => "String",
    }
}

/// `CREATE TABLE IF NOT EXISTS` for a Parquet schema. `table` must already
/// be a valid identifier.
pub fn create_table_sql(table: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| {
            format!(
                "{} {}",
                quote_identifier(f.name()),
                arrow_to_clickhouse(f.data_type())
            )
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} ({}) ENGINE = MergeTree() ORDER BY tuple()",
        columns.join(", ")
    )
}

/// Arrow type a column is converted to before JSON encoding, if any.
fn wire_type(data_type: &DataType) -> Option<DataType> {
    match data_type {
        DataType::Boolean => Some(DataType::UInt8),
        dt if dt.is_integer() || dt.is_floating() => None,
        DataType::Timestamp(_, _) | DataType::Utf8 | DataType::LargeUtf8 => None,
        dt if can_cast_types(dt, &DataType::Utf8) => Some(DataType::Utf8),
        _ => None,
    }
}

/// Cast columns so their JSON form matches the destination column type:
/// booleans become 0/1 and types stored as `String` become text.
pub fn prepare_batch(batch: &RecordBatch) -> Result<RecordBatch, ArrowError> {
    let schema = batch.schema();
    if schema.fields().iter().all(|f| wire_type(f.data_type()).is_none()) {
        return Ok(batch.clone());
    }

    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut columns = Vec::with_capacity(batch.num_columns());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        match wire_type(field.data_type()) {
            Some(target) => {
                columns.push(cast(column, &target)?);
                fields.push(Field::new(field.name(), target, field.is_nullable()));
            }
            None => {
                columns.push(Arc::clone(column));
                fields.push(field.as_ref().clone());
            }
        }
    }
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
}

/// Newline-delimited JSON objects, one per row (`JSONEachRow`).
pub fn encode_json_rows(batch: &RecordBatch) -> Result<Vec<u8>, ArrowError> {
    let prepared = prepare_batch(batch)?;
    let mut writer = LineDelimitedWriter::new(Vec::new());
    writer.write(&prepared)?;
    writer.finish()?;
    Ok(writer.into_inner())
}

use crate::process::{
    schema::{infer_schema, ColumnType},
    utils::parse_bool,
    RawTable,
};
use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use std::sync::Arc;

/// Convert a string table into a typed Arrow batch.
pub fn to_record_batch(table: &RawTable) -> Result<RecordBatch> {
    let (types, schema) = infer_schema(table);
    let mut columns = Vec::with_capacity(types.len());

    for (idx, ty) in types.iter().enumerate() {
        let name = &table.headers[idx];
        let col: ArrayRef = match ty {
            ColumnType::Int64 => {
                let mut b = Int64Builder::with_capacity(table.num_rows());
                for cell in table.column(idx) {
                    let v = cell
                        .map(|s| s.parse::<i64>())
                        .transpose()
                        .with_context(|| format!("column `{}` is not integer", name))?;
                    b.append_option(v);
                }
                Arc::new(b.finish())
            }
            ColumnType::Float64 => {
                let mut b = Float64Builder::with_capacity(table.num_rows());
                for cell in table.column(idx) {
                    let v = cell
                        .map(|s| s.parse::<f64>())
                        .transpose()
                        .with_context(|| format!("column `{}` is not numeric", name))?;
                    b.append_option(v);
                }
                Arc::new(b.finish())
            }
            ColumnType::Boolean => {
                let mut b = BooleanBuilder::with_capacity(table.num_rows());
                for cell in table.column(idx) {
                    let v = cell
                        .map(|s| parse_bool(s).ok_or_else(|| anyhow!("`{}` is not boolean", s)))
                        .transpose()
                        .with_context(|| format!("column `{}`", name))?;
                    b.append_option(v);
                }
                Arc::new(b.finish())
            }
            ColumnType::Utf8 => {
                let mut b = StringBuilder::new();
                for cell in table.column(idx) {
                    b.append_option(cell);
                }
                Arc::new(b.finish())
            }
        };
        columns.push(col);
    }

    // a zero-column table still carries its row count
    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    RecordBatch::try_new_with_options(Arc::new(schema), columns, &options)
        .context("building record batch")
}

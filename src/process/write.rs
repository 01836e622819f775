use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};

/// Serialise one batch into an in-memory Parquet file (Snappy).
pub fn write_parquet_to_memory(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;

    Ok(buffer)
}

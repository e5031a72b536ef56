//! Parquet encoding of table parts.

use crate::error::JobResult;
use bytes::Bytes;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::parquet::arrow::ArrowWriter;
use datafusion::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

/// Encode batches into one Parquet part. No batches still yields a valid, schema-only part.
pub(crate) fn encode_part(schema: SchemaRef, batches: &[RecordBatch]) -> JobResult<Bytes> {
    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, None)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(Bytes::from(buffer))
}

pub(crate) fn decode_part(
    data: Bytes,
    batch_size: usize,
) -> JobResult<(SchemaRef, Vec<RecordBatch>)> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
    let schema = builder.schema().clone();
    let reader = builder.with_batch_size(batch_size).build()?;
    let batches = reader.collect::<Result<Vec<_>, ArrowError>>()?;
    Ok((schema, batches))
}

/// Read only the schema of a part.
pub(crate) fn decode_schema(data: Bytes) -> JobResult<SchemaRef> {
    Ok(ParquetRecordBatchReaderBuilder::try_new(data)?.schema().clone())
}

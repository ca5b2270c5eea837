use crate::datasets::DatasetFile;
use crate::records::sample_records;
use anyhow::{bail, Context, Result};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::json::reader::infer_json_schema_from_iterator;
use std::path::Path;
use std::sync::Arc;

/// Infer the Arrow schema of a dataset file from its first `sample_size` records.
///
/// Records past the sample must fit the inferred schema; fields that never appear in
/// the sample are dropped on write.
pub fn infer_schema(path: &Path, dataset: &DatasetFile, buf_bytes: usize, sample_size: usize) -> Result<SchemaRef> {
    let sample = sample_records(path, dataset, buf_bytes, sample_size)?;
    if sample.is_empty() {
        bail!("No records found in {}", path.display());
    }
    let schema: Schema = infer_json_schema_from_iterator(sample.iter().map(Ok::<_, ArrowError>))
        .with_context(|| format!("infer schema for {}", path.display()))?;
    Ok(Arc::new(schema))
}

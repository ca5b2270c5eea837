//! Shard planning and the bounded-memory Parquet writer.
//!
//! Records are buffered up to `batch_size`, decoded into an Arrow `RecordBatch` against a
//! fixed schema and appended to the current shard. When the plan calls for several shards,
//! the writer rolls over to the next file once the current one holds `records_per_shard`
//! records. Shards are written into `<dir>/_staging/` and promoted to
//! `train-XXXXX-of-YYYYY.parquet` on `finish()`, so the final names always carry the
//! number of shards actually produced.

use crate::util::{promote_file, Retry};
use anyhow::{bail, Context, Result};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::json::reader::{Decoder, ReaderBuilder};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde_json::Value;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// How many shards a file is split into, and how many records go into each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardPlan {
    pub num_shards: usize,
    pub records_per_shard: u64,
}

impl ShardPlan {
    /// Size-based estimate: files eligible for sharding and larger than `target_bytes`
    /// get `file_size / target_bytes + 1` shards with an even share of the records
    /// (rounded up). Everything else is one shard.
    pub fn for_file(file_size: u64, record_count: u64, shard_large: bool, target_bytes: u64) -> Self {
        let target = target_bytes.max(1);
        if shard_large && file_size > target {
            let num_shards = (file_size / target + 1).max(1);
            Self {
                num_shards: num_shards as usize,
                records_per_shard: record_count / num_shards + 1,
            }
        } else {
            Self { num_shards: 1, records_per_shard: record_count }
        }
    }
}

pub fn shard_file_name(idx: usize, total: usize) -> String {
    format!("train-{idx:05}-of-{total:05}.parquet")
}

/// Row count from a Parquet footer (no data pages are read).
pub fn parquet_row_count(path: &Path) -> Result<u64> {
    let f = Retry::FILES.open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(f)
        .with_context(|| format!("read parquet footer {}", path.display()))?;
    Ok(reader.metadata().file_metadata().num_rows().max(0) as u64)
}

/// `*.parquet` files directly inside `dir`, sorted by name.
pub fn list_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|x| x == "parquet").unwrap_or(false))
        .collect();
    out.sort();
    Ok(out)
}

/// First place in `value` where an integer column would receive a fractional number.
/// The JSON decoder truncates such values silently, so they are caught before decoding.
fn fractional_in_integer(value: &Value, data_type: &DataType, path: &str) -> Option<String> {
    match (data_type, value) {
        (dt, Value::Number(n)) if dt.is_integer() => {
            let integral = n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false);
            (!integral).then(|| format!("field `{path}` expects an integer, got {n}"))
        }
        (DataType::Struct(fields), Value::Object(obj)) => fields.iter().find_map(|f| {
            obj.get(f.name())
                .and_then(|v| fractional_in_integer(v, f.data_type(), &format!("{path}.{}", f.name())))
        }),
        (DataType::List(item) | DataType::LargeList(item), Value::Array(items)) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| fractional_in_integer(v, item.data_type(), &format!("{path}[{i}]"))),
        _ => None,
    }
}

pub struct ShardWriter {
    dir: PathBuf,
    staging: PathBuf,
    schema: SchemaRef,
    plan: ShardPlan,
    batch_size: usize,
    decoder: Decoder,
    writer: Option<ArrowWriter<File>>,
    staged: Vec<PathBuf>,
    buffer: Vec<Value>,
    records_in_shard: u64,
    records_seen: u64,
}

impl ShardWriter {
    /// Create the writer and open the first shard.
    pub fn create(dir: &Path, schema: SchemaRef, plan: ShardPlan, batch_size: usize) -> Result<Self> {
        let batch_size = batch_size.max(1);
        let staging = dir.join("_staging");
        fs::create_dir_all(&staging).with_context(|| format!("create {}", staging.display()))?;

        let decoder = ReaderBuilder::new(schema.clone())
            .with_batch_size(batch_size)
            .build_decoder()?;

        let mut w = Self {
            dir: dir.to_path_buf(),
            staging,
            schema,
            plan,
            batch_size,
            decoder,
            writer: None,
            staged: Vec::with_capacity(plan.num_shards),
            buffer: Vec::with_capacity(batch_size.min(64 * 1024)),
            records_in_shard: 0,
            records_seen: 0,
        };
        w.open_next()?;
        Ok(w)
    }

    fn open_next(&mut self) -> Result<()> {
        let path = self.staging.join(format!("train-{:05}.parquet.inprogress", self.staged.len()));
        let file = Retry::FILES.create(&path)
            .with_context(|| format!("create {}", path.display()))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let writer = ArrowWriter::try_new(file, self.schema.clone(), Some(props))
            .with_context(|| format!("open parquet writer {}", path.display()))?;
        tracing::debug!("opened shard {}", path.display());
        self.writer = Some(writer);
        self.staged.push(path);
        self.records_in_shard = 0;
        Ok(())
    }

    fn flush_batch(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.decoder.serialize(&self.buffer)?;
        self.buffer.clear();
        if let Some(batch) = self.decoder.flush()? {
            if let Some(w) = self.writer.as_mut() {
                w.write(&batch)?;
            }
        }
        Ok(())
    }

    fn close_current(&mut self) -> Result<()> {
        self.flush_batch()?;
        if let Some(w) = self.writer.take() {
            w.close()?;
        }
        Ok(())
    }

    /// Buffer one record. A number that would be truncated by an integer column is an
    /// error naming the record (1-based) and the field.
    pub fn push(&mut self, record: Value) -> Result<()> {
        self.records_seen += 1;
        if let Value::Object(obj) = &record {
            for field in self.schema.fields() {
                let Some(v) = obj.get(field.name()) else { continue };
                if let Some(msg) = fractional_in_integer(v, field.data_type(), field.name()) {
                    bail!("record {}: {}", self.records_seen, msg);
                }
            }
        }
        self.buffer.push(record);
        self.records_in_shard += 1;

        if self.buffer.len() >= self.batch_size {
            self.flush_batch()?;
        }

        let is_last = self.staged.len() >= self.plan.num_shards;
        if self.plan.num_shards > 1 && self.records_in_shard >= self.plan.records_per_shard && !is_last {
            self.close_current()?;
            self.open_next()?;
        }
        Ok(())
    }

    /// Close the last shard, drop stale Parquet files from the target directory and
    /// promote the staged shards to their final names. Returns the final paths in order.
    pub fn finish(mut self) -> Result<Vec<PathBuf>> {
        self.close_current()?;

        for stale in list_parquet_files(&self.dir)? {
            Retry::FILES.remove(&stale)?;
        }

        let total = self.staged.len();
        let mut finals = Vec::with_capacity(total);
        for (idx, tmp) in self.staged.iter().enumerate() {
            let dest = self.dir.join(shard_file_name(idx, total));
            promote_file(tmp, &dest)?;
            finals.push(dest);
        }
        let _ = fs::remove_dir(&self.staging);
        Ok(finals)
    }
}

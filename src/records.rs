//! Record-level readers for the matching-pipeline outputs: JSONL files (one object per
//! line) and single JSON array files, exposed as one streaming iterator.

use crate::datasets::DatasetFile;
use crate::util::Retry;
use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Minimal NDJSON reader with buffering and line-terminator trimming.
pub struct NdjsonReader {
    rdr: BufReader<File>,
}

impl NdjsonReader {
    pub fn open(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = Retry::FILES.open(path)?;
        Ok(Self { rdr: BufReader::with_capacity(buf_bytes.max(8 * 1024), f) })
    }

    /// Read the next line into `buf`. Returns the number of bytes read (0 on EOF).
    /// Strips trailing `\r?\n`.
    pub fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        buf.clear();
        let n = self.rdr.read_line(buf)?;
        if n == 0 { return Ok(0); }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') { buf.pop(); }
        }
        Ok(n)
    }
}

/// Stream a JSONL file line by line and call `on_line` for every non-blank line.
/// Returns the number of non-blank lines seen.
pub fn for_each_line(
    path: &Path,
    buf_bytes: usize,
    mut on_line: impl FnMut(&str) -> Result<()>,
) -> Result<u64> {
    let mut rdr = NdjsonReader::open(path, buf_bytes)
        .with_context(|| format!("open {}", path.display()))?;
    let mut buf = String::with_capacity(8 * 1024);
    let mut lines = 0u64;
    loop {
        let n = rdr
            .read_line(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 { break; }
        if buf.trim().is_empty() { continue; }
        lines += 1;
        on_line(&buf)?;
    }
    Ok(lines)
}

/// JSON type name used in record-shape errors.
pub fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

enum Source {
    Lines { rdr: NdjsonReader, buf: String, line_num: u64 },
    Array { items: std::vec::IntoIter<Value>, idx: usize, wrap_strings: bool },
}

/// Streaming iterator over the records (JSON objects) of one dataset file.
///
/// - JSONL: blank lines are skipped; a line that is not an object is an error
///   `"<path>:<line>: Expected object, got <type>"`.
/// - JSON array: the file is parsed whole. Objects pass through; with
///   `is_string_array`, strings become `{"affiliation": item}`; anything else is an
///   error `"<path>[<idx>]: Expected object, got <type>"`.
pub struct RecordStream {
    path: PathBuf,
    source: Source,
    done: bool,
}

impl RecordStream {
    pub fn open(path: &Path, dataset: &DatasetFile, buf_bytes: usize) -> Result<Self> {
        let source = if dataset.is_json_array {
            let items = read_json_array(path, buf_bytes)?;
            Source::Array { items: items.into_iter(), idx: 0, wrap_strings: dataset.is_string_array }
        } else {
            let rdr = NdjsonReader::open(path, buf_bytes)
                .with_context(|| format!("open {}", path.display()))?;
            Source::Lines { rdr, buf: String::with_capacity(8 * 1024), line_num: 0 }
        };
        Ok(Self { path: path.to_path_buf(), source, done: false })
    }

    fn next_record(&mut self) -> Result<Option<Value>> {
        match &mut self.source {
            Source::Lines { rdr, buf, line_num } => loop {
                let n = rdr
                    .read_line(buf)
                    .with_context(|| format!("read {}", self.path.display()))?;
                if n == 0 { return Ok(None); }
                *line_num += 1;
                if buf.trim().is_empty() { continue; }
                let v: Value = serde_json::from_str(buf)
                    .with_context(|| format!("{}:{}: invalid JSON", self.path.display(), line_num))?;
                if !v.is_object() {
                    bail!("{}:{}: Expected object, got {}", self.path.display(), line_num, json_type_name(&v));
                }
                return Ok(Some(v));
            },
            Source::Array { items, idx, wrap_strings } => {
                let Some(item) = items.next() else { return Ok(None) };
                let at = *idx;
                *idx += 1;
                match item {
                    Value::Object(_) => Ok(Some(item)),
                    Value::String(s) if *wrap_strings => {
                        let mut obj = Map::with_capacity(1);
                        obj.insert("affiliation".to_string(), Value::String(s));
                        Ok(Some(Value::Object(obj)))
                    }
                    other => Err(anyhow!(
                        "{}[{}]: Expected object, got {}",
                        self.path.display(),
                        at,
                        json_type_name(&other)
                    )),
                }
            }
        }
    }
}

impl Iterator for RecordStream {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done { return None; }
        match self.next_record() {
            Ok(Some(v)) => Some(Ok(v)),
            Ok(None) => { self.done = true; None }
            Err(e) => { self.done = true; Some(Err(e)) }
        }
    }
}

fn read_json_array(path: &Path, buf_bytes: usize) -> Result<Vec<Value>> {
    let f = Retry::FILES.open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = BufReader::with_capacity(buf_bytes.max(8 * 1024), f);
    let v: Value = serde_json::from_reader(rdr)
        .with_context(|| format!("parse JSON array {}", path.display()))?;
    match v {
        Value::Array(items) => Ok(items),
        other => bail!("{}: Expected array, got {}", path.display(), json_type_name(&other)),
    }
}

/// Visit every record of a dataset file in order.
pub fn for_each_record(
    path: &Path,
    dataset: &DatasetFile,
    buf_bytes: usize,
    mut on_record: impl FnMut(Value) -> Result<()>,
) -> Result<u64> {
    let mut n = 0u64;
    for rec in RecordStream::open(path, dataset, buf_bytes)? {
        on_record(rec?)?;
        n += 1;
    }
    Ok(n)
}

/// Record count of a dataset file: non-blank lines for JSONL, array length for JSON arrays.
pub fn count_records(path: &Path, dataset: &DatasetFile, buf_bytes: usize) -> Result<u64> {
    if dataset.is_json_array {
        Ok(read_json_array(path, buf_bytes)?.len() as u64)
    } else {
        for_each_line(path, buf_bytes, |_| Ok(()))
    }
}

/// The first `n` records of a dataset file.
pub fn sample_records(path: &Path, dataset: &DatasetFile, buf_bytes: usize, n: usize) -> Result<Vec<Value>> {
    RecordStream::open(path, dataset, buf_bytes)?.take(n).collect()
}

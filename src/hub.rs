//! Hugging Face Hub HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required).
//! Covers the dataset publish flow: create repo → pre-upload probe → (LFS batch → PUT →
//! verify) → commit.

use crate::humanize::format_size;
use crate::progress::{byte_progress, file_progress};
use crate::shard::list_parquet_files;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

const SAMPLE_BYTES: usize = 512;
const LFS_CONTENT_TYPE: &str = "application/vnd.git-lfs+json";

/// Error type for hub operations.
#[derive(Debug)]
pub enum HubError {
    /// Repo id is not of the form `owner/name`
    InvalidRepoId(String),
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
    /// File I/O error
    Io(String),
    /// The LFS server rejected an object
    Lfs(String),
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubError::InvalidRepoId(id) => write!(f, "Invalid repo id '{}' (expected owner/name)", id),
            HubError::Network(msg) => write!(f, "Network error: {}", msg),
            HubError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            HubError::Parse(msg) => write!(f, "Parse error: {}", msg),
            HubError::Io(msg) => write!(f, "I/O error: {}", msg),
            HubError::Lfs(msg) => write!(f, "LFS error: {}", msg),
        }
    }
}

impl std::error::Error for HubError {}

impl From<io::Error> for HubError {
    fn from(e: io::Error) -> Self {
        HubError::Io(e.to_string())
    }
}

/// How the Hub wants a file stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    Regular,
    Lfs,
    /// Matched by the repo's ignore rules; nothing to upload.
    Ignored,
}

#[derive(Debug, Deserialize)]
struct PreuploadResponse {
    files: Vec<PreuploadFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreuploadFile {
    path: String,
    upload_mode: String,
    #[serde(default)]
    should_ignore: bool,
}

#[derive(Debug, Deserialize)]
struct LfsBatchResponse {
    objects: Vec<LfsObject>,
}

#[derive(Debug, Deserialize)]
struct LfsObject {
    oid: String,
    #[serde(default)]
    actions: Option<LfsActions>,
    #[serde(default)]
    error: Option<LfsObjectError>,
}

#[derive(Debug, Deserialize)]
struct LfsActions {
    upload: Option<LfsAction>,
    verify: Option<LfsAction>,
}

#[derive(Debug, Deserialize)]
struct LfsAction {
    href: String,
    #[serde(default)]
    header: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct LfsObjectError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// One operation of a commit.
#[derive(Debug, Clone)]
pub enum CommitOp {
    /// Small file committed inline.
    Inline { path_in_repo: String, content: Vec<u8> },
    /// File already stored on the LFS backend, referenced by its SHA-256.
    Lfs { path_in_repo: String, oid: String, size: u64 },
}

impl CommitOp {
    fn to_ndjson(&self) -> Value {
        match self {
            CommitOp::Inline { path_in_repo, content } => json!({
                "key": "file",
                "value": { "content": BASE64.encode(content), "path": path_in_repo, "encoding": "base64" },
            }),
            CommitOp::Lfs { path_in_repo, oid, size } => json!({
                "key": "lfsFile",
                "value": { "path": path_in_repo, "algo": "sha256", "oid": oid, "size": size },
            }),
        }
    }
}

/// `owner/name` check for dataset repo ids.
pub fn validate_repo_id(repo_id: &str) -> Result<(), HubError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*/[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap());
    if re.is_match(repo_id) && !repo_id.contains("..") {
        Ok(())
    } else {
        Err(HubError::InvalidRepoId(repo_id.to_string()))
    }
}

/// Public URL of a dataset repository.
pub fn dataset_url(repo_id: &str) -> String {
    format!("https://huggingface.co/datasets/{}", repo_id)
}

/// SHA-256 of a file, lowercase hex (the LFS object id).
pub fn sha256_file(path: &Path) -> Result<String, HubError> {
    let mut f = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 { break; }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn read_sample(path: &Path) -> Result<Vec<u8>, HubError> {
    let mut f = File::open(path)?;
    let mut sample = Vec::with_capacity(SAMPLE_BYTES);
    f.by_ref().take(SAMPLE_BYTES as u64).read_to_end(&mut sample)?;
    Ok(sample)
}

/// Hub API client (blocking).
#[derive(Clone)]
pub struct HubClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    token: String,
    progress: bool,
}

impl HubClient {
    pub fn new(endpoint: &str, token: &str) -> Result<Self, HubError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("matchpub/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| HubError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
            progress: false,
        })
    }

    /// Show a byte progress bar while LFS objects are sent.
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Create a dataset repository. An existing repository (HTTP 409) is not an error.
    pub fn create_repo(&self, repo_id: &str, private: bool) -> Result<(), HubError> {
        validate_repo_id(repo_id)?;
        let (organization, name) = repo_id.split_once('/').unwrap_or(("", repo_id));
        let url = format!("{}/api/repos/create", self.endpoint);
        let body = json!({
            "name": name,
            "organization": organization,
            "type": "dataset",
            "private": private,
        });
        match self.post_json(&url, &body) {
            Ok(_) => Ok(()),
            Err(HubError::Http(409, _)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Ask the Hub whether `path_in_repo` should go through LFS.
    pub fn preupload(&self, repo_id: &str, path_in_repo: &str, size: u64, sample: &[u8]) -> Result<UploadMode, HubError> {
        let url = format!("{}/api/datasets/{}/preupload/main", self.endpoint, repo_id);
        let body = json!({
            "files": [{ "path": path_in_repo, "sample": BASE64.encode(sample), "size": size }],
        });
        let resp: PreuploadResponse = self
            .post_json(&url, &body)?
            .json()
            .map_err(|e| HubError::Parse(e.to_string()))?;
        let file = resp
            .files
            .into_iter()
            .find(|f| f.path == path_in_repo)
            .ok_or_else(|| HubError::Parse(format!("Missing {} in preupload response", path_in_repo)))?;
        Ok(match (file.should_ignore, file.upload_mode.as_str()) {
            (true, _) => UploadMode::Ignored,
            (false, "lfs") => UploadMode::Lfs,
            _ => UploadMode::Regular,
        })
    }

    /// Push one file to the LFS backend: batch negotiation, PUT, then verify.
    /// Objects the server already has are skipped.
    pub fn lfs_upload(&self, repo_id: &str, local: &Path, oid: &str, size: u64) -> Result<(), HubError> {
        let url = format!("{}/datasets/{}.git/info/lfs/objects/batch", self.endpoint, repo_id);
        let body = json!({
            "operation": "upload",
            "transfers": ["basic"],
            "objects": [{ "oid": oid, "size": size }],
            "hash_algo": "sha256",
            "ref": { "name": "refs/heads/main" },
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, LFS_CONTENT_TYPE)
            .header(reqwest::header::CONTENT_TYPE, LFS_CONTENT_TYPE)
            .json(&body)
            .send()
            .map_err(|e| HubError::Network(e.to_string()))?;
        let batch: LfsBatchResponse = check_status(response)?
            .json()
            .map_err(|e| HubError::Parse(e.to_string()))?;

        let object = batch
            .objects
            .into_iter()
            .find(|o| o.oid == oid)
            .ok_or_else(|| HubError::Lfs(format!("object {} missing from batch response", oid)))?;
        if let Some(err) = object.error {
            return Err(HubError::Lfs(format!("{} ({})", err.message, err.code)));
        }
        let Some(actions) = object.actions else {
            tracing::debug!("LFS object {} already present", oid);
            return Ok(());
        };

        if let Some(upload) = actions.upload {
            let file = File::open(local)?;
            let label = local.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let pb = byte_progress(self.progress, size, &label);
            let body = match &pb {
                Some(pb) => reqwest::blocking::Body::sized(pb.wrap_read(file), size),
                None => reqwest::blocking::Body::sized(file, size),
            };
            let mut req = self
                .http
                .put(&upload.href)
                .timeout(Duration::from_secs(60 * 60))
                .body(body);
            for (k, v) in &upload.header {
                req = req.header(k.as_str(), v.as_str());
            }
            let sent = req.send().map_err(|e| HubError::Network(e.to_string()));
            if let Some(pb) = pb { pb.finish_and_clear(); }
            check_status(sent?)?;
        }

        if let Some(verify) = actions.verify {
            let mut req = self.http.post(&verify.href).bearer_auth(&self.token);
            for (k, v) in &verify.header {
                req = req.header(k.as_str(), v.as_str());
            }
            let response = req
                .json(&json!({ "oid": oid, "size": size }))
                .send()
                .map_err(|e| HubError::Network(e.to_string()))?;
            check_status(response)?;
        }
        Ok(())
    }

    /// Create a commit on `main` with the given operations.
    pub fn commit(&self, repo_id: &str, summary: &str, ops: &[CommitOp]) -> Result<(), HubError> {
        let url = format!("{}/api/datasets/{}/commit/main", self.endpoint, repo_id);
        let mut body = String::new();
        let header = json!({ "key": "header", "value": { "summary": summary, "description": "" } });
        body.push_str(&header.to_string());
        body.push('\n');
        for op in ops {
            body.push_str(&op.to_ndjson().to_string());
            body.push('\n');
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .map_err(|e| HubError::Network(e.to_string()))?;
        check_status(response)?;
        Ok(())
    }

    /// Upload a single file as its own commit, through LFS when the Hub asks for it.
    pub fn upload_file(&self, local: &Path, path_in_repo: &str, repo_id: &str) -> Result<(), HubError> {
        validate_repo_id(repo_id)?;
        let size = fs::metadata(local)?.len();
        let sample = read_sample(local)?;
        let summary = format!("Upload {}", path_in_repo);

        match self.preupload(repo_id, path_in_repo, size, &sample)? {
            UploadMode::Ignored => {
                tracing::warn!("{} is ignored by the repository, skipping", path_in_repo);
                Ok(())
            }
            UploadMode::Regular => {
                let content = fs::read(local)?;
                let op = CommitOp::Inline { path_in_repo: path_in_repo.to_string(), content };
                self.commit(repo_id, &summary, &[op])
            }
            UploadMode::Lfs => {
                let oid = sha256_file(local)?;
                tracing::debug!("LFS upload {} ({}, sha256 {})", path_in_repo, format_size(size), oid);
                self.lfs_upload(repo_id, local, &oid, size)?;
                let op = CommitOp::Lfs { path_in_repo: path_in_repo.to_string(), oid, size };
                self.commit(repo_id, &summary, &[op])
            }
        }
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn post_json(&self, url: &str, body: &Value) -> Result<reqwest::blocking::Response, HubError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .map_err(|e| HubError::Network(e.to_string()))?;
        check_status(response)
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, HubError> {
    let status = response.status().as_u16();
    if !response.status().is_success() {
        let body = response.text().unwrap_or_default();
        return Err(HubError::Http(status, body));
    }
    Ok(response)
}

/// Upload a converted output directory: `README.md` first, then every
/// `data/<config>/*.parquet` in sorted order. Returns the dataset URL.
///
/// Repository creation failures are logged and the upload proceeds, so an existing
/// repository the token cannot create still receives files.
pub fn upload_dataset(
    client: &HubClient,
    output_dir: &Path,
    repo_id: &str,
    private: bool,
    progress: bool,
) -> Result<String, HubError> {
    validate_repo_id(repo_id)?;
    match client.create_repo(repo_id, private) {
        Ok(()) => tracing::info!("Repository {} ready", repo_id),
        Err(e) => tracing::warn!("Note: {}", e),
    }

    tracing::info!("Uploading files to {}...", repo_id);

    let readme = output_dir.join("README.md");
    if readme.exists() {
        client.upload_file(&readme, "README.md", repo_id)?;
        tracing::info!("  Uploaded README.md");
    }

    let data_dir = output_dir.join("data");
    if data_dir.is_dir() {
        let mut config_dirs: Vec<_> = fs::read_dir(&data_dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        config_dirs.sort();

        for config_dir in config_dirs {
            let config_name = config_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let files = list_parquet_files(&config_dir).map_err(|e| HubError::Io(e.to_string()))?;
            let pb = file_progress(progress, files.len() as u64, &format!("Uploading {}", config_name));
            for pf in &files {
                let file_name = pf.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                let path_in_repo = format!("data/{}/{}", config_name, file_name);
                client.upload_file(pf, &path_in_repo, repo_id)?;
                tracing::debug!("  Uploaded {}", path_in_repo);
                if let Some(pb) = &pb { pb.inc(1); }
            }
            if let Some(pb) = pb { pb.finish_and_clear(); }
            tracing::info!("  Uploaded {} file(s) for {}", files.len(), config_name);
        }
    }

    let url = dataset_url(repo_id);
    tracing::info!("Upload complete: {}", url);
    Ok(url)
}

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Once;
use std::thread::sleep;
use std::time::Duration;

static TRACING: Once = Once::new();

/// Install the global `tracing` subscriber at `info` (first call wins).
pub fn init_tracing_once() {
    init_tracing_with_default("info");
}

/// Install the global subscriber writing to stderr. `RUST_LOG` takes precedence over
/// `default_level`.
pub fn init_tracing_with_default(default_level: &str) {
    TRACING.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    });
}

// Output directories often live on network mounts or external drives where opens and
// renames fail transiently; these helpers retry with a linear backoff.

fn is_transient(e: &io::Error) -> bool {
    if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) {
        return true;
    }
    // Windows sharing/lock violations, device not ready, AV-held handles.
    matches!(e.raw_os_error(), Some(5 | 21 | 32 | 33 | 1006 | 1117 | 1224))
}

/// Retry policy for file operations.
#[derive(Clone, Copy, Debug)]
pub struct Retry {
    pub attempts: usize,
    pub base_delay: Duration,
}

impl Retry {
    pub const FILES: Retry = Retry { attempts: 16, base_delay: Duration::from_millis(50) };
    pub const PROMOTE: Retry = Retry { attempts: 20, base_delay: Duration::from_millis(50) };

    /// Run `op` until it succeeds, fails with a non-transient error, or attempts run out.
    /// Attempt `i` waits `i * base_delay` after failing.
    pub fn run<T>(self, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
        let mut last = None;
        for attempt in 1..=self.attempts.max(1) {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if is_transient(&e) => {
                    tracing::debug!("transient I/O error (attempt {}): {}", attempt, e);
                    last = Some(e);
                    sleep(self.base_delay.saturating_mul(attempt as u32));
                }
                Err(e) => return Err(e),
            }
        }
        Err(last.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "retries exhausted")))
    }

    pub fn open(self, path: &Path) -> io::Result<File> {
        self.run(|| File::open(path))
    }

    pub fn create(self, path: &Path) -> io::Result<File> {
        self.run(|| File::create(path))
    }

    /// Remove `path`; a file that is already gone counts as removed.
    pub fn remove(self, path: &Path) -> Result<()> {
        match self.run(|| fs::remove_file(path)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("remove {}", path.display()))
            }
            _ => Ok(()),
        }
    }
}

/// Move a finished temp file over `dest`. Falls back to copy + remove when the rename
/// fails, e.g. across devices.
pub fn promote_file(tmp: &Path, dest: &Path) -> Result<()> {
    let retry = Retry::PROMOTE;
    if dest.exists() {
        retry.remove(dest)?;
    }
    if retry.run(|| fs::rename(tmp, dest)).is_err() {
        retry
            .run(|| fs::copy(tmp, dest))
            .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
        retry.remove(tmp)?;
    }
    Ok(())
}

/// Write `contents` to `.<name>.inprogress` next to `dest`, then promote it.
pub fn write_file_atomic(dest: &Path, contents: &[u8]) -> Result<()> {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let tmp = dest.with_file_name(format!(".{name}.inprogress"));
    {
        let mut f = Retry::FILES.create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        f.write_all(contents).with_context(|| format!("write {}", tmp.display()))?;
        f.flush()?;
    }
    promote_file(&tmp, dest)
}

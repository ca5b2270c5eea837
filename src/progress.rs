//! Progress bars for record passes and uploads.
//!
//! Every bar is attached to one shared `MultiProgress`, so the byte bar of an LFS
//! upload renders below the per-configuration file bar instead of fighting it.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::OnceLock;
use std::time::Duration;

static BARS: OnceLock<MultiProgress> = OnceLock::new();

const BAR_CHARS: &str = "█▉▊▋▌▍▎▏  ";

const RECORDS_TEMPLATE: &str = "{spinner:.green} {msg} {human_pos}/{human_len} [{bar:.cyan/blue}] {percent:>3}%  \
     rec/s: {per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}";

const FILES_TEMPLATE: &str = "{spinner:.green} {msg} {pos}/{len} files [{bar:.cyan/blue}]  elapsed: {elapsed_precise}";

const BYTES_TEMPLATE: &str = "{spinner:.green} {msg} {bytes:>10}/{total_bytes:<10} [{bar:.cyan/blue}] {percent:>3}%  \
     {bytes_per_sec}  eta: {eta_precise}";

fn styled(total: u64, template: &str, label: &str) -> ProgressBar {
    let pb = BARS.get_or_init(MultiProgress::new).add(ProgressBar::new(total));
    if let Ok(style) = ProgressStyle::with_template(template) {
        pb.set_style(style.progress_chars(BAR_CHARS));
    }
    pb.set_message(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Records of one dataset file. `None` when progress is disabled.
pub fn record_progress(enabled: bool, total: u64, label: &str) -> Option<ProgressBar> {
    enabled.then(|| styled(total, RECORDS_TEMPLATE, label))
}

/// Files uploaded for one configuration.
pub fn file_progress(enabled: bool, total: u64, label: &str) -> Option<ProgressBar> {
    enabled.then(|| styled(total, FILES_TEMPLATE, label))
}

/// Bytes sent for one large file.
pub fn byte_progress(enabled: bool, total_bytes: u64, label: &str) -> Option<ProgressBar> {
    enabled.then(|| styled(total_bytes, BYTES_TEMPLATE, label))
}

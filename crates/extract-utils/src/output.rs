//! Fresh, uniquely named output files in the system temp directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use extract_core::error::Result;

/// Write `bytes` to a new temporary file named `<prefix><random>.<extension>`
/// and keep it on disk. The caller owns the returned path.
pub fn write_temp_output(bytes: &[u8], prefix: &str, extension: &str) -> Result<PathBuf> {
    let suffix = format!(".{}", extension.trim_start_matches('.'));
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(&suffix)
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;

    let (_, path) = file.keep().map_err(|e| e.error)?;
    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

/// Extension of `path`, or `default` when it has none.
pub fn extension_or<'a>(path: &'a Path, default: &'a str) -> &'a str {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or(default)
}

//! External PDF tools: MuPDF's `mutool` for text and poppler's `pdfimages`
//! for embedded images.
//!
//! Content extraction talks to these through [`PdfToolkit`] so it can be
//! driven by a fake in tests.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use extract_core::error::{ExtractError, Result};
use extract_core::options::ExtractOptions;

/// Text and image dumping for a PDF, one file per page or image.
pub trait PdfToolkit: Send + Sync {
    /// Write the text of page N to `<dir>/page-N.txt`, N counting from 1.
    fn page_text(&self, pdf_path: &Path, dir: &Path) -> Result<()>;

    /// Write every embedded image to `<dir>/img-<page>-<index>.<ext>`.
    fn page_images(&self, pdf_path: &Path, dir: &Path) -> Result<()>;
}

/// [`PdfToolkit`] backed by the `mutool` and `pdfimages` executables.
#[derive(Debug, Clone)]
pub struct CommandToolkit {
    pub mutool: PathBuf,
    pub pdfimages: PathBuf,
}

impl Default for CommandToolkit {
    fn default() -> Self {
        Self {
            mutool: PathBuf::from("mutool"),
            pdfimages: PathBuf::from("pdfimages"),
        }
    }
}

impl CommandToolkit {
    pub fn from_options(options: &ExtractOptions) -> Self {
        Self {
            mutool: PathBuf::from(&options.mutool_path),
            pdfimages: PathBuf::from(&options.pdfimages_path),
        }
    }
}

impl PdfToolkit for CommandToolkit {
    fn page_text(&self, pdf_path: &Path, dir: &Path) -> Result<()> {
        let pattern = dir.join("page-%d.txt");
        run_tool(
            &self.mutool,
            &[
                OsStr::new("draw"),
                OsStr::new("-F"),
                OsStr::new("txt"),
                OsStr::new("-o"),
                pattern.as_os_str(),
                pdf_path.as_os_str(),
            ],
            "mutool (MuPDF) is required for PDF text extraction. \
             Install with: brew install mupdf-tools (macOS) or apt install mupdf-tools (Linux)",
        )
    }

    fn page_images(&self, pdf_path: &Path, dir: &Path) -> Result<()> {
        let root = dir.join("img");
        run_tool(
            &self.pdfimages,
            &[
                OsStr::new("-p"),
                OsStr::new("-all"),
                pdf_path.as_os_str(),
                root.as_os_str(),
            ],
            "pdfimages (poppler-utils) is required for PDF image extraction. \
             Install with: brew install poppler (macOS) or apt install poppler-utils (Linux)",
        )
    }
}

/// Run `program args`, failing on a missing binary or a non-zero exit.
fn run_tool(program: &Path, args: &[&OsStr], install_hint: &str) -> Result<()> {
    let name = program.display();
    log::debug!("Running {} {:?}", name, args);

    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            ExtractError::Tool(install_hint.to_string())
        } else {
            ExtractError::Tool(format!("Failed to run {}: {}", name, e))
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractError::Tool(format!(
            "{} failed ({}): {}",
            name,
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

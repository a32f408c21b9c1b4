//! Page extraction by way of PDF: convert the DOCX with an external
//! converter (LibreOffice by default), then select pages from the rendered
//! PDF. Unlike markup splitting, pages here are real rendered pages.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use extract_core::error::{ExtractError, Result};
use extract_core::options::ExtractOptions;

/// A PDF produced by a [`PdfConverter`].
///
/// When it lives in a scratch directory owned by the converter, the
/// directory is removed on drop. Removal errors are ignored.
#[derive(Debug)]
pub struct ConvertedPdf {
    path: PathBuf,
    scratch: Option<TempDir>,
}

impl ConvertedPdf {
    /// A PDF the caller keeps; nothing is removed on drop.
    pub fn caller_owned(path: PathBuf) -> Self {
        Self {
            path,
            scratch: None,
        }
    }

    /// A PDF inside `scratch`, which is deleted with it.
    pub fn scoped(path: PathBuf, scratch: TempDir) -> Self {
        Self {
            path,
            scratch: Some(scratch),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ConvertedPdf {
    fn drop(&mut self) {
        if let Some(dir) = self.scratch.take() {
            let location = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                log::debug!("Ignoring cleanup failure for {}: {}", location.display(), e);
            }
        }
    }
}

/// Converts a DOCX file to PDF.
///
/// Any `Fn(&Path) -> Result<PathBuf>` is a converter whose output belongs
/// to the caller.
pub trait PdfConverter {
    fn convert(&self, docx_path: &Path) -> Result<ConvertedPdf>;
}

impl<F> PdfConverter for F
where
    F: Fn(&Path) -> Result<PathBuf>,
{
    fn convert(&self, docx_path: &Path) -> Result<ConvertedPdf> {
        self(docx_path).map(ConvertedPdf::caller_owned)
    }
}

/// Headless LibreOffice conversion into a scratch directory.
///
/// Runs `<program> <args...> --outdir <scratch> <docx>` and expects
/// `<scratch>/<stem>.pdf`.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new("soffice", ["--headless", "--convert-to", "pdf"])
    }
}

impl SofficeConverter {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_options(options: &ExtractOptions) -> Self {
        Self {
            program: PathBuf::from(&options.soffice_path),
            ..Default::default()
        }
    }
}

impl PdfConverter for SofficeConverter {
    fn convert(&self, docx_path: &Path) -> Result<ConvertedPdf> {
        let scratch = tempfile::Builder::new().prefix("docx-pdf-").tempdir()?;
        log::info!(
            "Converting {} to PDF with {}",
            docx_path.display(),
            self.program.display()
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--outdir")
            .arg(scratch.path())
            .arg(docx_path)
            .output()
            .map_err(|e| {
                ExtractError::ConversionFailed(format!(
                    "Failed to run {}: {}. LibreOffice is required for DOCX to PDF conversion",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::ConversionFailed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        let stem = docx_path.file_stem().ok_or_else(|| {
            ExtractError::ConversionFailed(format!("No file name in {}", docx_path.display()))
        })?;
        let mut name = stem.to_os_string();
        name.push(".pdf");
        let pdf = scratch.path().join(name);

        if !pdf.is_file() {
            return Err(ExtractError::ConversionFailed(format!(
                "{} produced no PDF at {}",
                self.program.display(),
                pdf.display()
            )));
        }

        log::debug!("Converted PDF at {}", pdf.display());
        Ok(ConvertedPdf::scoped(pdf, scratch))
    }
}

/// Convert `docx_path` with the default LibreOffice converter and extract
/// `pages` from the result into a new temporary PDF.
pub fn extract_pages_via_pdf(docx_path: &Path, pages: &[u32]) -> Result<PathBuf> {
    extract_pages_via_pdf_with(docx_path, pages, &SofficeConverter::default())
}

/// Like [`extract_pages_via_pdf`] with a caller-chosen converter.
pub fn extract_pages_via_pdf_with<C>(docx_path: &Path, pages: &[u32], converter: &C) -> Result<PathBuf>
where
    C: PdfConverter + ?Sized,
{
    let converted = converter.convert(docx_path)?;
    extract_input_pdf::extract_pages_from_pdf(converted.path(), pages)
}

//! PDF input: page selection and content extraction.

pub mod content;
pub mod pages;
pub mod tools;

use std::path::{Path, PathBuf};

use extract_core::error::Result;
use extract_core::model::{DocumentFormat, ExtractionResult};
use extract_core::options::ExtractOptions;
use extract_core::plugin::{ContentExtractor, PageExtractor};

pub use content::extract_pdf_content;
pub use pages::{extract_pages_from_pdf, select_pages};
pub use tools::{CommandToolkit, PdfToolkit};

/// Paragraphs and images per page, using `mutool` and `pdfimages`.
pub struct PdfContentExtractor;

impl ContentExtractor for PdfContentExtractor {
    fn name(&self) -> &str {
        "PDF Content"
    }

    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Pdf]
    }

    fn extract(
        &self,
        input_path: &Path,
        output_dir: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractionResult> {
        log::info!("Reading PDF: {}", input_path.display());
        let toolkit = CommandToolkit::from_options(options);
        content::extract_pdf_content(input_path, output_dir, &toolkit)
    }
}

/// Copies selected pages into a new PDF.
pub struct PdfPageExtractor;

impl PageExtractor for PdfPageExtractor {
    fn name(&self) -> &str {
        "PDF Pages"
    }

    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Pdf]
    }

    fn extract_pages(
        &self,
        input_path: &Path,
        pages: &[u32],
        _options: &ExtractOptions,
    ) -> Result<PathBuf> {
        pages::extract_pages_from_pdf(input_path, pages)
    }
}

//! DOCX input: page extraction and content extraction.
//!
//! DOCX is a ZIP archive containing Office Open XML. This crate:
//! - Cuts pages out of `word/document.xml` at explicit page breaks
//! - Alternatively renders to PDF with LibreOffice and selects real pages
//! - Extracts paragraph text and embedded images from `word/media/`

pub mod content;
pub mod pages;
pub mod via_pdf;

use std::path::{Path, PathBuf};

use extract_core::error::Result;
use extract_core::model::{DocumentFormat, ExtractionResult};
use extract_core::options::{DocxPageMode, ExtractOptions};
use extract_core::plugin::{ContentExtractor, PageExtractor};

pub use content::extract_docx_content;
pub use pages::{extract_pages_from_docx, select_docx_pages};
pub use via_pdf::{extract_pages_via_pdf, extract_pages_via_pdf_with, PdfConverter, SofficeConverter};

pub struct DocxContentExtractor;

impl ContentExtractor for DocxContentExtractor {
    fn name(&self) -> &str {
        "DOCX Content"
    }

    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Docx]
    }

    fn extract(
        &self,
        input_path: &Path,
        output_dir: &Path,
        _options: &ExtractOptions,
    ) -> Result<ExtractionResult> {
        log::info!("Reading DOCX: {}", input_path.display());
        content::extract_docx_content(input_path, output_dir)
    }
}

/// Page extraction in the mode chosen by [`ExtractOptions::docx_pages`].
pub struct DocxPageExtractor;

impl PageExtractor for DocxPageExtractor {
    fn name(&self) -> &str {
        "DOCX Pages"
    }

    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Docx]
    }

    fn extract_pages(
        &self,
        input_path: &Path,
        pages: &[u32],
        options: &ExtractOptions,
    ) -> Result<PathBuf> {
        match options.docx_pages {
            DocxPageMode::Markup => pages::extract_pages_from_docx(input_path, pages),
            DocxPageMode::ViaPdf => {
                let converter = SofficeConverter::from_options(options);
                via_pdf::extract_pages_via_pdf_with(input_path, pages, &converter)
            }
        }
    }
}

//! EPUB input: paragraphs and images per spine chapter.

mod parser;

use std::path::Path;

use extract_core::error::Result;
use extract_core::model::{DocumentFormat, ExtractionResult};
use extract_core::options::ExtractOptions;
use extract_core::plugin::ContentExtractor;

pub use parser::extract_epub_content;

pub struct EpubContentExtractor;

impl ContentExtractor for EpubContentExtractor {
    fn name(&self) -> &str {
        "EPUB Content"
    }

    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Epub]
    }

    fn extract(
        &self,
        input_path: &Path,
        output_dir: &Path,
        _options: &ExtractOptions,
    ) -> Result<ExtractionResult> {
        log::info!("Reading EPUB: {}", input_path.display());
        parser::extract_epub_content(input_path, output_dir)
    }
}

//! Extractor traits implemented by the per-format input crates.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::{DocumentFormat, ExtractionResult};
use crate::options::ExtractOptions;

/// Pulls paragraphs and images out of a document.
pub trait ContentExtractor: Send + Sync {
    /// Human-readable name of this extractor.
    fn name(&self) -> &str;

    /// File formats this extractor handles.
    fn supported_formats(&self) -> &[DocumentFormat];

    /// Extract content, writing image files into `output_dir`.
    fn extract(
        &self,
        input_path: &Path,
        output_dir: &Path,
        options: &ExtractOptions,
    ) -> Result<ExtractionResult>;
}

/// Cuts a subset of pages out of a document into a new standalone file.
pub trait PageExtractor: Send + Sync {
    /// Human-readable name of this extractor.
    fn name(&self) -> &str;

    /// File formats this extractor handles.
    fn supported_formats(&self) -> &[DocumentFormat];

    /// Write the requested 1-based pages, in request order, to a fresh
    /// temporary file and return its path.
    fn extract_pages(
        &self,
        input_path: &Path,
        pages: &[u32],
        options: &ExtractOptions,
    ) -> Result<PathBuf>;
}

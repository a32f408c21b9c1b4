//! Page-oriented content model shared by every extractor.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Content found on a single page (or chapter, for reflowable formats).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// Paths of image files written for this page, in document order.
    pub images: Vec<PathBuf>,
    /// Trimmed, non-empty text paragraphs, in document order.
    pub paragraphs: Vec<String>,
}

impl PageContent {
    pub fn new(images: Vec<PathBuf>, paragraphs: Vec<String>) -> Self {
        Self { images, paragraphs }
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.paragraphs.is_empty()
    }
}

/// Ordered list of page contents produced by a content extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub pages: Vec<PageContent>,
}

impl ExtractionResult {
    pub fn new(pages: Vec<PageContent>) -> Self {
        Self { pages }
    }

    /// Total number of images across all pages.
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }

    /// Total number of paragraphs across all pages.
    pub fn paragraph_count(&self) -> usize {
        self.pages.iter().map(|p| p.paragraphs.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Format enumeration
// ---------------------------------------------------------------------------

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    Epub,
    Docx,
}

impl DocumentFormat {
    /// Parse from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "epub" => Some(Self::Epub),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Detect from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Get the canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Epub => "epub",
            Self::Docx => "docx",
        }
    }

    /// Get MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Epub => "application/epub+zip",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension().to_uppercase())
    }
}

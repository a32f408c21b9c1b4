//! Per-page paragraphs and images from a PDF, via external tools.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use extract_core::error::Result;
use extract_core::model::{ExtractionResult, PageContent};

use crate::tools::PdfToolkit;

/// `pdfimages -p` output name: `img-<page>-<index>.<ext>`.
static IMAGE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^img-(\d+)-(\d+)\.[^.]+$").unwrap());

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Extract page text and images from `pdf_path`, copying images into
/// `output_dir`.
pub fn extract_pdf_content(
    pdf_path: &Path,
    output_dir: &Path,
    toolkit: &dyn PdfToolkit,
) -> Result<ExtractionResult> {
    log::info!("Extracting content from {}", pdf_path.display());
    std::fs::create_dir_all(output_dir)?;

    let text_dir = tempfile::TempDir::new()?;
    let image_dir = tempfile::TempDir::new()?;

    toolkit.page_text(pdf_path, text_dir.path())?;
    toolkit.page_images(pdf_path, image_dir.path())?;

    let mut images = collect_images(image_dir.path(), output_dir)?;

    let mut pages = Vec::new();
    for number in 1.. {
        let page_file = text_dir.path().join(format!("page-{}.txt", number));
        if !page_file.exists() {
            break;
        }
        let text = std::fs::read_to_string(&page_file)?;
        pages.push(PageContent {
            images: images.remove(&number).unwrap_or_default(),
            paragraphs: split_paragraphs(&text),
        });
    }

    if !images.is_empty() {
        log::warn!(
            "Images found for {} page(s) without text output; they were copied but not attached",
            images.len()
        );
    }

    let result = ExtractionResult::new(pages);
    log::info!(
        "Extracted {} page(s), {} paragraph(s), {} image(s)",
        result.pages.len(),
        result.paragraph_count(),
        result.image_count()
    );
    Ok(result)
}

/// Copy `img-<page>-<index>.*` files from `from` into `to`, grouped by page
/// and ordered by index.
fn collect_images(from: &Path, to: &Path) -> Result<BTreeMap<u32, Vec<PathBuf>>> {
    let mut found: Vec<(u32, u32, String)> = Vec::new();
    for entry in std::fs::read_dir(from)? {
        let name = entry?.file_name().to_string_lossy().to_string();
        let Some(caps) = IMAGE_NAME.captures(&name) else {
            continue;
        };
        let (Ok(page), Ok(index)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
            continue;
        };
        found.push((page, index, name));
    }
    found.sort();

    let mut by_page: BTreeMap<u32, Vec<PathBuf>> = BTreeMap::new();
    for (page, _, name) in found {
        let dest = to.join(&name);
        std::fs::copy(from.join(&name), &dest)?;
        by_page.entry(page).or_default().push(dest);
    }
    Ok(by_page)
}

/// Split page text on blank lines into trimmed, non-empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    BLANK_LINES
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

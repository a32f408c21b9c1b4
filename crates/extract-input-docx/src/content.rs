//! Paragraph text and embedded images from a DOCX.
//!
//! DOCX has no stored pagination, so the whole document comes back as a
//! single page.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;

use extract_core::error::{ExtractError, Result};
use extract_core::model::{ExtractionResult, PageContent};
use extract_utils::archive::Container;
use extract_utils::{href, mime, xml};

use crate::pages::DOCUMENT_PART;

const RELS_PART: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// A relationship target from `document.xml.rels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub target: String,
    pub external: bool,
}

/// Extract paragraphs and images from `docx_path`, writing images to
/// `output_dir` as `img-<uuid>.<ext>`.
pub fn extract_docx_content(docx_path: &Path, output_dir: &Path) -> Result<ExtractionResult> {
    log::info!("Extracting content from {}", docx_path.display());
    let container = Container::open(docx_path)?;
    let result = extract_from_container(&container, output_dir)?;

    log::info!(
        "Extracted {} paragraph(s), {} image(s)",
        result.paragraph_count(),
        result.image_count()
    );
    Ok(result)
}

fn extract_from_container(container: &Container, output_dir: &Path) -> Result<ExtractionResult> {
    std::fs::create_dir_all(output_dir)?;

    let document = container.read_text(DOCUMENT_PART)?;
    let rels = if container.contains(RELS_PART) {
        parse_relationships(&container.read_text(RELS_PART)?)
    } else {
        HashMap::new()
    };

    let walked = walk_document(&document)?;
    let mut images = Vec::new();
    for id in &walked.image_ids {
        if let Some(path) = write_image(container, &rels, id, output_dir)? {
            images.push(path);
        }
    }

    Ok(ExtractionResult::new(vec![PageContent::new(
        images,
        walked.paragraphs,
    )]))
}

/// Parse `document.xml.rels` into a map of relationship ID → target.
pub fn parse_relationships(rels_xml: &str) -> HashMap<String, Relationship> {
    let mut rels = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if xml::local_name(e) == "Relationship" {
                    let id = xml::attribute(e, "Id").unwrap_or_default();
                    let target = xml::attribute(e, "Target").unwrap_or_default();
                    let external = xml::attribute(e, "TargetMode")
                        .is_some_and(|m| m.eq_ignore_ascii_case("external"));
                    if !id.is_empty() && !target.is_empty() {
                        rels.insert(id, Relationship { target, external });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    rels
}

#[derive(Debug, Default)]
struct Walked {
    paragraphs: Vec<String>,
    image_ids: Vec<String>,
}

/// Collect paragraph text and image relationship IDs in document order.
fn walk_document(document: &str) -> Result<Walked> {
    let mut reader = Reader::from_str(document);
    let mut walked = Walked::default();
    // Text boxes nest paragraphs inside paragraphs.
    let mut open: Vec<String> = Vec::new();
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            ExtractError::MalformedDocument(format!("{}: XML error: {}", DOCUMENT_PART, e))
        })?;

        match event {
            Event::Start(ref e) => match e.local_name().as_ref() {
                // Alternate content repeats its fallback; read only the fallback.
                b"Choice" => {
                    reader.read_to_end(e.name()).map_err(|err| {
                        ExtractError::MalformedDocument(format!("{}: XML error: {}", DOCUMENT_PART, err))
                    })?;
                }
                b"p" => open.push(String::new()),
                b"r" => run_depth += 1,
                b"t" if run_depth > 0 => in_text = true,
                b"blip" | b"imagedata" => collect_image(e, &mut walked.image_ids),
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"tab" if run_depth > 0 => push_text(&mut open, "\t"),
                b"br" | b"cr" if run_depth > 0 => push_text(&mut open, "\n"),
                b"blip" | b"imagedata" => collect_image(e, &mut walked.image_ids),
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(text) = open.pop() {
                        let text = text.trim();
                        if !text.is_empty() {
                            walked.paragraphs.push(text.to_string());
                        }
                    }
                }
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(ref t) if in_text => push_text(&mut open, &xml::text(t)),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(walked)
}

fn push_text(open: &mut [String], text: &str) {
    if let Some(current) = open.last_mut() {
        current.push_str(text);
    }
}

fn collect_image(e: &quick_xml::events::BytesStart, ids: &mut Vec<String>) {
    let key = if xml::local_name(e) == "blip" { "embed" } else { "id" };
    if let Some(id) = xml::attribute(e, key).filter(|id| !id.is_empty()) {
        ids.push(id);
    }
}

/// Write the image behind relationship `id`, if it resolves to a part.
fn write_image(
    container: &Container,
    rels: &HashMap<String, Relationship>,
    id: &str,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    let Some(rel) = rels.get(id) else {
        log::debug!("Image relationship {} not found", id);
        return Ok(None);
    };
    if rel.external || rel.target.contains("://") {
        log::debug!("Skipping external image {}", rel.target);
        return Ok(None);
    }

    let part = href::resolve("word", &rel.target);
    let Ok(data) = container.read(&part) else {
        log::warn!("Image part {} is missing from the package", part);
        return Ok(None);
    };

    let extension = image_extension(container, &part);
    let path = output_dir.join(format!("img-{}.{}", uuid::Uuid::new_v4(), extension));
    std::fs::write(&path, data)?;
    log::debug!("Wrote {} ({} bytes) to {}", part, data.len(), path.display());
    Ok(Some(path))
}

/// Extension for an image part: its own, else from `[Content_Types].xml`.
fn image_extension(container: &Container, part: &str) -> String {
    if let Some(ext) = Path::new(part).extension().and_then(|e| e.to_str()) {
        return ext.to_ascii_lowercase();
    }

    container
        .read_text(CONTENT_TYPES_PART)
        .ok()
        .and_then(|types| override_content_type(&types, part))
        .and_then(|ct| mime::image_extension(&ct))
        .unwrap_or("bin")
        .to_string()
}

/// Content type from an `<Override PartName="/part">` entry.
fn override_content_type(types: &str, part: &str) -> Option<String> {
    let mut reader = Reader::from_str(types);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if xml::local_name(e) == "Override"
                    && xml::attribute(e, "PartName")
                        .is_some_and(|name| name.trim_start_matches('/') == part)
                {
                    return xml::attribute(e, "ContentType");
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }
    None
}

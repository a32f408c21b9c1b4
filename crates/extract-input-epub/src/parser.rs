//! EPUB parsing: reads container.xml, the OPF manifest and spine, and the
//! XHTML chapters they list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use rayon::prelude::*;

use extract_core::error::{ExtractError, Result};
use extract_core::model::{ExtractionResult, PageContent};
use extract_utils::archive::Container;
use extract_utils::{href, mime, xml};

/// Extract paragraphs and images from an EPUB, one page per spine chapter.
/// Images are written to `output_dir` as `page-<n>-<basename>`, where `n`
/// is the chapter's 1-based spine position.
pub fn extract_epub_content(epub_path: &Path, output_dir: &Path) -> Result<ExtractionResult> {
    let container = Container::open(epub_path)?;
    let result = extract_from_container(&container, output_dir)?;

    log::info!(
        "EPUB loaded: {} page(s), {} paragraph(s), {} image(s)",
        result.pages.len(),
        result.paragraph_count(),
        result.image_count()
    );
    Ok(result)
}

/// A chapter's markup, read from the archive.
struct RawChapter {
    spine_index: usize,
    path: String,
    markup: String,
}

/// What a chapter contains, before its images are written out.
#[derive(Debug, Default, PartialEq)]
struct Chapter {
    paragraphs: Vec<String>,
    image_srcs: Vec<String>,
}

fn extract_from_container(container: &Container, output_dir: &Path) -> Result<ExtractionResult> {
    std::fs::create_dir_all(output_dir)?;

    // 1. Find the OPF path from META-INF/container.xml
    let opf_path = read_container_xml(container)?;
    log::info!("OPF path: {}", opf_path);
    let opf_dir = href::parent(&opf_path);

    // 2. Parse manifest and spine
    let opf = container.read_text(&opf_path)?;
    let manifest = parse_opf_manifest(&opf);
    let spine = parse_opf_spine(&opf);
    log::debug!("{} manifest items, {} spine items", manifest.len(), spine.len());

    // 3. Read chapter markup (sequential, the archive is shared)
    let raw: Vec<RawChapter> = spine
        .iter()
        .enumerate()
        .filter_map(|(spine_index, idref)| {
            let Some((item_href, media_type)) = manifest.get(idref) else {
                log::warn!("Spine item {} is not in the manifest", idref);
                return None;
            };
            if !mime::is_html(media_type) {
                log::debug!("Skipping non-HTML spine item {} ({})", idref, media_type);
                return None;
            }
            let path = href::resolve(opf_dir, item_href);
            match container.read_text(&path) {
                Ok(markup) => Some(RawChapter {
                    spine_index,
                    path,
                    markup,
                }),
                Err(e) => {
                    log::warn!("Skipping chapter {}: {}", path, e);
                    None
                }
            }
        })
        .collect();

    // 4. Parse chapters in parallel with rayon; collect keeps spine order
    let chapters: Vec<Chapter> = raw
        .par_iter()
        .map(|chapter| parse_chapter(&chapter.path, &chapter.markup))
        .collect();

    // 5. Write images and assemble pages
    let mut pages = Vec::with_capacity(chapters.len());
    for (raw, chapter) in raw.iter().zip(chapters) {
        let images = write_chapter_images(container, raw, &chapter.image_srcs, output_dir)?;
        pages.push(PageContent::new(images, chapter.paragraphs));
    }

    Ok(ExtractionResult::new(pages))
}

/// Read META-INF/container.xml and return the OPF file path.
fn read_container_xml(container: &Container) -> Result<String> {
    let text = container.read_text("META-INF/container.xml")?;
    xml::find_attribute(&text, "rootfile", "full-path")
        .filter(|path| !path.is_empty())
        .ok_or_else(|| {
            ExtractError::MalformedDocument(
                "No rootfile full-path found in container.xml".to_string(),
            )
        })
}

/// Parse OPF manifest section. Returns map of id -> (href, media-type).
fn parse_opf_manifest(opf: &str) -> HashMap<String, (String, String)> {
    let mut items = HashMap::new();
    let mut reader = Reader::from_str(opf);
    let mut in_manifest = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let local = xml::local_name(e);
                if local == "manifest" {
                    in_manifest = true;
                } else if local == "item" && in_manifest {
                    let id = xml::attribute(e, "id").unwrap_or_default();
                    let item_href = xml::attribute(e, "href").unwrap_or_default();
                    let media_type = xml::attribute(e, "media-type").unwrap_or_default();

                    if !id.is_empty() && !item_href.is_empty() {
                        items.insert(id, (item_href, media_type));
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"manifest" {
                    in_manifest = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    items
}

/// Parse OPF spine section. Returns ordered list of idrefs.
fn parse_opf_spine(opf: &str) -> Vec<String> {
    let mut idrefs = Vec::new();
    let mut reader = Reader::from_str(opf);
    let mut in_spine = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let local = xml::local_name(e);
                if local == "spine" {
                    in_spine = true;
                } else if local == "itemref" && in_spine {
                    if let Some(idref) = xml::attribute(e, "idref").filter(|s| !s.is_empty()) {
                        idrefs.push(idref);
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"spine" {
                    in_spine = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    idrefs
}

/// Collect `<p>` text and `<img src>` values from chapter markup.
///
/// Parsing stops at the first XML error; what was read up to that point is
/// kept.
fn parse_chapter(path: &str, markup: &str) -> Chapter {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().check_end_names = false;

    let mut chapter = Chapter::default();
    let mut open: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"img" => push_src(e, &mut chapter.image_srcs),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"img" {
                    push_src(e, &mut chapter.image_srcs);
                }
            }
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"p" {
                    close_paragraph(&mut open, &mut chapter.paragraphs);
                }
            }
            Ok(Event::Text(ref t)) => {
                if !open.is_empty() {
                    let text = xml::text(t);
                    for paragraph in open.iter_mut() {
                        paragraph.push_str(&text);
                    }
                }
            }
            Ok(Event::CData(ref t)) => {
                let text = String::from_utf8_lossy(t);
                for paragraph in open.iter_mut() {
                    paragraph.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("Stopped parsing {} early: {}", path, e);
                break;
            }
            _ => {}
        }
    }

    while !open.is_empty() {
        close_paragraph(&mut open, &mut chapter.paragraphs);
    }
    chapter
}

fn push_src(e: &quick_xml::events::BytesStart, srcs: &mut Vec<String>) {
    if let Some(src) = xml::attribute(e, "src").filter(|s| !s.is_empty()) {
        srcs.push(src);
    }
}

fn close_paragraph(open: &mut Vec<String>, paragraphs: &mut Vec<String>) {
    if let Some(text) = open.pop() {
        let text = text.trim();
        if !text.is_empty() {
            paragraphs.push(text.to_string());
        }
    }
}

/// Copy a chapter's images that exist in the archive to `output_dir`.
fn write_chapter_images(
    container: &Container,
    raw: &RawChapter,
    srcs: &[String],
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let chapter_dir = href::parent(&raw.path);
    let mut images = Vec::new();

    for src in srcs {
        if src.contains("://") || src.starts_with("data:") {
            log::debug!("Skipping non-archive image {}", src);
            continue;
        }
        let entry = href::resolve(chapter_dir, src);
        let Ok(data) = container.read(&entry) else {
            log::debug!("Image {} referenced by {} is not in the archive", entry, raw.path);
            continue;
        };
        let name = href::basename(src);
        if name.is_empty() {
            continue;
        }

        let dest = output_dir.join(format!("page-{}-{}", raw.spine_index + 1, name));
        std::fs::write(&dest, data)?;
        images.push(dest);
    }

    Ok(images)
}

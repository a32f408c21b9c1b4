//! Copy a selection of pages out of a PDF into a new document.
//!
//! Selected page dictionaries are cloned under a freshly built page tree.
//! Content streams and resources are shared by reference, so nothing is
//! re-encoded. Annotations are copied per page so their back-references
//! land on the copy. Anything the new catalog cannot reach is pruned before
//! saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};

use extract_core::error::{ExtractError, Result};
use extract_core::selection;
use extract_utils::output;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// Extract pages from a PDF file into a new temporary PDF.
///
/// Pages are 1-based, written in request order with repeats kept.
/// Out-of-range numbers are skipped; if none remain the output has zero
/// pages.
pub fn extract_pages_from_pdf(pdf_path: &Path, pages: &[u32]) -> Result<PathBuf> {
    log::info!("Extracting pages {:?} from {}", pages, pdf_path.display());

    let bytes = std::fs::read(pdf_path)?;
    let selected = select_pages(&bytes, pages)?;
    let path = output::write_temp_output(&selected, "pages-", output::extension_or(pdf_path, "pdf"))?;

    log::info!("Wrote selected pages to {}", path.display());
    Ok(path)
}

/// Same as [`extract_pages_from_pdf`], on in-memory PDF bytes.
pub fn select_pages(source: &[u8], pages: &[u32]) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(source)
        .map_err(|e| ExtractError::InvalidPdf(format!("Failed to parse PDF: {}", e)))?;

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let indices = selection::resolve_pages(pages, page_ids.len());
    if indices.is_empty() {
        log::warn!(
            "None of pages {:?} exist in a {}-page PDF; output has no pages",
            pages,
            page_ids.len()
        );
    }

    let tree_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(indices.len());
    let mut clones = Vec::with_capacity(indices.len());
    let mut page_map: HashMap<ObjectId, ObjectId> = HashMap::new();
    for &index in &indices {
        let source_id = page_ids[index];
        let page = materialize_page(&doc, source_id, tree_id)?;
        let clone_id = doc.add_object(page);
        page_map.entry(source_id).or_insert(clone_id);
        clones.push(clone_id);
        kids.push(Object::Reference(clone_id));
    }
    for &clone_id in &clones {
        retarget_annotations(&mut doc, clone_id, &page_map)?;
    }

    let mut tree = Dictionary::new();
    tree.set("Type", Object::Name(b"Pages".to_vec()));
    tree.set("Count", Object::Integer(kids.len() as i64));
    tree.set("Kids", Object::Array(kids));
    doc.objects.insert(tree_id, Object::Dictionary(tree));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(tree_id));
    let catalog_id = doc.add_object(catalog);

    let info = doc.trailer.get(b"Info").ok().cloned();
    doc.trailer = Dictionary::new();
    doc.trailer.set("Root", Object::Reference(catalog_id));
    if let Some(info) = info {
        doc.trailer.set("Info", info);
    }

    let pruned = doc.prune_objects();
    doc.renumber_objects();
    log::debug!(
        "Kept {} of {} page(s), pruned {} unreachable object(s)",
        indices.len(),
        page_ids.len(),
        pruned.len()
    );

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| ExtractError::Pdf(format!("Failed to write PDF: {}", e)))?;
    Ok(out)
}

/// Clone a page dictionary, copying in any inherited attributes it does not
/// set itself, and attach it to the page tree `tree_id`.
fn materialize_page(doc: &Document, page_id: ObjectId, tree_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| {
            ExtractError::InvalidPdf(format!("Page object {} {} R: {}", page_id.0, page_id.1, e))
        })?
        .clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut hops = 0;
    while let Some(node_id) = parent {
        if hops == MAX_TREE_DEPTH {
            log::warn!("Page tree deeper than {} levels; stopped walking", MAX_TREE_DEPTH);
            break;
        }
        hops += 1;

        let Ok(node) = doc.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key, value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    page.set("Parent", Object::Reference(tree_id));
    Ok(page)
}

/// Give the page at `page_id` its own copies of its annotations.
///
/// Each copy's `/P` points at `page_id`, and `/Popup`, `/Parent` and `/IRT`
/// links between annotations of the same page follow the copies. Link
/// destinations are mapped through `page_map`; a destination page that was
/// not selected becomes null.
fn retarget_annotations(
    doc: &mut Document,
    page_id: ObjectId,
    page_map: &HashMap<ObjectId, ObjectId>,
) -> Result<()> {
    let entries = {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| ExtractError::Pdf(format!("Copied page vanished: {}", e)))?;
        match page.get(b"Annots") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => return Ok(()),
            },
            _ => return Ok(()),
        }
    };

    let mut annot_map: HashMap<ObjectId, ObjectId> = HashMap::new();
    let mut copies = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Object::Reference(id) => match doc.get_dictionary(id) {
                Ok(annot) => {
                    let mut annot = annot.clone();
                    retarget_annotation(&mut annot, page_id, page_map);
                    let copy_id = doc.add_object(annot);
                    annot_map.insert(id, copy_id);
                    copies.push(Object::Reference(copy_id));
                }
                Err(_) => copies.push(Object::Reference(id)),
            },
            Object::Dictionary(mut annot) => {
                retarget_annotation(&mut annot, page_id, page_map);
                copies.push(Object::Dictionary(annot));
            }
            other => copies.push(other),
        }
    }

    for copy_id in annot_map.values() {
        if let Ok(annot) = doc.get_dictionary_mut(*copy_id) {
            for key in [&b"Popup"[..], b"Parent", b"IRT"] {
                if let Ok(Object::Reference(target)) = annot.get_mut(key) {
                    if let Some(copy) = annot_map.get(&*target) {
                        *target = *copy;
                    }
                }
            }
        }
    }

    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        page.set("Annots", Object::Array(copies));
    }
    Ok(())
}

fn retarget_annotation(annot: &mut Dictionary, page_id: ObjectId, page_map: &HashMap<ObjectId, ObjectId>) {
    if annot.has(b"P") {
        annot.set("P", Object::Reference(page_id));
    }
    if let Ok(dest) = annot.get_mut(b"Dest") {
        retarget_destination(dest, page_map);
    }
    if let Ok(Object::Dictionary(action)) = annot.get_mut(b"A") {
        if let Ok(dest) = action.get_mut(b"D") {
            retarget_destination(dest, page_map);
        }
    }
}

/// Explicit destinations start with a page reference.
fn retarget_destination(dest: &mut Object, page_map: &HashMap<ObjectId, ObjectId>) {
    if let Object::Array(items) = dest {
        if let Some(Object::Reference(target)) = items.first() {
            let mapped = page_map
                .get(target)
                .map_or(Object::Null, |copy| Object::Reference(*copy));
            items[0] = mapped;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::Stream;

    /// An uncompressed PDF whose page N draws the text "Page N". Resources
    /// and MediaBox live on the page tree node, not on the pages.
    pub(crate) fn sample_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let tree_id = doc.new_object_id();

        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        let font_id = doc.add_object(font);

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        let resources_id = doc.add_object(resources);

        let mut kids = Vec::new();
        for n in 1..=pages {
            let content = format!("BT /F1 24 Tf 72 720 Td (Page {}) Tj ET", n);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(tree_id));
            page.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(page)));
        }

        let mut tree = Dictionary::new();
        tree.set("Type", Object::Name(b"Pages".to_vec()));
        tree.set("Count", Object::Integer(pages as i64));
        tree.set("Kids", Object::Array(kids));
        tree.set("Resources", Object::Reference(resources_id));
        tree.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ]),
        );
        doc.objects.insert(tree_id, Object::Dictionary(tree));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(tree_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    /// The "Page N" label drawn on each page, in page order.
    pub(crate) fn page_labels(pdf: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .map(|&id| {
                let page = doc.get_dictionary(id).unwrap();
                let content_id = page.get(b"Contents").unwrap().as_reference().unwrap();
                let stream = doc.get_object(content_id).unwrap().as_stream().unwrap();
                let text = String::from_utf8_lossy(&stream.content).to_string();
                let start = text.find('(').unwrap();
                let end = text.find(')').unwrap();
                text[start + 1..end].to_string()
            })
            .collect()
    }

    #[test]
    fn test_sample_pdf_labels() {
        assert_eq!(
            page_labels(&sample_pdf(3)),
            vec!["Page 1", "Page 2", "Page 3"]
        );
    }

    #[test]
    fn test_select_reorders() {
        let out = select_pages(&sample_pdf(5), &[5, 1]).unwrap();
        assert_eq!(page_labels(&out), vec!["Page 5", "Page 1"]);
    }

    #[test]
    fn test_select_in_order_subset() {
        let out = select_pages(&sample_pdf(5), &[1, 3]).unwrap();
        assert_eq!(page_labels(&out), vec!["Page 1", "Page 3"]);
    }

    #[test]
    fn test_select_duplicates_are_distinct_pages() {
        let out = select_pages(&sample_pdf(3), &[2, 2]).unwrap();
        assert_eq!(page_labels(&out), vec!["Page 2", "Page 2"]);

        let doc = Document::load_mem(&out).unwrap();
        let ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_select_skips_out_of_range() {
        let out = select_pages(&sample_pdf(3), &[0, 2, 99]).unwrap();
        assert_eq!(page_labels(&out), vec!["Page 2"]);
    }

    #[test]
    fn test_select_only_out_of_range_gives_empty_pdf() {
        let out = select_pages(&sample_pdf(3), &[4, 99]).unwrap();
        let doc = Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn test_inherited_attributes_materialized() {
        let out = select_pages(&sample_pdf(2), &[2]).unwrap();
        let doc = Document::load_mem(&out).unwrap();
        let page_id = doc.get_pages()[&1];
        let page = doc.get_dictionary(page_id).unwrap();

        assert!(page.has(b"Resources"));
        assert!(page.has(b"MediaBox"));
        assert!(!page.has(b"CropBox"));
    }

    #[test]
    fn test_unselected_pages_pruned() {
        let source = sample_pdf(5);
        let out = select_pages(&source, &[3]).unwrap();
        let doc = Document::load_mem(&out).unwrap();

        assert_eq!(content_streams(&doc), 1);
        assert!(out.len() < source.len());
    }

    /// Streams other than the cross-reference and object streams the
    /// writer and loader add.
    fn content_streams(doc: &Document) -> usize {
        doc.objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| {
                !matches!(
                    s.dict.get(b"Type").and_then(Object::as_name),
                    Ok(b"XRef") | Ok(b"ObjStm")
                )
            })
            .count()
    }

    /// Like [`sample_pdf`], with a text note on every page whose `/P` points
    /// back at its page, and on page 3 a link to page 5.
    fn annotated_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let tree_id = doc.new_object_id();
        let page_ids: Vec<ObjectId> = (0..pages).map(|_| doc.new_object_id()).collect();

        for (i, &page_id) in page_ids.iter().enumerate() {
            let n = i + 1;
            let content = format!("BT 72 720 Td (Page {}) Tj ET", n);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

            let mut note = Dictionary::new();
            note.set("Type", Object::Name(b"Annot".to_vec()));
            note.set("Subtype", Object::Name(b"Text".to_vec()));
            note.set("Contents", Object::string_literal(format!("Note {}", n)));
            note.set("P", Object::Reference(page_id));
            let mut annots = vec![Object::Reference(doc.add_object(note))];

            if n == 3 && pages >= 5 {
                let mut link = Dictionary::new();
                link.set("Type", Object::Name(b"Annot".to_vec()));
                link.set("Subtype", Object::Name(b"Link".to_vec()));
                link.set("P", Object::Reference(page_id));
                link.set(
                    "Dest",
                    Object::Array(vec![Object::Reference(page_ids[4]), Object::Name(b"Fit".to_vec())]),
                );
                annots.push(Object::Reference(doc.add_object(link)));
            }

            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(tree_id));
            page.set("Contents", Object::Reference(content_id));
            page.set("Annots", Object::Array(annots));
            doc.objects.insert(page_id, Object::Dictionary(page));
        }

        let mut tree = Dictionary::new();
        tree.set("Type", Object::Name(b"Pages".to_vec()));
        tree.set("Count", Object::Integer(pages as i64));
        tree.set(
            "Kids",
            Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()),
        );
        doc.objects.insert(tree_id, Object::Dictionary(tree));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(tree_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn annotations(doc: &Document, page_id: ObjectId) -> Vec<(ObjectId, Dictionary)> {
        let page = doc.get_dictionary(page_id).unwrap();
        page.get(b"Annots")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| {
                let id = entry.as_reference().unwrap();
                (id, doc.get_dictionary(id).unwrap().clone())
            })
            .collect()
    }

    #[test]
    fn test_annotations_point_at_copied_page() {
        let source = annotated_pdf(5);
        let out = select_pages(&source, &[3]).unwrap();
        let doc = Document::load_mem(&out).unwrap();

        assert_eq!(page_labels(&out), vec!["Page 3"]);
        assert_eq!(content_streams(&doc), 1);
        assert!(out.len() < source.len());

        let page_id = doc.get_pages()[&1];
        let annots = annotations(&doc, page_id);
        assert_eq!(annots.len(), 2);
        for (_, annot) in &annots {
            assert_eq!(annot.get(b"P").unwrap().as_reference().unwrap(), page_id);
        }
        let dest = annots[1].1.get(b"Dest").unwrap().as_array().unwrap();
        assert!(matches!(dest[0], Object::Null));
    }

    #[test]
    fn test_link_follows_selected_destination() {
        let out = select_pages(&annotated_pdf(5), &[3, 5]).unwrap();
        let doc = Document::load_mem(&out).unwrap();
        let pages = doc.get_pages();

        let annots = annotations(&doc, pages[&1]);
        let dest = annots[1].1.get(b"Dest").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), pages[&2]);
    }

    #[test]
    fn test_duplicated_pages_get_own_annotations() {
        let out = select_pages(&annotated_pdf(3), &[2, 2]).unwrap();
        let doc = Document::load_mem(&out).unwrap();
        let pages = doc.get_pages();

        let first = annotations(&doc, pages[&1]);
        let second = annotations(&doc, pages[&2]);
        assert_ne!(first[0].0, second[0].0);
        assert_eq!(first[0].1.get(b"P").unwrap().as_reference().unwrap(), pages[&1]);
        assert_eq!(second[0].1.get(b"P").unwrap().as_reference().unwrap(), pages[&2]);
    }

    #[test]
    fn test_invalid_pdf() {
        let err = select_pages(b"definitely not a pdf", &[1]).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidPdf(_)));
    }

    #[test]
    fn test_extract_pages_from_pdf_writes_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("input.pdf");
        std::fs::write(&source, sample_pdf(5)).unwrap();

        let out = extract_pages_from_pdf(&source, &[5, 1]).unwrap();
        assert_eq!(out.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert!(out
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("pages-")));
        assert_eq!(
            page_labels(&std::fs::read(&out).unwrap()),
            vec!["Page 5", "Page 1"]
        );

        std::fs::remove_file(&out).ok();
    }
}

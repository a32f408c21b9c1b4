//! Split `word/document.xml` into pages at explicit page breaks and
//! reassemble a chosen subset.
//!
//! A "page" here is structural: the body content between two page-break
//! paragraphs, in document order. Word's rendered pagination is not
//! consulted.
//!
//! A page-break paragraph is a direct child of `<w:body>` whose only
//! non-whitespace content is a single run holding a single
//! `<w:br w:type="page"/>`. Attributes, namespace prefixes and whitespace
//! may vary. Breaks nested inside tables or text boxes are not split points.

use std::ops::Range;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use extract_core::error::{ExtractError, Result};
use extract_core::selection;
use extract_utils::archive::Container;
use extract_utils::output;

/// Path of the main document part inside a DOCX package.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Page-break paragraph emitted between reassembled pages.
pub const PAGE_BREAK: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

/// Extract pages from a DOCX file into a new temporary DOCX.
///
/// Pages are 1-based and written in request order; repeats are kept and
/// out-of-range numbers skipped. Fails with `EmptySelection` when no
/// requested page exists.
pub fn extract_pages_from_docx(docx_path: &Path, pages: &[u32]) -> Result<PathBuf> {
    log::info!("Extracting pages {:?} from {}", pages, docx_path.display());

    let bytes = std::fs::read(docx_path)?;
    let selected = select_docx_pages(&bytes, pages)?;
    let extension = output::extension_or(docx_path, "docx");
    let path = output::write_temp_output(&selected, "pages-", extension)?;

    log::info!("Wrote selected pages to {}", path.display());
    Ok(path)
}

/// Same as [`extract_pages_from_docx`], on in-memory package bytes.
pub fn select_docx_pages(docx: &[u8], pages: &[u32]) -> Result<Vec<u8>> {
    let mut container = Container::load(docx)?;
    let xml = container.read_text(DOCUMENT_PART)?;

    let body = PagedBody::parse(&xml)?;
    log::debug!("{} contains {} page segment(s)", DOCUMENT_PART, body.page_count());

    let rebuilt = body.select(pages)?;
    container.replace(DOCUMENT_PART, rebuilt);
    container.serialize()
}

/// Body markup of a document, indexed by page segment.
#[derive(Debug)]
pub struct PagedBody<'a> {
    xml: &'a str,
    /// Inner content of `<w:body>`, between its opening and closing tags.
    content: Range<usize>,
    segments: Vec<Range<usize>>,
    /// Trailing body-level `<w:sectPr>`, through the end of the content.
    section: Option<Range<usize>>,
}

impl<'a> PagedBody<'a> {
    /// Tokenize the document and locate the body, its page breaks and its
    /// trailing section properties.
    pub fn parse(xml: &'a str) -> Result<Self> {
        let (content, tokens) = scan_body(xml)?;

        let mut breaks: Vec<Range<usize>> = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            if tokens[i].depth == 1 && tokens[i].kind == Kind::Open(Tag::Paragraph) {
                if let Some(len) = page_break_len(&tokens[i..]) {
                    breaks.push(tokens[i].span.start..tokens[i + len - 1].span.end);
                    i += len;
                    continue;
                }
            }
            i += 1;
        }

        let section = trailing_section(&tokens).map(|start| start..content.end);
        let pages_end = section.as_ref().map_or(content.end, |s| s.start);

        let mut segments = Vec::with_capacity(breaks.len() + 1);
        let mut start = content.start;
        for br in &breaks {
            segments.push(start..br.start);
            start = br.end;
        }
        segments.push(start..pages_end);

        Ok(Self {
            xml,
            content,
            segments,
            section,
        })
    }

    /// Number of page segments (at least 1).
    pub fn page_count(&self) -> usize {
        self.segments.len()
    }

    /// Markup of the 1-based page `number`.
    pub fn page(&self, number: usize) -> Option<&'a str> {
        let xml = self.xml;
        number
            .checked_sub(1)
            .and_then(|i| self.segments.get(i))
            .map(|range| &xml[range.clone()])
    }

    /// Build a new document keeping only the requested pages, joined by
    /// [`PAGE_BREAK`]. Everything outside the body content is kept verbatim.
    pub fn select(&self, pages: &[u32]) -> Result<String> {
        let indices = selection::resolve_nonempty(pages, self.page_count())?;
        let chosen: Vec<&str> = indices
            .iter()
            .map(|&i| &self.xml[self.segments[i].clone()])
            .collect();

        let mut out = String::with_capacity(self.xml.len());
        out.push_str(&self.xml[..self.content.start]);
        out.push_str(&chosen.join(PAGE_BREAK));
        if let Some(section) = &self.section {
            out.push_str(&self.xml[section.clone()]);
        }
        out.push_str(&self.xml[self.content.end..]);

        log::debug!(
            "Selected {} of {} page segment(s)",
            chosen.len(),
            self.page_count()
        );
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Paragraph,
    Run,
    Break { page: bool },
    Section,
    Other,
}

impl Tag {
    fn named(local: &[u8]) -> Self {
        match local {
            b"p" => Tag::Paragraph,
            b"r" => Tag::Run,
            b"br" => Tag::Break { page: false },
            b"sectPr" => Tag::Section,
            _ => Tag::Other,
        }
    }

    fn of(e: &BytesStart) -> Self {
        match Tag::named(e.local_name().as_ref()) {
            Tag::Break { .. } => Tag::Break {
                page: extract_utils::xml::attribute(e, "type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("page")),
            },
            tag => tag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Open(Tag),
    Close(Tag),
    Empty(Tag),
    /// Whitespace-only text.
    Blank,
    Other,
}

/// One markup event inside the body.
#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    /// Byte range in the document.
    span: Range<usize>,
    /// Element depth relative to the body; body children are at depth 1.
    depth: usize,
}

/// Locate `<w:body>` and tokenize its inner content.
fn scan_body(xml: &str) -> Result<(Range<usize>, Vec<Token>)> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    // (element depth of <w:body>, byte offset just past its opening tag)
    let mut body: Option<(usize, usize)> = None;
    let mut tokens = Vec::new();

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| {
            ExtractError::MalformedDocument(format!("{}: XML error: {}", DOCUMENT_PART, e))
        })?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(ref e) => {
                depth += 1;
                match body {
                    Some((body_depth, _)) => tokens.push(Token {
                        kind: Kind::Open(Tag::of(e)),
                        span: start..end,
                        depth: depth - body_depth,
                    }),
                    None if e.local_name().as_ref() == b"body" => body = Some((depth, end)),
                    None => {}
                }
            }
            Event::End(ref e) => {
                if let Some((body_depth, content_start)) = body {
                    if depth == body_depth {
                        return Ok((content_start..start, tokens));
                    }
                    tokens.push(Token {
                        kind: Kind::Close(Tag::named(e.local_name().as_ref())),
                        span: start..end,
                        depth: depth - body_depth,
                    });
                }
                depth = depth.saturating_sub(1);
            }
            Event::Empty(ref e) => {
                if let Some((body_depth, _)) = body {
                    tokens.push(Token {
                        kind: Kind::Empty(Tag::of(e)),
                        span: start..end,
                        depth: depth + 1 - body_depth,
                    });
                }
            }
            Event::Text(ref t) => {
                if let Some((body_depth, _)) = body {
                    let kind = if t.iter().all(u8::is_ascii_whitespace) {
                        Kind::Blank
                    } else {
                        Kind::Other
                    };
                    tokens.push(Token {
                        kind,
                        span: start..end,
                        depth: depth + 1 - body_depth,
                    });
                }
            }
            Event::Eof => break,
            _ => {
                if let Some((body_depth, _)) = body {
                    tokens.push(Token {
                        kind: Kind::Other,
                        span: start..end,
                        depth: depth + 1 - body_depth,
                    });
                }
            }
        }
    }

    Err(ExtractError::MalformedDocument(format!(
        "{}: <w:body> not found or not closed",
        DOCUMENT_PART
    )))
}

/// Number of tokens making up a page-break paragraph starting at
/// `tokens[0]`, if it is one.
fn page_break_len(tokens: &[Token]) -> Option<usize> {
    let mut significant = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.kind != Kind::Blank);
    let mut expect = |want: fn(Kind) -> bool| -> Option<usize> {
        let (i, token) = significant.next()?;
        want(token.kind).then_some(i)
    };

    expect(|k| k == Kind::Open(Tag::Paragraph))?;
    expect(|k| k == Kind::Open(Tag::Run))?;
    let br = expect(|k| {
        matches!(
            k,
            Kind::Empty(Tag::Break { page: true }) | Kind::Open(Tag::Break { page: true })
        )
    })?;
    if tokens[br].kind == Kind::Open(Tag::Break { page: true }) {
        expect(|k| matches!(k, Kind::Close(Tag::Break { .. })))?;
    }
    expect(|k| k == Kind::Close(Tag::Run))?;
    let end = expect(|k| k == Kind::Close(Tag::Paragraph))?;
    Some(end + 1)
}

/// Start offset of the body's last child when it is `<w:sectPr>`.
fn trailing_section(tokens: &[Token]) -> Option<usize> {
    let last = tokens
        .iter()
        .rposition(|t| t.depth == 1 && t.kind != Kind::Blank)?;

    match tokens[last].kind {
        Kind::Empty(Tag::Section) => Some(tokens[last].span.start),
        Kind::Close(Tag::Section) => tokens[..last]
            .iter()
            .rev()
            .find(|t| t.depth == 1 && t.kind == Kind::Open(Tag::Section))
            .map(|t| t.span.start),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body w:rsidR="00A1">"#;
    const SECT: &str = r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#;
    const TAIL: &str = "</w:body></w:document>";

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
    }

    fn document(pages: &[&str], sep: &str) -> String {
        let body: Vec<String> = pages.iter().map(|p| para(p)).collect();
        format!("{}{}{}{}", HEAD, body.join(sep), SECT, TAIL)
    }

    fn body_of(xml: &str) -> &str {
        let start = xml.find("<w:body w:rsidR=\"00A1\">").unwrap() + "<w:body w:rsidR=\"00A1\">".len();
        let end = xml.find("</w:body>").unwrap();
        &xml[start..end]
    }

    fn docx(xml: &str) -> Vec<u8> {
        let mut container = Container::new();
        container.replace("[Content_Types].xml", "<Types/>");
        container.replace(DOCUMENT_PART, xml);
        container.replace("word/styles.xml", "<w:styles/>");
        container.serialize().unwrap()
    }

    #[test]
    fn test_segments_split_on_breaks() {
        let xml = document(&["one", "two", "three"], PAGE_BREAK);
        let body = PagedBody::parse(&xml).unwrap();

        assert_eq!(body.page_count(), 3);
        assert_eq!(body.page(1), Some(para("one").as_str()));
        assert_eq!(body.page(2), Some(para("two").as_str()));
        assert_eq!(body.page(3), Some(para("three").as_str()));
        assert_eq!(body.page(0), None);
        assert_eq!(body.page(4), None);
    }

    #[test]
    fn test_tolerant_break_recognition() {
        let variant = "\n  <w:p w:rsidR=\"00B2\" w:rsidRDefault=\"00B2\">\n    <w:r w:rsidRPr=\"1\">\n      <w:br w:clear=\"all\" w:type=\"page\" />\n    </w:r>\n  </w:p>\n";
        let xml = document(&["one", "two"], variant);
        let body = PagedBody::parse(&xml).unwrap();

        assert_eq!(body.page_count(), 2);
        assert_eq!(body.page(1), Some(format!("{}\n  ", para("one")).as_str()));
        assert_eq!(body.page(2), Some(format!("\n{}", para("two")).as_str()));
    }

    #[test]
    fn test_break_with_text_is_not_a_marker() {
        let not_a_break = r#"<w:p><w:r><w:t>x</w:t><w:br w:type="page"/></w:r></w:p>"#;
        let line_break = r#"<w:p><w:r><w:br/></w:r></w:p>"#;
        let xml = format!(
            "{}{}{}{}{}{}{}",
            HEAD,
            para("one"),
            not_a_break,
            para("two"),
            line_break,
            SECT,
            TAIL
        );
        let body = PagedBody::parse(&xml).unwrap();
        assert_eq!(body.page_count(), 1);
    }

    #[test]
    fn test_nested_break_is_not_a_split_point() {
        let table = format!(
            "<w:tbl><w:tr><w:tc>{}{}</w:tc></w:tr></w:tbl>",
            PAGE_BREAK,
            para("cell")
        );
        let xml = format!("{}{}{}{}{}", HEAD, para("before"), table, SECT, TAIL);
        let body = PagedBody::parse(&xml).unwrap();
        assert_eq!(body.page_count(), 1);
    }

    #[test]
    fn test_select_order_and_section_last() {
        let xml = document(&["one", "two", "three"], PAGE_BREAK);
        let out = PagedBody::parse(&xml).unwrap().select(&[3, 1]).unwrap();

        assert_eq!(
            body_of(&out),
            format!("{}{}{}{}", para("three"), PAGE_BREAK, para("one"), SECT)
        );
        assert!(out.starts_with(HEAD));
        assert!(out.ends_with(TAIL));
    }

    #[test]
    fn test_select_duplicates() {
        let xml = document(&["one", "two", "three"], PAGE_BREAK);
        let out = PagedBody::parse(&xml).unwrap().select(&[2, 2]).unwrap();
        assert_eq!(
            body_of(&out),
            format!("{}{}{}{}", para("two"), PAGE_BREAK, para("two"), SECT)
        );
    }

    #[test]
    fn test_select_skips_out_of_range() {
        let xml = document(&["one", "two", "three"], PAGE_BREAK);
        let out = PagedBody::parse(&xml).unwrap().select(&[99, 2, 0]).unwrap();
        assert_eq!(body_of(&out), format!("{}{}", para("two"), SECT));
    }

    #[test]
    fn test_select_only_invalid_is_empty_selection() {
        let xml = document(&["one", "two", "three"], PAGE_BREAK);
        let err = PagedBody::parse(&xml).unwrap().select(&[4, 99]).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::EmptySelection { available: 3, .. }
        ));
    }

    #[test]
    fn test_no_breaks_single_page_unchanged() {
        let xml = format!("{}{}{}{}{}", HEAD, para("a"), para("b"), SECT, TAIL);
        let body = PagedBody::parse(&xml).unwrap();
        assert_eq!(body.page_count(), 1);
        assert_eq!(body.select(&[1]).unwrap(), xml);
    }

    #[test]
    fn test_without_section_properties() {
        let xml = format!("{}{}{}{}{}", HEAD, para("a"), PAGE_BREAK, para("b"), TAIL);
        let out = PagedBody::parse(&xml).unwrap().select(&[2, 1]).unwrap();
        assert_eq!(body_of(&out), format!("{}{}{}", para("b"), PAGE_BREAK, para("a")));
    }

    /// Pages without the section properties every output ends with.
    fn pages_only(out: &str) -> String {
        let body = body_of(out);
        assert_eq!(body.matches(SECT).count(), 1);
        body.strip_suffix(SECT).unwrap().to_string()
    }

    // Each output carries the body's sectPr once, after the last page, so
    // the pages are compared with it stripped.
    #[test]
    fn test_single_pages_concatenate_to_full_selection_minus_section() {
        let xml = document(&["one", "two"], PAGE_BREAK);
        let body = PagedBody::parse(&xml).unwrap();

        let first = pages_only(&body.select(&[1]).unwrap());
        let second = pages_only(&body.select(&[2]).unwrap());
        let both = pages_only(&body.select(&[1, 2]).unwrap());

        assert_eq!(format!("{}{}{}", first, PAGE_BREAK, second), both);
    }

    #[test]
    fn test_missing_body_is_malformed() {
        let xml = r#"<w:document xmlns:w="urn:w"><w:other/></w:document>"#;
        let err = PagedBody::parse(xml).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedDocument(_)));

        let unclosed = r#"<w:document xmlns:w="urn:w"><w:body><w:p>"#;
        let err = PagedBody::parse(unclosed).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedDocument(_)));
    }

    #[test]
    fn test_opening_tag_kept_verbatim() {
        let xml = document(&["one", "two"], PAGE_BREAK);
        let out = PagedBody::parse(&xml).unwrap().select(&[2]).unwrap();
        assert!(out.contains(r#"<w:body w:rsidR="00A1">"#));
    }

    #[test]
    fn test_select_docx_pages_rewrites_document_only() {
        let xml = document(&["one", "two", "three"], PAGE_BREAK);
        let out = select_docx_pages(&docx(&xml), &[1, 3]).unwrap();

        let container = Container::load(&out).unwrap();
        let rebuilt = container.read_text(DOCUMENT_PART).unwrap();
        assert_eq!(
            body_of(&rebuilt),
            format!("{}{}{}{}", para("one"), PAGE_BREAK, para("three"), SECT)
        );
        assert_eq!(container.read_text("word/styles.xml").unwrap(), "<w:styles/>");
        assert_eq!(container.len(), 3);
    }

    #[test]
    fn test_select_docx_pages_errors() {
        let err = select_docx_pages(b"not a zip", &[1]).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidContainer(_)));

        let mut container = Container::new();
        container.replace("word/styles.xml", "<w:styles/>");
        let err = select_docx_pages(&container.serialize().unwrap(), &[1]).unwrap_err();
        assert!(matches!(err, ExtractError::MissingEntry(_)));
    }

    #[test]
    fn test_extract_pages_from_docx_writes_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("report.docx");
        std::fs::write(&source, docx(&document(&["one", "two", "three"], PAGE_BREAK))).unwrap();

        let out = extract_pages_from_docx(&source, &[2]).unwrap();
        assert!(out.exists());
        assert_eq!(out.extension().and_then(|e| e.to_str()), Some("docx"));
        assert_ne!(out, source);

        let container = Container::open(&out).unwrap();
        let rebuilt = container.read_text(DOCUMENT_PART).unwrap();
        assert_eq!(body_of(&rebuilt), format!("{}{}", para("two"), SECT));

        std::fs::remove_file(&out).ok();
    }
}

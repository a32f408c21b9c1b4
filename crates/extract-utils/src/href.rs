//! Resolution of relative hrefs to archive entry paths.

use percent_encoding::percent_decode_str;

/// Resolve `href` against the directory `base_dir` (an archive path, with or
/// without trailing slash). Percent escapes are decoded, fragments and
/// queries dropped, and `.`/`..` segments normalized. A leading `/` makes
/// the href archive-absolute.
pub fn resolve(base_dir: &str, href: &str) -> String {
    let href = href
        .split(['#', '?'])
        .next()
        .unwrap_or_default();
    let href = percent_decode_str(href).decode_utf8_lossy();

    let mut parts: Vec<&str> = Vec::new();
    let joined;
    let path = if let Some(absolute) = href.strip_prefix('/') {
        absolute
    } else {
        joined = format!("{}/{}", base_dir.trim_end_matches('/'), href);
        joined.as_str()
    };

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Directory part of an archive path (`"OEBPS/text/ch1.xhtml"` → `"OEBPS/text"`).
pub fn parent(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// Final path segment of an href, without query or fragment.
pub fn basename(href: &str) -> &str {
    let href = href.split(['#', '?']).next().unwrap_or(href);
    href.rsplit('/').next().unwrap_or(href)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve("OEBPS", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve("OEBPS/text", "../images/a.png"), "OEBPS/images/a.png");
        assert_eq!(resolve("", "ch1.xhtml"), "ch1.xhtml");
        assert_eq!(resolve("word/", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve("a/b", "./c.png#frag"), "a/b/c.png");
    }

    #[test]
    fn test_resolve_absolute_and_escaped() {
        assert_eq!(resolve("word", "/word/media/x.png"), "word/media/x.png");
        assert_eq!(resolve("OEBPS", "my%20image.jpg"), "OEBPS/my image.jpg");
    }

    #[test]
    fn test_parent_and_basename() {
        assert_eq!(parent("OEBPS/text/ch1.xhtml"), "OEBPS/text");
        assert_eq!(parent("content.opf"), "");
        assert_eq!(basename("../images/cover.jpg"), "cover.jpg");
        assert_eq!(basename("plain.png?x=1"), "plain.png");
    }
}

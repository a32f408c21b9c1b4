//! Extraction options shared by the CLI and every extractor.

use serde::{Deserialize, Serialize};

/// All options controlling extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub verbose: u8,

    /// How DOCX pages are cut out of the source document.
    pub docx_pages: DocxPageMode,

    // -- External tools --
    pub soffice_path: String,
    pub mutool_path: String,
    pub pdfimages_path: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            verbose: 0,
            docx_pages: DocxPageMode::Markup,
            soffice_path: "soffice".to_string(),
            mutool_path: "mutool".to_string(),
            pdfimages_path: "pdfimages".to_string(),
        }
    }
}

/// DOCX page extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocxPageMode {
    /// Split `word/document.xml` on explicit page-break paragraphs.
    #[default]
    Markup,
    /// Convert to PDF with LibreOffice, then select rendered pages.
    ViaPdf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_round_trip_full() {
        let opts = ExtractOptions {
            verbose: 2,
            docx_pages: DocxPageMode::ViaPdf,
            soffice_path: "/opt/libreoffice/program/soffice".to_string(),
            mutool_path: "/usr/local/bin/mutool".to_string(),
            pdfimages_path: "pdfimages".to_string(),
        };

        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: ExtractOptions = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.verbose, 2);
        assert_eq!(parsed.docx_pages, DocxPageMode::ViaPdf);
        assert_eq!(parsed.soffice_path, "/opt/libreoffice/program/soffice");
        assert_eq!(parsed.mutool_path, "/usr/local/bin/mutool");
    }

    #[test]
    fn test_toml_partial_config() {
        let toml_str = r#"
verbose = 1
mutool_path = "/usr/bin/mutool"
"#;
        let opts: ExtractOptions = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.verbose, 1);
        assert_eq!(opts.mutool_path, "/usr/bin/mutool");
        // Defaults filled in
        assert_eq!(opts.docx_pages, DocxPageMode::Markup);
        assert_eq!(opts.soffice_path, "soffice");
        assert_eq!(opts.pdfimages_path, "pdfimages");
    }

    #[test]
    fn test_docx_page_mode_serde() {
        let toml_str = r#"docx_pages = "via-pdf""#;
        let opts: ExtractOptions = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.docx_pages, DocxPageMode::ViaPdf);

        let toml_str = r#"docx_pages = "markup""#;
        let opts: ExtractOptions = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.docx_pages, DocxPageMode::Markup);

        let toml_str = r#"docx_pages = "sideways""#;
        assert!(toml::from_str::<ExtractOptions>(toml_str).is_err());
    }
}

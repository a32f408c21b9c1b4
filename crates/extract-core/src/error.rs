use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    #[error("Missing entry: {0}")]
    MissingEntry(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("No valid page numbers given: requested {requested:?} from a document with {available} page(s)")]
    EmptySelection { requested: Vec<u32>, available: usize },

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("External tool error: {0}")]
    Tool(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ExtractError>;

//! doc-extract: cut pages out of DOCX/PDF files and pull text and images
//! out of DOCX, PDF and EPUB.
//!
//! Supports two CLI modes:
//! - Legacy: `doc-extract input.docx 1 3`
//! - Modern: `doc-extract pages input.docx 1 3 -o out.docx`,
//!   `doc-extract content input.epub -o images/`

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};

use extract_core::model::DocumentFormat;
use extract_core::options::{DocxPageMode, ExtractOptions};
use extract_core::plugin::{ContentExtractor, PageExtractor};

#[derive(Parser, Debug)]
#[command(
    name = "doc-extract",
    version,
    about = "Extract pages, text and images from DOCX, PDF and EPUB files",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input file (legacy mode)
    input: Option<PathBuf>,

    /// Pages to extract, 1-based, in output order (legacy mode)
    pages: Vec<u32>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// LibreOffice executable used for DOCX to PDF conversion
    #[arg(long, global = true)]
    soffice: Option<String>,

    /// mutool executable used for PDF text extraction
    #[arg(long, global = true)]
    mutool: Option<String>,

    /// pdfimages executable used for PDF image extraction
    #[arg(long, global = true)]
    pdfimages: Option<String>,

    /// Dump effective merged config as TOML and exit
    #[arg(long, global = true)]
    dump_config: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write selected pages of a DOCX or PDF to a new file
    Pages {
        /// Input file
        input: PathBuf,

        /// Pages to extract, 1-based, in output order
        #[arg(required = true)]
        pages: Vec<u32>,

        /// Where to move the result (default: a temporary file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render DOCX through PDF instead of splitting on page breaks
        #[arg(long)]
        via_pdf: bool,
    },

    /// Extract paragraphs and images, printing the result as JSON
    Content {
        /// Input file
        input: PathBuf,

        /// Directory for extracted images
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Load config from global and project-local TOML files.
/// Later files override earlier ones. Missing files are silently ignored.
fn load_config() -> ExtractOptions {
    let mut opts = ExtractOptions::default();

    // 1. Global config: ~/.config/doc-extract/config.toml
    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("doc-extract").join("config.toml");
        if let Some(parsed) = read_config_file(&global_path) {
            opts = parsed;
        }
    }

    // 2. Project-local config: ./.doc-extract.toml
    if let Some(parsed) = read_config_file(Path::new(".doc-extract.toml")) {
        merge_config(&mut opts, &parsed);
    }

    opts
}

fn read_config_file(path: &Path) -> Option<ExtractOptions> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<ExtractOptions>(&contents) {
        Ok(parsed) => {
            log::debug!("Loaded config from {}", path.display());
            Some(parsed)
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

/// Merge `from` into `base`. serde(default) fills every missing field, so
/// the project-local config fully overrides the global one.
fn merge_config(base: &mut ExtractOptions, from: &ExtractOptions) {
    *base = from.clone();
}

/// Apply CLI flags on top of config-loaded options.
/// Only overrides when the CLI flag was explicitly provided.
fn apply_cli_overrides(opts: &mut ExtractOptions, cli: &Cli, matches: &ArgMatches) {
    if matches.value_source("verbose") == Some(ValueSource::CommandLine) {
        opts.verbose = cli.verbose;
    }
    if let Some(ref soffice) = cli.soffice {
        opts.soffice_path = soffice.clone();
    }
    if let Some(ref mutool) = cli.mutool {
        opts.mutool_path = mutool.clone();
    }
    if let Some(ref pdfimages) = cli.pdfimages {
        opts.pdfimages_path = pdfimages.clone();
    }
    if let Some(Commands::Pages { via_pdf: true, .. }) = cli.command {
        opts.docx_pages = DocxPageMode::ViaPdf;
    }
}

fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.verbose)),
    )
    .init();

    let mut options = load_config();
    apply_cli_overrides(&mut options, &cli, &matches);

    // Handle --dump-config
    if cli.dump_config {
        match toml::to_string_pretty(&options) {
            Ok(s) => {
                println!("{}", s);
                process::exit(0);
            }
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
    }

    let result = match &cli.command {
        Some(Commands::Pages {
            input,
            pages,
            output,
            ..
        }) => run_pages(input, pages, output.as_deref(), &options),
        Some(Commands::Content { input, output }) => run_content(input, output, &options),
        None => match legacy_request(&cli) {
            Some((input, pages)) => run_pages(input, pages, None, &options),
            None => {
                eprint!("{}", USAGE);
                process::exit(1);
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

const USAGE: &str = "\
Usage: doc-extract <path-to-document> <page> [page...]
   or: doc-extract pages <input> <page>... [-o <output>] [--via-pdf]
   or: doc-extract content <input> -o <dir>
";

/// Legacy mode: a document followed by at least one page number.
fn legacy_request(cli: &Cli) -> Option<(&Path, &[u32])> {
    match &cli.input {
        Some(input) if !cli.pages.is_empty() => Some((input.as_path(), cli.pages.as_slice())),
        _ => None,
    }
}

fn run_pages(
    input: &Path,
    pages: &[u32],
    output: Option<&Path>,
    options: &ExtractOptions,
) -> Result<()> {
    let format = detect_format(input)?;
    let extractor = get_page_extractor(format)?;
    log::info!("{}: pages {:?} of {}", extractor.name(), pages, input.display());

    let created = extractor
        .extract_pages(input, pages, options)
        .with_context(|| format!("Failed to extract pages from {}", input.display()))?;

    let created = match output {
        Some(dest) => {
            move_file(&created, dest)?;
            dest.to_path_buf()
        }
        None => created,
    };

    println!("{}", created.display());
    Ok(())
}

fn run_content(input: &Path, output_dir: &Path, options: &ExtractOptions) -> Result<()> {
    let format = detect_format(input)?;
    let extractor = get_content_extractor(format);
    log::info!("{}: {} → {}", extractor.name(), input.display(), output_dir.display());

    let result = extractor
        .extract(input, output_dir, options)
        .with_context(|| format!("Failed to extract content from {}", input.display()))?;

    let json = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}

fn detect_format(input: &Path) -> Result<DocumentFormat> {
    DocumentFormat::from_path(input).with_context(|| {
        format!(
            "Cannot detect format of {} (expected .docx, .pdf or .epub)",
            input.display()
        )
    })
}

fn get_page_extractor(format: DocumentFormat) -> Result<Box<dyn PageExtractor>> {
    match format {
        DocumentFormat::Docx => Ok(Box::new(extract_input_docx::DocxPageExtractor)),
        DocumentFormat::Pdf => Ok(Box::new(extract_input_pdf::PdfPageExtractor)),
        DocumentFormat::Epub => Err(extract_core::error::ExtractError::UnsupportedFormat(
            format!("page extraction from {}", format),
        )
        .into()),
    }
}

fn get_content_extractor(format: DocumentFormat) -> Box<dyn ContentExtractor> {
    match format {
        DocumentFormat::Docx => Box::new(extract_input_docx::DocxContentExtractor),
        DocumentFormat::Pdf => Box::new(extract_input_pdf::PdfContentExtractor),
        DocumentFormat::Epub => Box::new(extract_input_epub::EpubContentExtractor),
    }
}

/// Move `from` to `to`, copying when a rename cannot cross filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)
        .with_context(|| format!("Failed to write {}", to.display()))?;
    if let Err(e) = std::fs::remove_file(from) {
        log::debug!("Ignoring cleanup failure for {}: {}", from.display(), e);
    }
    Ok(())
}

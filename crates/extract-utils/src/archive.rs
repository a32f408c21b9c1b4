//! In-memory ZIP container access for DOCX and EPUB packages.
//!
//! A [`Container`] holds every entry of a package in memory, keyed by entry
//! path and kept in archive order. Entries can be replaced or added and the
//! whole package re-serialized; nothing is written until [`Container::serialize`]
//! returns.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use zip::read::ZipArchive;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use extract_core::error::{ExtractError, Result};

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// A ZIP-based document package loaded into memory.
#[derive(Debug, Clone, Default)]
pub struct Container {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Container {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a ZIP byte stream.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractError::InvalidContainer(format!("Invalid ZIP: {}", e)))?;

        let mut container = Self::new();
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| ExtractError::InvalidContainer(format!("Entry #{}: {}", i, e)))?;
            let name = entry.name().to_string();
            let is_dir = entry.is_dir();
            let compression = entry.compression();

            let mut data = Vec::new();
            if !is_dir {
                entry.read_to_end(&mut data).map_err(|e| {
                    ExtractError::InvalidContainer(format!("Failed to read '{}': {}", name, e))
                })?;
            }

            container.put(Entry {
                name,
                data,
                compression,
                is_dir,
            });
        }

        log::debug!("Loaded container with {} entries", container.len());
        Ok(container)
    }

    /// Read and parse a ZIP file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::load(&bytes).map_err(|e| match e {
            ExtractError::InvalidContainer(msg) => {
                ExtractError::InvalidContainer(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entry paths in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Raw bytes of an entry.
    pub fn read(&self, name: &str) -> Result<&[u8]> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].data.as_slice())
            .ok_or_else(|| ExtractError::MissingEntry(name.to_string()))
    }

    /// Entry decoded as UTF-8 text (lossy, byte-order mark removed).
    pub fn read_text(&self, name: &str) -> Result<String> {
        let data = self.read(name)?;
        let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
        Ok(String::from_utf8_lossy(data).into_owned())
    }

    /// Overwrite an entry, or append it when absent. Content is not validated.
    pub fn replace(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        let data = data.into();
        match self.index.get(name) {
            Some(&i) => self.entries[i].data = data,
            None => self.put(Entry {
                name: name.to_string(),
                data,
                compression: CompressionMethod::Deflated,
                is_dir: false,
            }),
        }
    }

    /// Write all entries, in order, into a new ZIP byte stream.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            if entry.is_dir {
                writer
                    .add_directory(entry.name.as_str(), SimpleFileOptions::default())
                    .map_err(io::Error::other)?;
                continue;
            }

            // Anything not stored verbatim is re-deflated.
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(method);
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(io::Error::other)?;
            writer.write_all(&entry.data)?;
        }

        let cursor = writer.finish().map_err(io::Error::other)?;
        Ok(cursor.into_inner())
    }

    fn put(&mut self, entry: Entry) {
        match self.index.get(&entry.name) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

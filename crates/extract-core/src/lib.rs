//! Shared types for document content and page extraction.

pub mod error;
pub mod model;
pub mod options;
pub mod plugin;
pub mod selection;

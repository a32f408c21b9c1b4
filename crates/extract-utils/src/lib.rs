//! Shared helpers: ZIP containers, XML, archive paths, media types and
//! temporary outputs.

pub mod archive;
pub mod href;
pub mod mime;
pub mod output;
pub mod xml;

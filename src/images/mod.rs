//! Image artifact storage module
//!
//! Provides:
//! - File-backed storage for generated and uploaded images
//! - Filename extension to MIME type mapping

mod store;

pub use store::{mime_for, ArtifactStore};

//! Definition-file discovery for classmap
//!
//! This crate finds class declarations on disk and exposes them through the
//! factory's adapter seam:
//!
//! - [`parser`]: parses one definition file into declarations
//! - [`DeclarationIndex`]: accumulates declarations across files
//! - [`ClassScanner`]: walks directories and feeds matches into an index
//! - [`ScanAdapter`] + [`MetadataDriver`]: adapt a scan into a
//!   `classmap_core::MetadataFactory` source
//!
//! # Overview
//!
//! A scan runs at most once per adapter and is deferred until something
//! needs declarations. Listing classes filters out interfaces, transient
//! classes, and declarations indexed from outside the scanned directories;
//! loading metadata for any indexed declaration works regardless of the
//! filter.

pub mod adapter;
pub mod index;
pub mod parser;
pub mod scanner;

pub use adapter::{MetadataDriver, ScanAdapter};
pub use index::DeclarationIndex;
pub use parser::{ParsedFile, parse_definition};
pub use scanner::{ClassScanner, ScanOutcome};

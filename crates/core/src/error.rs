//! Shared error type for the classmap crates

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type covering the model, annotation, and factory layers
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error with operation context
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(classmap::core::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "canonicalize")
        operation: String,
    },

    /// Configuration error, e.g. an empty or missing scan directory
    #[error("Configuration error: {message}")]
    #[diagnostic(code(classmap::core::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Definition file could not be parsed
    #[error("Parse error in {} at line {line}: {message}", path.display())]
    #[diagnostic(code(classmap::core::parse))]
    Parse {
        /// File the error occurred in
        path: PathBuf,
        /// One-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// A value failed validation
    #[error("Validation failed: {message}")]
    #[diagnostic(code(classmap::core::validation))]
    Validation {
        /// Error message describing the validation failure
        message: String,
    },

    /// Metadata was requested for a class no scan discovered
    #[error("Unknown class: {name}")]
    #[diagnostic(
        code(classmap::core::unknown_class),
        help("The class was not declared in any scanned definition file")
    )]
    UnknownClass {
        /// The class name that was looked up
        name: String,
    },

    /// The same class name was declared in two different files
    #[error("Class {name} declared in both {} and {}", first.display(), second.display())]
    #[diagnostic(code(classmap::core::duplicate_class))]
    DuplicateClass {
        /// The class name declared twice
        name: String,
        /// File holding the first declaration
        first: PathBuf,
        /// File holding the conflicting declaration
        second: PathBuf,
    },

    /// Annotation registration or lookup misuse
    #[error("Annotation \"{name}\": {message}")]
    #[diagnostic(code(classmap::core::annotation))]
    Annotation {
        /// The annotation (attribute) name involved
        name: String,
        /// What went wrong
        message: String,
    },

    /// Error bubbled up from a cache pool
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] classmap_cache::Error),
}

impl Error {
    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a parse error
    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, line: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: msg.into(),
        }
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an unknown class error
    #[must_use]
    pub fn unknown_class(name: impl Into<String>) -> Self {
        Self::UnknownClass { name: name.into() }
    }

    /// Create a duplicate class error
    #[must_use]
    pub fn duplicate_class(
        name: impl Into<String>,
        first: impl Into<PathBuf>,
        second: impl Into<PathBuf>,
    ) -> Self {
        Self::DuplicateClass {
            name: name.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Create an annotation error
    #[must_use]
    pub fn annotation(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Annotation {
            name: name.into(),
            message: msg.into(),
        }
    }
}

/// Result type for classmap operations
pub type Result<T> = std::result::Result<T, Error>;

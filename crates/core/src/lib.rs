//! Class model, annotation reading, and the metadata factory for classmap
//!
//! This crate holds the pieces that do not touch the filesystem:
//! - The declaration model: [`ClassName`], [`ClassDecl`], raw [`Attribute`]s
//! - Typed annotation reading: [`AnnotationRegistry`], [`AnnotationReader`],
//!   and the [`AnnotationSet`] returned per declaration target
//! - The [`MetadataFactory`], which lazily derives metadata through a
//!   [`MetadataAdapter`] and keeps it coherent across an in-process memo
//!   and an optional cache pool
//!
//! # Overview
//!
//! Consumers implement [`MetadataAdapter`] (or use the scan adapter from
//! `classmap-discovery`), register their annotation types, and ask the
//! factory for metadata by class name. Each class is derived at most once
//! per factory; across processes the cache pool carries the work forward.

mod error;

pub mod annotations;
pub mod factory;
pub mod model;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use annotations::{
    Annotation, AnnotationReader, AnnotationRegistry, AnnotationSet, AnnotationType,
};
pub use factory::{MetadataAdapter, MetadataFactory, MetadataPool};
pub use model::{Attribute, ClassDecl, ClassKind, ClassName, FieldDecl, MethodDecl};

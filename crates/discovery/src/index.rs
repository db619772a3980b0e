//! Declaration index
//!
//! Accumulates class declarations across files and answers name lookups.
//! Files are keyed by canonical path, so adding the same file twice is a
//! no-op rather than a duplicate-class error.

use classmap_core::{ClassDecl, ClassName, Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::parser::ParsedFile;

/// All declarations gathered from a set of definition files
#[derive(Debug, Default)]
pub struct DeclarationIndex {
    classes: HashMap<ClassName, ClassDecl>,
    files: HashMap<PathBuf, Vec<ClassName>>,
}

impl DeclarationIndex {
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a parsed file
    ///
    /// A path that was added before is skipped entirely. A class name
    /// already claimed by a different file is rejected before anything is
    /// committed, so a failed add leaves the index unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateClass`] naming both files
    pub fn add_file(&mut self, path: &Path, parsed: ParsedFile) -> Result<()> {
        if self.files.contains_key(path) {
            tracing::debug!(path = %path.display(), "definition file already indexed, skipping");
            return Ok(());
        }

        for class in &parsed.classes {
            if let Some(existing) = self.classes.get(&class.name) {
                return Err(Error::duplicate_class(
                    class.name.as_str(),
                    existing.source.clone(),
                    path,
                ));
            }
        }

        let mut names = Vec::with_capacity(parsed.classes.len());
        for class in parsed.classes {
            names.push(class.name.clone());
            self.classes.insert(class.name.clone(), class);
        }
        self.files.insert(path.to_path_buf(), names);
        Ok(())
    }

    /// Look up a declaration by name
    #[must_use]
    pub fn get(&self, name: &ClassName) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    /// Whether `path` has been indexed
    #[must_use]
    pub fn contains_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Names declared by `path`, in source order
    #[must_use]
    pub fn names_in_file(&self, path: &Path) -> &[ClassName] {
        self.files.get(path).map_or(&[], Vec::as_slice)
    }

    /// Iterate over every indexed declaration, in no particular order
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.classes.values()
    }

    /// Number of indexed declarations
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the index holds no declarations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_definition;

    fn parsed(path: &str, source: &str) -> ParsedFile {
        parse_definition(Path::new(path), source).unwrap()
    }

    #[test]
    fn indexes_classes_by_name() {
        let mut index = DeclarationIndex::new();
        index
            .add_file(
                Path::new("/defs/a.cdef"),
                parsed("/defs/a.cdef", "namespace app\nclass User {\n}\n"),
            )
            .unwrap();

        let name = ClassName::new("app.User").unwrap();
        let class = index.get(&name).unwrap();
        assert_eq!(class.name, name);
        assert_eq!(index.len(), 1);
        assert!(index.contains_file(Path::new("/defs/a.cdef")));
    }

    #[test]
    fn re_adding_a_file_is_a_no_op() {
        let mut index = DeclarationIndex::new();
        let path = Path::new("/defs/a.cdef");
        index
            .add_file(path, parsed("/defs/a.cdef", "class User {\n}\n"))
            .unwrap();
        index
            .add_file(path, parsed("/defs/a.cdef", "class User {\n}\n"))
            .unwrap();

        assert_eq!(index.len(), 1);
    }

    #[test]
    fn duplicate_classes_across_files_name_both_sources() {
        let mut index = DeclarationIndex::new();
        index
            .add_file(
                Path::new("/defs/a.cdef"),
                parsed("/defs/a.cdef", "class User {\n}\n"),
            )
            .unwrap();
        let err = index
            .add_file(
                Path::new("/defs/b.cdef"),
                parsed("/defs/b.cdef", "class User {\n}\n"),
            )
            .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("User"));
        assert!(text.contains("a.cdef"));
        assert!(text.contains("b.cdef"));
    }

    #[test]
    fn a_rejected_file_leaves_the_index_unchanged() {
        let mut index = DeclarationIndex::new();
        index
            .add_file(
                Path::new("/defs/a.cdef"),
                parsed("/defs/a.cdef", "class User {\n}\n"),
            )
            .unwrap();
        index
            .add_file(
                Path::new("/defs/b.cdef"),
                parsed("/defs/b.cdef", "class Order {\n}\nclass User {\n}\n"),
            )
            .unwrap_err();

        assert!(index.get(&ClassName::new("Order").unwrap()).is_none());
        assert!(!index.contains_file(Path::new("/defs/b.cdef")));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn names_in_file_keeps_source_order() {
        let mut index = DeclarationIndex::new();
        index
            .add_file(
                Path::new("/defs/a.cdef"),
                parsed("/defs/a.cdef", "class B {\n}\nclass A {\n}\n"),
            )
            .unwrap();

        let names: Vec<_> = index
            .names_in_file(Path::new("/defs/a.cdef"))
            .iter()
            .map(ClassName::as_str)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
        assert!(index.names_in_file(Path::new("/defs/other.cdef")).is_empty());
    }

    #[test]
    fn unknown_names_return_none() {
        let index = DeclarationIndex::new();
        assert!(index.get(&ClassName::new("Missing").unwrap()).is_none());
        assert!(index.is_empty());
    }
}

//! Definition file scanning
//!
//! [`ClassScanner`] walks a set of directories for definition files and
//! feeds every match through the parser into a [`DeclarationIndex`]. The
//! [`ScanOutcome`] remembers which files the scan covered, so class-name
//! listings can exclude declarations that reached the index some other
//! way.

use classmap_core::{ClassDecl, ClassName, Error, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::index::DeclarationIndex;
use crate::parser::parse_definition;

/// Recursive scanner for class definition files
#[derive(Debug, Clone)]
pub struct ClassScanner {
    dirs: Vec<PathBuf>,
    pattern: Regex,
    follow_links: bool,
}

impl ClassScanner {
    /// Pattern matched against full file paths when none is given
    pub const DEFAULT_FILE_PATTERN: &'static str = r"(?i)\.cdef$";

    /// Create a scanner over `dirs` using [`Self::DEFAULT_FILE_PATTERN`]
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `dirs` is empty or names a
    /// missing directory
    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Result<Self> {
        Self::with_pattern(dirs, Self::DEFAULT_FILE_PATTERN)
    }

    /// Create a scanner with a custom file pattern
    ///
    /// The pattern is a regex tested against the full path of every file
    /// the walk visits.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `dirs` is empty, names a missing
    /// directory, or `pattern` is not a valid regex
    pub fn with_pattern(
        dirs: impl IntoIterator<Item = impl Into<PathBuf>>,
        pattern: &str,
    ) -> Result<Self> {
        let dirs: Vec<PathBuf> = dirs.into_iter().map(Into::into).collect();
        if dirs.is_empty() {
            return Err(Error::configuration("at least one scan directory is required"));
        }
        for dir in &dirs {
            if !dir.is_dir() {
                return Err(Error::configuration(format!(
                    "scan directory \"{}\" does not exist or is not a directory",
                    dir.display()
                )));
            }
        }
        let pattern = RegexBuilder::new(pattern)
            .size_limit(1024 * 1024)
            .build()
            .map_err(|e| Error::configuration(format!("invalid file pattern: {e}")))?;
        Ok(Self {
            dirs,
            pattern,
            follow_links: false,
        })
    }

    /// Follow symbolic links during the walk (off by default)
    #[must_use]
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    /// Directories this scanner covers
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Walk the configured directories and index every matching file
    ///
    /// Files already present in `index` are counted as covered without
    /// being parsed again. Unreadable directory entries are logged and
    /// skipped; an unparsable definition file aborts the scan.
    ///
    /// # Errors
    ///
    /// Returns the first read, parse, or duplicate-class error
    pub fn scan(&self, index: &mut DeclarationIndex) -> Result<ScanOutcome> {
        let mut files = HashSet::new();
        let mut parsed = 0usize;

        for dir in &self.dirs {
            let walk = WalkDir::new(dir)
                .follow_links(self.follow_links)
                .sort_by_file_name();
            for entry in walk {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(error) => {
                        tracing::warn!(%error, "unreadable directory entry, skipping");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                if !self.pattern.is_match(&entry.path().to_string_lossy()) {
                    continue;
                }
                let path = entry
                    .path()
                    .canonicalize()
                    .map_err(|e| Error::io(e, entry.path(), "canonicalize"))?;
                if files.contains(&path) {
                    continue;
                }
                if !index.contains_file(&path) {
                    let source =
                        fs::read_to_string(&path).map_err(|e| Error::io(e, &path, "read"))?;
                    index.add_file(&path, parse_definition(&path, &source)?)?;
                    parsed += 1;
                }
                files.insert(path);
            }
        }

        tracing::debug!(
            files = files.len(),
            parsed,
            classes = index.len(),
            "definition scan complete"
        );
        Ok(ScanOutcome { files, parsed })
    }
}

/// What one [`ClassScanner::scan`] covered
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    files: HashSet<PathBuf>,
    parsed: usize,
}

impl ScanOutcome {
    /// Canonical paths of every definition file the scan matched
    #[must_use]
    pub fn files(&self) -> &HashSet<PathBuf> {
        &self.files
    }

    /// Whether `path` was covered by the scan
    #[must_use]
    pub fn covers(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    /// Number of files the scan parsed for the first time
    #[must_use]
    pub fn parsed(&self) -> usize {
        self.parsed
    }

    /// Names of concrete classes the scan declared, sorted
    ///
    /// Interfaces are skipped, as are classes whose source file lies
    /// outside the scan and classes `is_transient` claims.
    pub fn class_names<F>(&self, index: &DeclarationIndex, mut is_transient: F) -> Vec<ClassName>
    where
        F: FnMut(&ClassDecl) -> bool,
    {
        let mut names: Vec<ClassName> = index
            .classes()
            .filter(|class| !class.is_interface())
            .filter(|class| self.covers(&class.source))
            .filter(|class| !is_transient(class))
            .map(|class| class.name.clone())
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, source: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, source).unwrap();
        path
    }

    fn names(outcome: &ScanOutcome, index: &DeclarationIndex) -> Vec<String> {
        outcome
            .class_names(index, |_| false)
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    #[test]
    fn scans_nested_directories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "user.cdef", "namespace app\nclass User {\n}\n");
        write(
            dir.path(),
            "billing/invoice.cdef",
            "namespace billing\nclass Invoice {\n}\n",
        );
        write(dir.path(), "notes.txt", "not a definition file");

        let mut index = DeclarationIndex::new();
        let scanner = ClassScanner::new([dir.path()]).unwrap();
        let outcome = scanner.scan(&mut index).unwrap();

        assert_eq!(outcome.parsed(), 2);
        assert_eq!(outcome.files().len(), 2);
        assert_eq!(names(&outcome, &index), vec!["app.User", "billing.Invoice"]);
    }

    #[test]
    fn default_pattern_ignores_case() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "user.CDEF", "class User {\n}\n");

        let mut index = DeclarationIndex::new();
        let scanner = ClassScanner::new([dir.path()]).unwrap();
        let outcome = scanner.scan(&mut index).unwrap();

        assert_eq!(outcome.parsed(), 1);
    }

    #[test]
    fn custom_patterns_replace_the_default() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "user.model", "class User {\n}\n");
        write(dir.path(), "order.cdef", "class Order {\n}\n");

        let mut index = DeclarationIndex::new();
        let scanner = ClassScanner::with_pattern([dir.path()], r"\.model$").unwrap();
        let outcome = scanner.scan(&mut index).unwrap();

        assert_eq!(names(&outcome, &index), vec!["User"]);
    }

    #[test]
    fn empty_dir_list_is_a_configuration_error() {
        let dirs: [&Path; 0] = [];
        let err = ClassScanner::new(dirs).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn missing_directory_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = ClassScanner::new([&missing]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn invalid_pattern_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = ClassScanner::with_pattern([dir.path()], "(unclosed").unwrap_err();
        assert!(err.to_string().contains("invalid file pattern"));
    }

    #[test]
    fn rescanning_does_not_reparse_indexed_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "user.cdef", "class User {\n}\n");

        let mut index = DeclarationIndex::new();
        let scanner = ClassScanner::new([dir.path()]).unwrap();
        let first = scanner.scan(&mut index).unwrap();
        let second = scanner.scan(&mut index).unwrap();

        assert_eq!(first.parsed(), 1);
        assert_eq!(second.parsed(), 0);
        assert_eq!(second.files().len(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn overlapping_dirs_parse_each_file_once() {
        let root = TempDir::new().unwrap();
        write(root.path(), "defs/user.cdef", "class User {\n}\n");

        let mut index = DeclarationIndex::new();
        let scanner =
            ClassScanner::new([root.path().to_path_buf(), root.path().join("defs")]).unwrap();
        let outcome = scanner.scan(&mut index).unwrap();

        assert_eq!(outcome.parsed(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn parse_failures_abort_the_scan() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "broken.cdef", "class Broken {\n");

        let mut index = DeclarationIndex::new();
        let scanner = ClassScanner::new([dir.path()]).unwrap();
        let err = scanner.scan(&mut index).unwrap_err();

        match err {
            Error::Parse { path, .. } => {
                assert!(path.to_string_lossy().contains("broken.cdef"));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn class_names_skip_interfaces_and_transients() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "app.cdef",
            "class User {\n}\nclass Draft {\n}\ninterface Visible {\n}\n",
        );

        let mut index = DeclarationIndex::new();
        let scanner = ClassScanner::new([dir.path()]).unwrap();
        let outcome = scanner.scan(&mut index).unwrap();

        let all = names(&outcome, &index);
        assert_eq!(all, vec!["Draft", "User"]);

        let concrete = outcome.class_names(&index, |class| class.name.as_str() == "Draft");
        assert_eq!(concrete.len(), 1);
        assert_eq!(concrete[0].as_str(), "User");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_need_follow_links() {
        let target = TempDir::new().unwrap();
        let scanned = TempDir::new().unwrap();
        write(target.path(), "user.cdef", "class User {\n}\n");
        std::os::unix::fs::symlink(target.path(), scanned.path().join("linked")).unwrap();

        let mut index = DeclarationIndex::new();
        let outcome = ClassScanner::new([scanned.path()])
            .unwrap()
            .scan(&mut index)
            .unwrap();
        assert_eq!(outcome.parsed(), 0);

        let mut index = DeclarationIndex::new();
        let outcome = ClassScanner::new([scanned.path()])
            .unwrap()
            .follow_links(true)
            .scan(&mut index)
            .unwrap();
        assert_eq!(outcome.parsed(), 1);
    }

    #[test]
    fn class_names_skip_files_outside_the_scan() {
        let scanned = TempDir::new().unwrap();
        let foreign = TempDir::new().unwrap();
        write(scanned.path(), "user.cdef", "class User {\n}\n");
        let foreign_file = write(foreign.path(), "order.cdef", "class Order {\n}\n");

        let mut index = DeclarationIndex::new();
        let parsed = crate::parser::parse_definition(
            &foreign_file,
            &fs::read_to_string(&foreign_file).unwrap(),
        )
        .unwrap();
        index.add_file(&foreign_file, parsed).unwrap();

        let scanner = ClassScanner::new([scanned.path()]).unwrap();
        let outcome = scanner.scan(&mut index).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(names(&outcome, &index), vec!["User"]);
    }
}

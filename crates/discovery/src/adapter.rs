//! Scan-backed metadata adapter
//!
//! [`ScanAdapter`] implements the factory's [`MetadataAdapter`] seam on top
//! of a [`ClassScanner`]: the first call that needs declarations runs the
//! scan, every later call reuses the indexed result. A [`MetadataDriver`]
//! supplies the domain-specific part, turning one declaration plus its
//! annotations into a metadata value.

use classmap_core::{
    AnnotationReader, ClassDecl, ClassName, Error, MetadataAdapter, Result,
};

use crate::index::DeclarationIndex;
use crate::scanner::{ClassScanner, ScanOutcome};

/// Turns class declarations into metadata values
pub trait MetadataDriver {
    /// Concrete metadata shape this driver produces
    type Metadata;

    /// Derive metadata for one declaration
    ///
    /// `reader` resolves the declaration's attributes against the registered
    /// annotation types.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration cannot be turned into metadata
    fn derive(&mut self, class: &ClassDecl, reader: &AnnotationReader) -> Result<Self::Metadata>;

    /// Whether a declaration should be left out of class listings
    ///
    /// Transient classes can still be loaded on demand by name.
    fn is_transient(&self, _class: &ClassDecl) -> bool {
        false
    }

    /// Whether a pool-cached instance is still usable
    fn validate_cached(&self, _metadata: &Self::Metadata) -> bool {
        true
    }

    /// Called after a validated pool hit is adopted
    fn on_cache_hit(&mut self, _metadata: &Self::Metadata) {}

    /// Called after fresh metadata has been derived and persisted
    fn on_loaded(&mut self, _metadata: &Self::Metadata) {}
}

/// [`MetadataAdapter`] that discovers classes by scanning definition files
pub struct ScanAdapter<D> {
    scanner: ClassScanner,
    reader: AnnotationReader,
    driver: D,
    index: DeclarationIndex,
    outcome: Option<ScanOutcome>,
}

impl<D: MetadataDriver> ScanAdapter<D> {
    /// Create an adapter; nothing is scanned until first use
    #[must_use]
    pub fn new(scanner: ClassScanner, reader: AnnotationReader, driver: D) -> Self {
        Self {
            scanner,
            reader,
            driver,
            index: DeclarationIndex::new(),
            outcome: None,
        }
    }

    /// The driver this adapter derives through
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Declarations indexed so far
    ///
    /// Empty until the first scan has run.
    #[must_use]
    pub fn index(&self) -> &DeclarationIndex {
        &self.index
    }

    /// Result of the scan, if one has run
    #[must_use]
    pub fn outcome(&self) -> Option<&ScanOutcome> {
        self.outcome.as_ref()
    }

    fn ensure_scanned(&mut self) -> Result<()> {
        if self.outcome.is_none() {
            self.outcome = Some(self.scanner.scan(&mut self.index)?);
        }
        Ok(())
    }
}

impl<D: MetadataDriver> MetadataAdapter for ScanAdapter<D> {
    type Metadata = D::Metadata;

    fn class_names(&mut self) -> Result<Vec<ClassName>> {
        self.ensure_scanned()?;
        let Some(outcome) = &self.outcome else {
            return Ok(Vec::new());
        };
        let names = outcome.class_names(&self.index, |class| self.driver.is_transient(class));
        tracing::debug!(
            listed = names.len(),
            indexed = self.index.len(),
            "class listing"
        );
        Ok(names)
    }

    fn load_metadata(&mut self, class: &ClassName) -> Result<Self::Metadata> {
        self.ensure_scanned()?;
        let Some(declaration) = self.index.get(class) else {
            return Err(Error::unknown_class(class.as_str()));
        };
        self.driver.derive(declaration, &self.reader)
    }

    fn validate_cached(&self, metadata: &Self::Metadata) -> bool {
        self.driver.validate_cached(metadata)
    }

    fn on_cache_hit(&mut self, metadata: &Self::Metadata) {
        self.driver.on_cache_hit(metadata);
    }

    fn on_loaded(&mut self, metadata: &Self::Metadata) {
        self.driver.on_loaded(metadata);
    }
}

//! Typed annotation reading
//!
//! Declarations carry raw [`Attribute`]s; consumers register annotation
//! types and read them back as typed values. A registration ties an
//! attribute name to a deserializer for the attribute's argument map, so an
//! annotation type is any `Deserialize` struct plus two constants naming the
//! attribute and whether it may repeat. Marker annotations deserialize from
//! an empty argument map, so they are written as empty braced structs.
//!
//! Reading converts every registered attribute on one declaration target
//! into its typed form and collapses repeatable attributes into an ordered
//! collection. Attributes with no registration are not annotations and are
//! skipped.

use crate::model::{Attribute, ClassDecl, FieldDecl, MethodDecl};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Object-safe base for typed annotation values
///
/// Implemented automatically for every `Any + Debug + Send + Sync` type, so
/// annotation structs only need to implement [`AnnotationType`].
pub trait Annotation: Any + fmt::Debug + Send + Sync {
    /// Upcast used by the typed getters to downcast to the concrete type
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> Annotation for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A typed annotation deserialized from attribute arguments
pub trait AnnotationType: Annotation + DeserializeOwned {
    /// Attribute name this annotation binds to, as written in definition files
    const NAME: &'static str;
    /// Whether several instances may target one declaration
    const REPEATABLE: bool = false;
}

type BuildFn = Box<dyn Fn(&Attribute) -> Result<Box<dyn Annotation>> + Send + Sync>;

struct Registration {
    repeatable: bool,
    build: BuildFn,
}

fn build_annotation<T: AnnotationType>(attribute: &Attribute) -> Result<Box<dyn Annotation>> {
    let args = serde_json::Value::Object(attribute.args.clone());
    let annotation: T = serde_path_to_error::deserialize(args)
        .map_err(|e| Error::annotation(&attribute.name, format!("invalid arguments: {e}")))?;
    Ok(Box::new(annotation))
}

/// Maps attribute names to typed annotation constructors
#[derive(Default)]
pub struct AnnotationRegistry {
    specs: HashMap<&'static str, Registration>,
}

impl fmt::Debug for AnnotationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.specs.keys().collect();
        names.sort_unstable();
        f.debug_struct("AnnotationRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl AnnotationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an annotation type under its [`AnnotationType::NAME`]
    ///
    /// Registering a second type under the same name replaces the first.
    pub fn register<T: AnnotationType>(&mut self) -> &mut Self {
        self.specs.insert(
            T::NAME,
            Registration {
                repeatable: T::REPEATABLE,
                build: Box::new(|attribute| build_annotation::<T>(attribute)),
            },
        );
        self
    }

    /// Whether an attribute name has a registration
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Whether a registered name is repeatable; `None` if unregistered
    #[must_use]
    pub fn is_repeatable(&self, name: &str) -> Option<bool> {
        self.specs.get(name).map(|r| r.repeatable)
    }

    /// Number of registered annotation types
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn registration(&self, name: &str) -> Option<&Registration> {
        self.specs.get(name)
    }
}

/// One name's worth of annotations on a declaration target
#[derive(Debug)]
enum AnnotationValue {
    Single(Box<dyn Annotation>),
    Repeated(Vec<Box<dyn Annotation>>),
}

/// Typed annotations read from one declaration target
///
/// Non-repeatable annotations are fetched with [`AnnotationSet::get`],
/// repeatable ones with [`AnnotationSet::collection`]; using the wrong
/// getter for a name is an error rather than a silent `None`.
#[derive(Debug, Default)]
pub struct AnnotationSet {
    entries: HashMap<String, AnnotationValue>,
}

impl AnnotationSet {
    fn push(&mut self, name: String, repeatable: bool, annotation: Box<dyn Annotation>) {
        if repeatable {
            let slot = self
                .entries
                .entry(name)
                .or_insert_with(|| AnnotationValue::Repeated(Vec::new()));
            if let AnnotationValue::Repeated(items) = slot {
                items.push(annotation);
            }
        } else {
            // A duplicated non-repeatable attribute keeps the last instance
            self.entries.insert(name, AnnotationValue::Single(annotation));
        }
    }

    /// Fetch a non-repeatable annotation; `None` when absent
    ///
    /// # Errors
    ///
    /// Returns an error if `T` is repeatable, or if the stored annotation
    /// was registered under this name with a different type
    pub fn get<T: AnnotationType>(&self) -> Result<Option<&T>> {
        if T::REPEATABLE {
            return Err(Error::annotation(
                T::NAME,
                "the attribute is repeatable, call `collection` instead of `get`",
            ));
        }
        match self.entries.get(T::NAME) {
            None => Ok(None),
            Some(AnnotationValue::Single(annotation)) => {
                match annotation.as_any().downcast_ref::<T>() {
                    Some(typed) => Ok(Some(typed)),
                    None => Err(Error::annotation(
                        T::NAME,
                        "stored annotation has a different type",
                    )),
                }
            }
            Some(AnnotationValue::Repeated(_)) => Err(Error::annotation(
                T::NAME,
                "stored as a repeatable collection, call `collection` instead of `get`",
            )),
        }
    }

    /// Fetch every instance of a repeatable annotation, in source order
    ///
    /// An absent name yields an empty collection.
    ///
    /// # Errors
    ///
    /// Returns an error if `T` is not repeatable, or if a stored annotation
    /// was registered under this name with a different type
    pub fn collection<T: AnnotationType>(&self) -> Result<Vec<&T>> {
        if !T::REPEATABLE {
            return Err(Error::annotation(
                T::NAME,
                "the attribute is not repeatable, call `get` instead of `collection`",
            ));
        }
        match self.entries.get(T::NAME) {
            None => Ok(Vec::new()),
            Some(AnnotationValue::Repeated(items)) => items
                .iter()
                .map(|annotation| {
                    annotation.as_any().downcast_ref::<T>().ok_or_else(|| {
                        Error::annotation(T::NAME, "stored annotation has a different type")
                    })
                })
                .collect(),
            Some(AnnotationValue::Single(_)) => Err(Error::annotation(
                T::NAME,
                "stored as a single annotation, call `get` instead of `collection`",
            )),
        }
    }

    /// Whether any annotation was read for this name
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names of every annotation in the set, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of distinct annotation names in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Converts the raw attributes on declaration targets into typed annotations
#[derive(Debug)]
pub struct AnnotationReader {
    registry: AnnotationRegistry,
}

impl AnnotationReader {
    /// Create a reader over a populated registry
    #[must_use]
    pub fn new(registry: AnnotationRegistry) -> Self {
        Self { registry }
    }

    /// The registry this reader converts through
    #[must_use]
    pub fn registry(&self) -> &AnnotationRegistry {
        &self.registry
    }

    /// Read the annotations on a class declaration itself
    ///
    /// # Errors
    ///
    /// Returns an error if a registered attribute has invalid arguments
    pub fn class_annotations(&self, class: &ClassDecl) -> Result<AnnotationSet> {
        self.convert(&class.attributes)
    }

    /// Read the annotations on a field declaration
    ///
    /// # Errors
    ///
    /// Returns an error if a registered attribute has invalid arguments
    pub fn field_annotations(&self, field: &FieldDecl) -> Result<AnnotationSet> {
        self.convert(&field.attributes)
    }

    /// Read the annotations on a method declaration
    ///
    /// # Errors
    ///
    /// Returns an error if a registered attribute has invalid arguments
    pub fn method_annotations(&self, method: &MethodDecl) -> Result<AnnotationSet> {
        self.convert(&method.attributes)
    }

    fn convert(&self, attributes: &[Attribute]) -> Result<AnnotationSet> {
        let mut set = AnnotationSet::default();
        for attribute in attributes {
            let Some(registration) = self.registry.registration(&attribute.name) else {
                continue;
            };
            let annotation = (registration.build)(attribute)?;
            set.push(attribute.name.clone(), registration.repeatable, annotation);
        }
        Ok(set)
    }
}

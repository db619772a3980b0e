//! Class declaration model
//!
//! Declarations are the parsed form of class definition files: a class or
//! interface with its raw attributes, fields, and methods. Names are
//! dot-separated (`billing.Invoice`); attributes stay untyped here and are
//! given types by the annotation reader.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A validated, dot-separated class name such as `billing.Invoice`
///
/// Each segment starts with a letter or underscore and continues with
/// letters, digits, or underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassName(String);

impl ClassName {
    /// Create a class name, validating every segment
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or any segment is malformed
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::validation("class name cannot be empty"));
        }
        for segment in name.split('.') {
            if !is_valid_segment(segment) {
                return Err(Error::validation(format!(
                    "invalid class name segment \"{segment}\" in \"{name}\""
                )));
            }
        }
        Ok(Self(name))
    }

    /// The full dotted name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final segment, without any namespace
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// The namespace portion, if the name has one
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(ns, _)| ns)
    }

    /// Key/value-safe form with separators flattened: `billing.Invoice`
    /// becomes `billing__Invoice`
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.0.replace('.', "__")
    }
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClassName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Whether a declaration is a class or an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    /// A concrete class declaration
    Class,
    /// An interface declaration; interfaces never carry metadata
    Interface,
}

/// A raw attribute as written in a definition file, e.g.
/// `@Column(kind: "string", nullable: true)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name without the leading `@`
    pub name: String,
    /// Named arguments; empty for marker attributes like `@Id()`
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

impl Attribute {
    /// Create an attribute with arguments
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        args: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Create an argument-less marker attribute
    #[must_use]
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: serde_json::Map::new(),
        }
    }
}

/// A field declaration inside a class body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Declared type name, e.g. `int` or `string`
    pub type_name: String,
    /// Attributes directly above the field
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// A method declaration inside a class body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Method name
    pub name: String,
    /// Parameter names in declaration order
    #[serde(default)]
    pub params: Vec<String>,
    /// Attributes directly above the method
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// A parsed class or interface declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    /// Fully qualified name, namespace included
    pub name: ClassName,
    /// Class or interface
    pub kind: ClassKind,
    /// Canonical path of the definition file this was declared in
    pub source: PathBuf,
    /// Attributes directly above the declaration
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    /// Methods in declaration order
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

impl ClassDecl {
    /// Look up a field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a method by name
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Whether this declaration is an interface
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }
}

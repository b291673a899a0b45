//! Datatype library contract
//!
//! The automaton never interprets text itself. Data and value transitions hand
//! the text to a [`Datatype`] obtained from a [`DatatypeLibrary`], which in turn
//! is located by namespace URI through a [`DatatypeLibraryFactory`].
//!
//! Two libraries ship with the crate: the RELAX NG built-in library for the
//! empty namespace (`string` and `token`) and a subset of the XML Schema
//! datatypes, registered by [`DatatypeRegistry::with_xsd`].

pub mod builtin;
pub mod xsd;

use crate::error::Result;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub use builtin::BuiltinLibrary;
pub use xsd::{XsdLibrary, XsdValue};

/// Context a datatype consults for context-dependent values
pub trait ValidationContext {
    /// Resolve a namespace prefix; the empty prefix is the default namespace
    fn resolve_namespace_prefix(&self, prefix: &str) -> Option<&str>;

    /// Base URI of the node carrying the value
    fn base_uri(&self) -> Option<&str> {
        None
    }

    /// Whether `name` is a declared unparsed entity
    fn is_unparsed_entity(&self, _name: &str) -> bool {
        true
    }

    /// Whether `name` is a declared notation
    fn is_notation(&self, _name: &str) -> bool {
        true
    }
}

/// Opaque value produced by [`Datatype::create_value`]
pub type DataValue = Box<dyn Any + Send + Sync>;

/// A datatype: lexical validation plus value equality
pub trait Datatype: fmt::Debug + Send + Sync {
    /// Check whether `text` is in the lexical space of this datatype
    fn is_valid(&self, text: &str, context: &dyn ValidationContext) -> bool;

    /// Convert `text` into a value, or `None` if it is not valid
    fn create_value(&self, text: &str, context: &dyn ValidationContext) -> Option<DataValue>;

    /// Compare two values created by this datatype
    fn same_value(&self, lhs: &DataValue, rhs: &DataValue) -> bool;

    /// True if validity depends on the validation context
    fn is_context_dependent(&self) -> bool {
        false
    }
}

/// Collects parameters (facets) before the datatype is created
pub trait DatatypeBuilder {
    /// Add a parameter; `context` resolves prefixes appearing in `value`
    fn add_parameter(&mut self, name: &str, value: &str, context: &dyn ValidationContext)
        -> Result<()>;

    /// Finish the datatype
    fn create_datatype(self: Box<Self>) -> Result<Arc<dyn Datatype>>;
}

/// A collection of datatypes sharing one namespace URI
pub trait DatatypeLibrary: Send + Sync {
    /// Start building the datatype named `local_name`
    fn create_datatype_builder(&self, local_name: &str) -> Result<Box<dyn DatatypeBuilder>>;

    /// Create a datatype without parameters
    fn create_datatype(&self, local_name: &str) -> Result<Arc<dyn Datatype>> {
        self.create_datatype_builder(local_name)?.create_datatype()
    }
}

/// Locates datatype libraries by namespace URI
pub trait DatatypeLibraryFactory {
    /// Library for `namespace_uri`, or `None` if there is none
    fn create_datatype_library(&self, namespace_uri: &str) -> Option<Arc<dyn DatatypeLibrary>>;
}

/// Namespace-keyed set of datatype libraries
#[derive(Clone, Default)]
pub struct DatatypeRegistry {
    libraries: IndexMap<String, Arc<dyn DatatypeLibrary>>,
}

impl DatatypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the XML Schema datatypes library
    pub fn with_xsd() -> Self {
        let mut registry = Self::new();
        registry.register(xsd::XSD_DATATYPES_NAMESPACE, Arc::new(XsdLibrary::new()));
        registry
    }

    /// Register (or replace) the library for a namespace
    pub fn register(&mut self, namespace_uri: impl Into<String>, library: Arc<dyn DatatypeLibrary>) {
        self.libraries.insert(namespace_uri.into(), library);
    }

    /// Namespaces with a registered library
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }
}

impl fmt::Debug for DatatypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatatypeRegistry")
            .field("namespaces", &self.libraries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DatatypeLibraryFactory for DatatypeRegistry {
    fn create_datatype_library(&self, namespace_uri: &str) -> Option<Arc<dyn DatatypeLibrary>> {
        self.libraries.get(namespace_uri).cloned()
    }
}

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs and newlines with spaces
    Replace,
    /// Replace and collapse multiple spaces
    Collapse,
}

impl WhiteSpace {
    /// Normalize a string according to this white space mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(|c| matches!(c, '\t' | '\n' | '\r'), " "),
            WhiteSpace::Collapse => collapse(s),
        }
    }
}

/// XML white space: space, tab, carriage return, line feed
pub fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// True if `text` is empty or consists of XML white space only
pub fn is_whitespace_only(text: &str) -> bool {
    text.chars().all(is_xml_whitespace)
}

/// Split on runs of XML white space, skipping empty tokens
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_xml_whitespace).filter(|t| !t.is_empty())
}

/// Collapse white space runs to one space and trim both ends
pub fn collapse(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for token in tokens(text) {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(token);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::NamespaceScope;

    #[test]
    fn test_collapse() {
        assert_eq!(collapse("  a \t b\r\n\nc  "), "a b c");
        assert_eq!(collapse(" \n "), "");
        assert_eq!(collapse("abc"), "abc");
    }

    #[test]
    fn test_tokens_skip_empty() {
        let found: Vec<_> = tokens("a b  c").collect();
        assert_eq!(found, vec!["a", "b", "c"]);
        assert_eq!(tokens("   ").count(), 0);
    }

    #[test]
    fn test_whitespace_only() {
        assert!(is_whitespace_only(""));
        assert!(is_whitespace_only(" \t\r\n"));
        assert!(!is_whitespace_only(" x "));
        // NBSP is not XML white space
        assert!(!is_whitespace_only("\u{A0}"));
    }

    #[test]
    fn test_white_space_modes() {
        assert_eq!(WhiteSpace::Preserve.normalize(" a\tb "), " a\tb ");
        assert_eq!(WhiteSpace::Replace.normalize(" a\tb "), " a b ");
        assert_eq!(WhiteSpace::Collapse.normalize(" a\tb "), "a b");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = DatatypeRegistry::with_xsd();
        assert!(registry
            .create_datatype_library(xsd::XSD_DATATYPES_NAMESPACE)
            .is_some());
        assert!(registry.create_datatype_library("urn:unknown").is_none());

        let library = registry
            .create_datatype_library(xsd::XSD_DATATYPES_NAMESPACE)
            .unwrap();
        let int = library.create_datatype("int").unwrap();
        let ctx = NamespaceScope::new();
        assert!(int.is_valid(" 42 ", &ctx));
        assert!(!int.is_valid("forty-two", &ctx));
    }
}

//! XML namespace handling
//!
//! This module provides qualified names and the namespace scope that datatypes
//! consult when a value is context dependent (QName-valued attributes, for
//! instance).

use crate::datatypes::ValidationContext;
use crate::{XMLNS_NAMESPACE, XML_NAMESPACE};
use std::fmt;
use std::sync::Arc;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI (empty for no namespace)
    pub namespace: String,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new("", local_name)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

/// Returns true if an attribute with this name is a namespace declaration
pub fn is_namespace_declaration(namespace: &str, local_name: &str, qname: Option<&str>) -> bool {
    if namespace == XMLNS_NAMESPACE {
        return true;
    }
    match qname {
        Some(q) => q == "xmlns" || q.starts_with("xmlns:"),
        None => namespace.is_empty() && local_name == "xmlns",
    }
}

#[derive(Debug)]
struct Binding {
    prefix: String,
    uri: String,
    parent: Option<Arc<Binding>>,
}

/// Immutable chain of prefix bindings in effect for one element.
///
/// Binding a prefix returns a new scope and leaves the receiver untouched, so a
/// scope captured in an attribute view stays valid after the parser moves on.
#[derive(Debug, Clone)]
pub struct NamespaceScope {
    head: Option<Arc<Binding>>,
}

impl NamespaceScope {
    /// Scope with only the `xml` prefix bound
    pub fn new() -> Self {
        Self::empty().bind("xml", XML_NAMESPACE)
    }

    /// Scope with no bindings at all
    pub fn empty() -> Self {
        Self { head: None }
    }

    /// Build a scope from `(prefix, uri)` pairs; an empty prefix is the default namespace
    pub fn from_bindings<'a, I>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        bindings
            .into_iter()
            .fold(Self::new(), |scope, (prefix, uri)| scope.bind(prefix, uri))
    }

    /// Add a namespace prefix mapping, shadowing any outer binding of the same prefix
    pub fn bind(&self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            head: Some(Arc::new(Binding {
                prefix: prefix.into(),
                uri: uri.into(),
                parent: self.head.clone(),
            })),
        }
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        let mut cursor = self.head.as_deref();
        while let Some(binding) = cursor {
            if binding.prefix == prefix {
                return Some(binding.uri.as_str());
            }
            cursor = binding.parent.as_deref();
        }
        None
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.get_namespace("").filter(|uri| !uri.is_empty())
    }

    /// Resolve a prefixed name to a QName; unprefixed names take the default namespace
    pub fn resolve(&self, prefixed_name: &str) -> Option<QName> {
        match prefixed_name.split_once(':') {
            Some((prefix, local)) => self
                .get_namespace(prefix)
                .map(|namespace| QName::new(namespace, local)),
            None => Some(QName::new(
                self.get_default_namespace().unwrap_or(""),
                prefixed_name,
            )),
        }
    }
}

impl Default for NamespaceScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationContext for NamespaceScope {
    fn resolve_namespace_prefix(&self, prefix: &str) -> Option<&str> {
        self.get_namespace(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_display() {
        let qname = QName::new("http://example.com", "element");
        assert_eq!(qname.to_string(), "{http://example.com}element");
        assert_eq!(QName::local("element").to_string(), "element");
    }

    #[test]
    fn test_scope_shadowing_is_persistent() {
        let outer = NamespaceScope::new().bind("p", "urn:outer");
        let inner = outer.bind("p", "urn:inner");

        assert_eq!(inner.get_namespace("p"), Some("urn:inner"));
        assert_eq!(outer.get_namespace("p"), Some("urn:outer"));
        assert_eq!(outer.get_namespace("xml"), Some(XML_NAMESPACE));
        assert_eq!(NamespaceScope::empty().get_namespace("xml"), None);
    }

    #[test]
    fn test_resolve_prefixed_name() {
        let scope = NamespaceScope::from_bindings([("xs", "http://www.w3.org/2001/XMLSchema")]);

        let qname = scope.resolve("xs:element").unwrap();
        assert_eq!(qname.namespace, "http://www.w3.org/2001/XMLSchema");
        assert_eq!(qname.local_name, "element");
        assert!(scope.resolve("nope:element").is_none());
        assert_eq!(scope.resolve("plain").unwrap().namespace, "");
    }

    #[test]
    fn test_namespace_declarations() {
        assert!(is_namespace_declaration(XMLNS_NAMESPACE, "p", None));
        assert!(is_namespace_declaration("", "xmlns", None));
        assert!(is_namespace_declaration("", "p", Some("xmlns:p")));
        assert!(!is_namespace_declaration("", "id", Some("id")));
    }
}

//! Per-element attribute snapshots
//!
//! An [`AttributeView`] is built once per start tag. It holds the element's
//! attributes (namespace declarations excluded) already resolved to name
//! codes, together with the namespace scope in effect on that element so that
//! context-dependent datatypes can resolve prefixes in attribute values.

use crate::names::{NameCode, NameResolver};
use crate::namespaces::{is_namespace_declaration, NamespaceScope};
use once_cell::sync::Lazy;

static EMPTY_VIEW: Lazy<AttributeView> = Lazy::new(|| AttributeView::new(NamespaceScope::new()));

/// One attribute, with its name already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Resolved name code
    pub name: NameCode,
    /// Attribute value as it appeared in the document
    pub value: String,
}

/// Immutable attribute list of one element plus its prefix resolution context
#[derive(Debug, Clone)]
pub struct AttributeView {
    entries: Vec<Attribute>,
    context: NamespaceScope,
}

impl AttributeView {
    /// The shared view with no attributes
    pub fn empty() -> &'static AttributeView {
        &EMPTY_VIEW
    }

    /// Create a view with no attributes yet
    pub fn new(context: NamespaceScope) -> Self {
        Self {
            entries: Vec::new(),
            context,
        }
    }

    /// Append an already resolved attribute
    pub fn push(&mut self, name: NameCode, value: impl Into<String>) {
        self.entries.push(Attribute {
            name,
            value: value.into(),
        });
    }

    /// Build a view from `(namespace URI, local name, value)` triples.
    ///
    /// Namespace declarations are skipped.
    pub fn build<'a, I>(names: &NameResolver, attributes: I, context: NamespaceScope) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        let mut view = Self::new(context);
        for (uri, local, value) in attributes {
            if is_namespace_declaration(uri, local, None) {
                continue;
            }
            view.push(names.resolve(uri, local), value);
        }
        view
    }

    /// Build a view from the attributes of a parsed element
    pub fn from_node(names: &NameResolver, node: &roxmltree::Node<'_, '_>, context: NamespaceScope) -> Self {
        Self::build(
            names,
            node.attributes()
                .map(|attr| (attr.namespace().unwrap_or(""), attr.name(), attr.value())),
            context,
        )
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the element has no attributes
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name code of the attribute at `index`
    pub fn name(&self, index: usize) -> NameCode {
        self.entries[index].name
    }

    /// Value of the attribute at `index`
    pub fn value(&self, index: usize) -> &str {
        &self.entries[index].value
    }

    /// Iterate over the attributes in document order
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.iter()
    }

    /// Namespace scope of the element
    pub fn context(&self) -> &NamespaceScope {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::XMLNS_NAMESPACE;

    fn resolver() -> NameResolver {
        let mut names = NameResolver::new(0);
        names.insert("", "id", 1).unwrap();
        names.insert("urn:x", "*", 2).unwrap();
        names
    }

    #[test]
    fn test_build_skips_namespace_declarations() {
        let view = AttributeView::build(
            &resolver(),
            [
                ("", "id", "a1"),
                (XMLNS_NAMESPACE, "p", "urn:x"),
                ("", "xmlns", "urn:default"),
                ("urn:x", "lang", "en"),
                ("", "other", "?"),
            ],
            NamespaceScope::new(),
        );

        assert_eq!(view.len(), 3);
        assert_eq!((view.name(0), view.value(0)), (1, "a1"));
        assert_eq!((view.name(1), view.value(1)), (2, "en"));
        assert_eq!(view.name(2), 0);
    }

    #[test]
    fn test_from_node_keeps_scope() {
        let xml = r#"<root xmlns:p="urn:x" id="r" p:flag="yes"/>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let root = doc.root_element();
        let scope = NamespaceScope::new().bind("p", "urn:x");

        let view = AttributeView::from_node(&resolver(), &root, scope);
        let names: Vec<_> = view.iter().map(|a| a.name).collect();
        assert_eq!(names, vec![1, 2]);
        assert_eq!(view.context().get_namespace("p"), Some("urn:x"));
    }

    #[test]
    fn test_empty_view_is_shared() {
        assert!(AttributeView::empty().is_empty());
        assert!(std::ptr::eq(AttributeView::empty(), AttributeView::empty()));
    }
}

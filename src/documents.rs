//! Tree driver
//!
//! Validates documents parsed with `roxmltree` by replaying them as push
//! events on a [`Validator`]. Traversal is iterative, so deep documents do not
//! grow the call stack.

use crate::error::Result;
use crate::namespaces::NamespaceScope;
use crate::schema::Schema;
use crate::validator::Validator;
use roxmltree::{Document, Node, ParsingOptions};
use std::path::Path;
use tracing::debug;

/// Parse `xml` and validate it
pub fn validate_str(schema: &Schema, xml: &str) -> Result<()> {
    schema.limits().check_xml_size(xml.len())?;
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options)?;
    validate_document(schema, &doc)
}

/// Read, parse and validate a file
pub fn validate_file(schema: &Schema, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), "validating file");
    let content = std::fs::read_to_string(path)?;
    validate_str(schema, &content)
}

/// Validate an already parsed document
pub fn validate_document(schema: &Schema, doc: &Document<'_>) -> Result<()> {
    let mut validator = schema.validator();
    replay(&mut validator, doc)
}

/// Pending work of the replay walk
enum Step<'a, 'input> {
    Enter(Node<'a, 'input>),
    Leave,
}

/// Feed every event of `doc` to `validator`, from `start_document` to `end_document`
pub fn replay(validator: &mut Validator<'_>, doc: &Document<'_>) -> Result<()> {
    validator.start_document();

    let mut stack = vec![Step::Enter(doc.root())];
    while let Some(step) = stack.pop() {
        let node = match step {
            Step::Enter(node) => node,
            Step::Leave => {
                validator.end_element()?;
                continue;
            }
        };

        if node.is_element() {
            let name = node.tag_name();
            validator.start_element(
                name.namespace().unwrap_or(""),
                name.name(),
                node.attributes()
                    .map(|attr| (attr.namespace().unwrap_or(""), attr.name(), attr.value())),
                scope_of(&node),
            )?;
            stack.push(Step::Leave);
        } else if node.is_text() {
            if let Some(text) = node.text() {
                validator.characters(text)?;
            }
            continue;
        } else if !node.is_root() {
            continue;
        }

        // children are popped in document order
        stack.extend(node.children().rev().map(Step::Enter));
    }

    validator.end_document()
}

/// Prefix bindings in scope on `node`
fn scope_of(node: &Node<'_, '_>) -> NamespaceScope {
    NamespaceScope::from_bindings(
        node.namespaces()
            .map(|ns| (ns.name().unwrap_or(""), ns.uri())),
    )
}

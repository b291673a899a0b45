//! Push validation sessions
//!
//! A [`Validator`] turns a stream of SAX-like events into automaton
//! derivatives. It owns the per-run [`Automaton`], the stack of open elements
//! with their attribute views, and the character data collected since the last
//! element boundary.

use crate::attributes::AttributeView;
use crate::automaton::{Automaton, StateRef, TextSensitivity};
use crate::datatypes::is_whitespace_only;
use crate::error::{Error, RejectedEvent, Result, ValidationError};
use crate::namespaces::{NamespaceScope, QName};
use crate::schema::Schema;
use tracing::{debug, trace};

#[derive(Debug)]
struct Frame {
    name: QName,
    attributes: AttributeView,
}

/// Character data collected between two element boundaries
#[derive(Debug, Default)]
struct TextBuffer {
    text: String,
    /// Only white space has been seen so far
    ignorable: bool,
}

impl TextBuffer {
    fn reset(&mut self) {
        self.text.clear();
        self.ignorable = true;
    }
}

/// Validation session for one document at a time.
///
/// Every event method returns `Err(Error::Validation(..))` as soon as the
/// document can no longer match. The session stays rejected until
/// [`Validator::start_document`] is called again.
#[derive(Debug)]
pub struct Validator<'s> {
    automaton: Automaton<'s>,
    current: StateRef,
    frames: Vec<Frame>,
    buffer: TextBuffer,
    rejected: Option<ValidationError>,
}

impl<'s> Validator<'s> {
    /// Create a session positioned at the start of a document
    pub fn new(schema: &'s Schema) -> Self {
        let mut automaton = schema.automaton();
        let current = automaton.initial_state();
        Self {
            automaton,
            current,
            frames: Vec::new(),
            buffer: TextBuffer {
                text: String::new(),
                ignorable: true,
            },
            rejected: None,
        }
    }

    /// Schema validated against
    pub fn schema(&self) -> &'s Schema {
        self.automaton.schema()
    }

    /// The underlying automaton
    pub fn automaton(&self) -> &Automaton<'s> {
        &self.automaton
    }

    /// Current derived state
    pub fn current_state(&self) -> StateRef {
        self.current
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Slash-separated local names of the open elements
    pub fn path(&self) -> String {
        let mut path = String::new();
        for frame in &self.frames {
            path.push('/');
            path.push_str(&frame.name.local_name);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }

    /// True if an event has been rejected since the last `start_document`
    pub fn is_rejected(&self) -> bool {
        self.rejected.is_some()
    }

    /// Reset the session to the initial state; derived states stay cached
    pub fn start_document(&mut self) {
        self.current = self.automaton.initial_state();
        self.frames.clear();
        self.buffer.reset();
        self.rejected = None;
    }

    /// Open an element.
    ///
    /// `attributes` are `(namespace URI, local name, value)` triples; namespace
    /// declarations among them are ignored. `scope` holds the prefix bindings in
    /// effect on the element.
    pub fn start_element<'a, I>(&mut self, uri: &str, local: &str, attributes: I, scope: NamespaceScope) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        self.ensure_active()?;
        let limits = self.schema().limits();
        limits.check_xml_depth(self.frames.len() + 1)?;

        if self.buffer.ignorable {
            self.buffer.reset();
        } else {
            self.process_text()?;
        }

        let schema = self.schema();
        let name = schema.name_code_of(uri, local);
        let view = AttributeView::build(schema.names(), attributes, scope);
        limits.check_attributes(view.len())?;

        let next = self.automaton.start_element(self.current, name, &view);
        self.frames.push(Frame {
            name: QName::new(uri, local),
            attributes: view,
        });
        if next.is_empty() {
            let qname = QName::new(uri, local).to_string();
            return Err(self.reject("element not allowed here", RejectedEvent::StartElement(qname)));
        }
        self.current = next;
        Ok(())
    }

    /// Report character data; consecutive calls are coalesced
    pub fn characters(&mut self, text: &str) -> Result<()> {
        self.ensure_active()?;
        match self.automaton.text_sensitivity(self.current) {
            TextSensitivity::Ignorable => return Ok(()),
            TextSensitivity::WhitespaceOnly | TextSensitivity::Sensitive => self.buffer.text.push_str(text),
        }
        if self.buffer.ignorable && !is_whitespace_only(text) {
            self.buffer.ignorable = false;
        }
        Ok(())
    }

    /// Close the innermost open element
    pub fn end_element(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.process_text()?;

        let Some(frame) = self.frames.pop() else {
            return Err(self.reject("no element is open", RejectedEvent::EndElement(String::new())));
        };
        let parent = match self.frames.last() {
            Some(f) => &f.attributes,
            None => AttributeView::empty(),
        };
        let next = self.automaton.end_element(self.current, parent);
        if next.is_empty() {
            let name = frame.name.to_string();
            self.frames.push(frame);
            return Err(self.reject("element content is incomplete", RejectedEvent::EndElement(name)));
        }
        self.current = next;
        Ok(())
    }

    /// Finish the document; rejects a state that is not final
    pub fn end_document(&mut self) -> Result<()> {
        self.ensure_active()?;
        if !self.frames.is_empty() {
            return Err(self.reject("document ended inside an element", RejectedEvent::EndDocument));
        }
        if !self.automaton.is_final(self.current) {
            return Err(self.reject("document is incomplete", RejectedEvent::EndDocument));
        }
        debug!(states = self.automaton.len(), "document accepted");
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        match &self.rejected {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    /// Feed the buffered run to the current state
    fn process_text(&mut self) -> Result<()> {
        let result = match self.automaton.text_sensitivity(self.current) {
            TextSensitivity::WhitespaceOnly if !self.buffer.ignorable => {
                let text = std::mem::take(&mut self.buffer.text);
                Err(self.reject("text not allowed here", RejectedEvent::Text(text)))
            }
            TextSensitivity::WhitespaceOnly | TextSensitivity::Ignorable => Ok(()),
            TextSensitivity::Sensitive => {
                let attributes = match self.frames.last() {
                    Some(f) => &f.attributes,
                    None => AttributeView::empty(),
                };
                let next = self
                    .automaton
                    .text(self.current, &self.buffer.text, attributes.context(), attributes);
                if next.is_empty() {
                    let text = std::mem::take(&mut self.buffer.text);
                    Err(self.reject("invalid text", RejectedEvent::Text(text)))
                } else {
                    self.current = next;
                    Ok(())
                }
            }
        };
        self.buffer.reset();
        result
    }

    fn reject(&mut self, message: &str, event: RejectedEvent) -> Error {
        trace!(state = %self.automaton.display(self.current), "rejecting {}", event);
        let err = ValidationError::new(message)
            .with_event(event)
            .with_path(self.path());
        debug!(%err, "document rejected");
        self.current = StateRef::EMPTY;
        self.rejected = Some(err.clone());
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::NameSignature;
    use crate::datatypes::DatatypeRegistry;
    use crate::schema::SchemaWriter;

    const WS: TextSensitivity = TextSensitivity::WhitespaceOnly;
    const IGNORE: TextSensitivity = TextSensitivity::Ignorable;
    const TEXT: TextSensitivity = TextSensitivity::Sensitive;

    /// `<doc>` with token content "yes", then `<item/>` children forbidding text
    fn schema() -> Schema {
        let mut w = SchemaWriter::new(0);
        w.name("", "doc", 1).name("", "item", 2);
        let start = w.state(false, true, WS);
        let eps = w.state(true, true, IGNORE);
        let doc = w.state(false, true, TEXT);
        let items = w.state(true, true, WS);
        let token = w.datatype("", "token", &[]);
        let yes = w.value_literal("yes", &[]);
        w.element(start, NameSignature::exact(1), doc, eps);
        w.value(doc, token, yes, items);
        w.element(items, NameSignature::exact(2), eps, items);
        Schema::new(&w.finish().unwrap(), &DatatypeRegistry::new()).unwrap()
    }

    fn no_attributes() -> std::iter::Empty<(&'static str, &'static str, &'static str)> {
        std::iter::empty()
    }

    #[test]
    fn test_accepts_split_text() {
        let schema = schema();
        let mut v = schema.validator();
        v.start_document();
        v.start_element("", "doc", no_attributes(), NamespaceScope::new()).unwrap();
        v.characters("  y").unwrap();
        v.characters("es ").unwrap();
        v.start_element("", "item", no_attributes(), NamespaceScope::new()).unwrap();
        v.characters("\n  ").unwrap();
        v.end_element().unwrap();
        v.end_element().unwrap();
        v.end_document().unwrap();
        assert!(!v.is_rejected());
    }

    #[test]
    fn test_rejects_wrong_value_with_path() {
        let schema = schema();
        let mut v = schema.validator();
        v.start_element("", "doc", no_attributes(), NamespaceScope::new()).unwrap();
        v.characters("no").unwrap();
        let err = v.end_element().unwrap_err();
        match err {
            Error::Validation(e) => {
                assert_eq!(e.event, Some(RejectedEvent::Text("no".to_string())));
                assert_eq!(e.path.as_deref(), Some("/doc"));
            }
            other => panic!("unexpected error {other}"),
        }
        // stays rejected
        assert!(v.end_document().is_err());
        assert!(v.is_rejected());
    }

    #[test]
    fn test_rejects_text_in_whitespace_only_state() {
        let schema = schema();
        let mut v = schema.validator();
        v.start_element("", "doc", no_attributes(), NamespaceScope::new()).unwrap();
        v.characters("yes").unwrap();
        v.start_element("", "item", no_attributes(), NamespaceScope::new()).unwrap();
        v.end_element().unwrap();
        v.characters("stray").unwrap();
        assert!(v.end_element().is_err());
    }

    #[test]
    fn test_missing_content_rejected_at_end_document() {
        let schema = schema();
        let mut v = schema.validator();
        let err = v.end_document().unwrap_err();
        assert!(err.is_rejection());

        v.start_document();
        assert!(!v.is_rejected());
        assert!(v.start_element("", "item", no_attributes(), NamespaceScope::new()).is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut w = SchemaWriter::new(0);
        let s0 = w.state(true, true, WS);
        w.element(s0, NameSignature::new(0, 0), s0, s0);
        let limits = crate::limits::Limits {
            max_xml_depth: 2,
            ..Default::default()
        };
        let schema = Schema::with_limits(&w.finish().unwrap(), &DatatypeRegistry::new(), limits).unwrap();
        let mut v = schema.validator();
        v.start_element("", "a", no_attributes(), NamespaceScope::new()).unwrap();
        v.start_element("", "a", no_attributes(), NamespaceScope::new()).unwrap();
        let err = v
            .start_element("", "a", no_attributes(), NamespaceScope::new())
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }
}

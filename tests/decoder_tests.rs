//! Decoding encoded schemas: structure, sharing and malformed input

mod common;

use common::{decode, element_with_attribute, IGNORE, TEXT, WS};
use pretty_assertions::assert_eq;
use validatelet::automaton::{NameSignature, SingleId};
use validatelet::{DatatypeRegistry, EncodedSchema, Error, Schema, SchemaWriter};

fn decode_error(encoded: &EncodedSchema) -> Error {
    Schema::new(encoded, &DatatypeRegistry::with_xsd()).expect_err("schema should be rejected")
}

fn assert_malformed(encoded: &EncodedSchema, buffer: &str) {
    match decode_error(encoded) {
        Error::MalformedSchema(err) => assert_eq!(err.buffer, Some(buffer), "{}", err),
        other => panic!("expected a malformed schema error, got {other}"),
    }
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_fixture_structure() {
    let schema = decode(&element_with_attribute());
    assert_eq!(schema.states().len(), 6);

    let start = schema.state(SingleId(0));
    assert!(!start.is_final());
    assert!(start.is_persistent());
    assert_eq!(start.element().len(), 1);
    assert!(!start.is_expandable());

    let content = schema.state(SingleId(1));
    assert!(content.is_expandable());
    let att = content.att().iter().next().unwrap();
    assert_eq!(att.signature, NameSignature::exact(2));
    assert!(!att.repeated);
}

#[test]
fn test_name_resolution_fallbacks() {
    let mut w = SchemaWriter::new(99);
    w.name("urn:a", "x", 1).name("urn:a", "*", 2).name("", "x", 3);
    w.state(true, true, IGNORE);
    let schema = decode(&w.finish().unwrap());

    assert_eq!(schema.name_code_of("urn:a", "x"), 1);
    assert_eq!(schema.name_code_of("urn:a", "y"), 2);
    assert_eq!(schema.name_code_of("", "x"), 3);
    assert_eq!(schema.name_code_of("", "y"), 99);
    assert_eq!(schema.name_code_of("urn:b", "x"), 99);
}

#[test]
fn test_linked_state_inherits_transitions() {
    let mut w = SchemaWriter::new(0);
    let base = w.state(false, true, WS);
    let shared = w.state(true, true, WS);
    let other = w.state(false, true, WS);
    w.element(shared, NameSignature::exact(7), shared, shared);
    w.element(base, NameSignature::exact(1), shared, shared);
    w.element(other, NameSignature::exact(2), shared, shared);
    w.link(base, shared).link(other, shared);
    let schema = decode(&w.finish().unwrap());

    let codes = |id: u32| -> Vec<u32> {
        let mut codes: Vec<_> = schema
            .state(SingleId(id))
            .element()
            .iter()
            .map(|e| e.signature.test)
            .collect();
        codes.sort();
        codes
    };
    assert_eq!(codes(0), vec![1, 7]);
    assert_eq!(codes(1), vec![7]);
    assert_eq!(codes(2), vec![2, 7]);

    // the linked state's flags are not inherited
    assert!(!schema.state(SingleId(0)).is_final());
}

#[test]
fn test_value_literal_resolved_with_datatype() {
    let mut w = SchemaWriter::new(0);
    let s0 = w.state(false, true, TEXT);
    let eps = w.state(true, true, IGNORE);
    let int = w.datatype("http://www.w3.org/2001/XMLSchema-datatypes", "int", &[]);
    let lit = w.value_literal("not a number", &[]);
    w.value(s0, int, lit, eps);

    assert_malformed(&w.finish().unwrap(), "value");
}

#[test]
fn test_datatype_parameters_applied() {
    let mut w = SchemaWriter::new(0);
    w.state(true, true, IGNORE);
    w.datatype(
        "http://www.w3.org/2001/XMLSchema-datatypes",
        "string",
        &[("maxLength", "not-a-length")],
    );
    assert!(matches!(decode_error(&w.finish().unwrap()), Error::Datatype(_)));
}

#[test]
fn test_unresolvable_library() {
    let mut w = SchemaWriter::new(0);
    w.state(true, true, IGNORE);
    w.datatype("urn:example:types", "color", &[]);
    match decode_error(&w.finish().unwrap()) {
        Error::UnresolvableDatatypeLibrary(ns) => assert_eq!(ns, "urn:example:types"),
        other => panic!("unexpected error {other}"),
    }
}

// ============================================================================
// Malformed buffers
// ============================================================================

fn single_state() -> EncodedSchema {
    let mut w = SchemaWriter::new(0);
    w.state(true, true, IGNORE);
    w.finish().unwrap()
}

#[test]
fn test_truncated_header() {
    let mut encoded = single_state();
    encoded.states.pop();
    assert_malformed(&encoded, "states");
}

#[test]
fn test_no_states() {
    assert_malformed(&EncodedSchema::default(), "states");
}

#[test]
fn test_offset_past_buffer() {
    let mut encoded = single_state();
    // element offset of state 0
    encoded.states[4] = 6;
    assert_malformed(&encoded, "states");
}

#[test]
fn test_state_index_out_of_range() {
    let mut encoded = single_state();
    encoded.element = vec![0, 4, 0xFFFF, 0xFFFF, 1, 0];
    assert_malformed(&encoded, "element");
}

#[test]
fn test_absence_record_overrun() {
    let mut encoded = single_state();
    encoded.no_att = vec![0, 0x0002, 0, 0, 0, 0];
    assert_malformed(&encoded, "no_att");
}

#[test]
fn test_unterminated_name_literal() {
    let mut encoded = single_state();
    encoded.name_literals = vec![1, 0, 'a' as u16];
    assert_malformed(&encoded, "name");
}

#[test]
fn test_linked_next_cycle() {
    let mut w = SchemaWriter::new(0);
    let a = w.state(false, true, WS);
    let b = w.state(false, true, WS);
    w.link(a, b).link(b, a);
    assert_malformed(&w.finish().unwrap(), "states");
}

#[test]
fn test_transient_expansion_cycle() {
    // two non-persistent states that only reach each other through absence transitions
    let mut w = SchemaWriter::new(0);
    let s0 = w.state(false, false, WS);
    let s1 = w.state(false, false, WS);
    w.no_attribute(s0, s1, &[], &[]).no_attribute(s1, s0, &[], &[]);
    assert_malformed(&w.finish().unwrap(), "states");
}

#[test]
fn test_persistent_expansion_loop_is_accepted() {
    let mut w = SchemaWriter::new(0);
    let s0 = w.state(true, true, WS);
    let s1 = w.state(false, false, WS);
    w.no_attribute(s0, s1, &[], &[]).no_attribute(s1, s0, &[], &[]);
    let schema = decode(&w.finish().unwrap());

    let mut a = schema.automaton();
    let s0 = a.single(SingleId(0));
    let expanded = a.expand(s0, validatelet::AttributeView::empty());
    assert_eq!(expanded, s0);
}

#[test]
fn test_bad_json() {
    assert!(matches!(
        Schema::from_json("{ \"states\": [1, 2", &DatatypeRegistry::new()),
        Err(Error::Json(_))
    ));
}

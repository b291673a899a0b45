//! Shared schema fixtures for integration tests

#![allow(dead_code)]

use validatelet::automaton::NameSignature;
use validatelet::{DatatypeRegistry, EncodedSchema, Schema, SchemaWriter, TextSensitivity};

pub const WS: TextSensitivity = TextSensitivity::WhitespaceOnly;
pub const IGNORE: TextSensitivity = TextSensitivity::Ignorable;
pub const TEXT: TextSensitivity = TextSensitivity::Sensitive;

pub const CODE_A: u32 = 1;
pub const CODE_X: u32 = 2;
pub const CODE_B: u32 = 3;

/// `element a { attribute x { text } }`
///
/// Names: `a` = 1, `x` = 2, `b` = 3, anything else = 0.
pub fn element_with_attribute() -> EncodedSchema {
    let mut w = SchemaWriter::new(0);
    w.name("", "a", CODE_A).name("", "x", CODE_X).name("", "b", CODE_B);

    let start = w.state(false, true, WS);
    let content = w.state(false, false, WS);
    let value = w.state(false, true, TEXT);
    let eps = w.state(true, true, IGNORE);
    let null = w.state(false, true, IGNORE);
    let empty = w.state(true, true, WS);
    let string = w.datatype("", "string", &[]);

    w.element(start, NameSignature::exact(CODE_A), content, eps);
    w.attribute(content, NameSignature::exact(CODE_X), false, value, empty);
    w.data(value, string, null, eps);

    w.finish().expect("fixture schema")
}

/// `element doc { element left { text } & element right { empty } }`
///
/// Text of the interleave is routed to the left branch, whose states are text
/// sensitive, so the join is reached by the empty run sent when `doc` closes.
///
/// Names: `doc` = 1, `left` = 2, `right` = 3.
pub fn interleaved_children() -> EncodedSchema {
    let mut w = SchemaWriter::new(0);
    w.name("", "doc", 1).name("", "left", 2).name("", "right", 3);

    let start = w.state(false, true, WS);
    let eps = w.state(true, true, IGNORE);
    let split = w.state(false, false, WS);
    let left = w.state(false, true, TEXT);
    let left_done = w.state(true, true, TEXT);
    let right = w.state(false, true, WS);
    let right_done = w.state(true, true, WS);
    let joined = w.state(true, false, WS);
    let any_text = w.state(true, true, IGNORE);

    w.element(start, NameSignature::exact(1), split, eps);
    w.interleave(split, left, right, joined, true);
    w.element(left, NameSignature::exact(2), any_text, left_done);
    w.element(right, NameSignature::exact(3), eps, right_done);

    w.finish().expect("fixture schema")
}

pub fn decode(encoded: &EncodedSchema) -> Schema {
    Schema::new(encoded, &DatatypeRegistry::with_xsd()).expect("fixture decodes")
}

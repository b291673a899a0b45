//! Property-based tests for the state algebra.
//!
//! Uses proptest to check that the derivative operations keep their algebraic
//! laws for arbitrary attribute sets, event sequences and token lists.

mod common;

use common::{decode, IGNORE, TEXT, WS};
use proptest::prelude::*;
use validatelet::automaton::{NameSignature, SingleId};
use validatelet::{AttributeView, NamespaceScope, Schema, SchemaWriter, StateRef};

/// A self-referential grammar exercising every expandable transition family:
///
/// - state 0: absence of everything but code 1, attribute 1, an interleave and
///   an element loop back to itself
/// - state 1: text loop, plus an absence transition back to itself
/// - state 2: element 2 loop
fn recursive_schema() -> Schema {
    let mut w = SchemaWriter::new(0);
    let s0 = w.state(false, true, WS);
    let s1 = w.state(false, true, TEXT);
    let s2 = w.state(false, true, WS);
    let eps = w.state(true, true, IGNORE);
    let val = w.state(false, true, TEXT);
    let null = w.state(false, true, IGNORE);
    let string = w.datatype("", "string", &[]);

    w.no_attribute(s0, s1, &[NameSignature::new(0, 0)], &[NameSignature::exact(1)]);
    w.attribute(s0, NameSignature::exact(1), false, val, s2);
    w.interleave(s0, s1, s2, eps, true);
    w.element(s0, NameSignature::new(0, 0), s0, s0);

    w.data(s1, string, null, s1);
    w.no_attribute(s1, s1, &[], &[]);

    w.element(s2, NameSignature::exact(2), eps, s2);
    w.data(val, string, null, eps);

    decode(&w.finish().unwrap())
}

fn attributes() -> impl Strategy<Value = Vec<(u32, String)>> {
    prop::collection::vec((0u32..4, "[a-z]{0,3}"), 0..4)
}

fn view(attrs: &[(u32, String)]) -> AttributeView {
    let mut view = AttributeView::new(NamespaceScope::new());
    for (code, value) in attrs {
        view.push(*code, value.as_str());
    }
    view
}

#[derive(Debug, Clone)]
enum Event {
    Start(u32),
    Text(String),
    End,
}

fn events() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(
        prop_oneof![
            (0u32..4).prop_map(Event::Start),
            "[ a-z]{0,4}".prop_map(Event::Text),
            Just(Event::End),
        ],
        0..12,
    )
}

// =============================================================================
// Expansion
// =============================================================================

proptest! {
    /// expand(expand(s)) is the very same state as expand(s)
    #[test]
    fn prop_expand_idempotent(attrs in attributes()) {
        let schema = recursive_schema();
        let mut a = schema.automaton();
        let view = view(&attrs);

        let s0 = a.single(SingleId(0));
        let once = a.expand(s0, &view);
        let twice = a.expand(once, &view);
        prop_assert_eq!(twice, once, "{} became {}", a.display(once), a.display(twice));
    }

    /// A persistent state survives its own expansion
    #[test]
    fn prop_persistent_state_in_own_expansion(attrs in attributes(), id in 0u32..3) {
        let schema = recursive_schema();
        let mut a = schema.automaton();
        let view = view(&attrs);

        let s = a.single(SingleId(id));
        let expanded = a.expand(s, &view);
        prop_assert!(a.contains(expanded, s));
    }

    /// A non-repeated attribute transition needs exactly one match, a repeated one
    /// at least one; a named attribute with a bad value blocks both
    #[test]
    fn prop_attribute_cardinality(
        named in prop::collection::vec(any::<bool>(), 0..4),
        others in 0usize..3,
        repeated: bool,
    ) {
        let mut w = SchemaWriter::new(0);
        let s0 = w.state(false, false, WS);
        let eps = w.state(true, true, IGNORE);
        let val = w.state(false, true, TEXT);
        let string = w.datatype("", "string", &[]);
        let good = w.value_literal("v", &[]);
        // codes 0x10..=0x1F, value must be "v"
        w.attribute(s0, NameSignature::new(0xF0, 0x10), repeated, val, eps);
        w.value(val, string, good, eps);
        let schema = decode(&w.finish().unwrap());

        let mut attrs: Vec<(u32, String)> = named
            .iter()
            .enumerate()
            .map(|(i, &ok)| (0x10 + i as u32, if ok { "v" } else { "w" }.to_string()))
            .collect();
        // attributes outside the signature never count, whatever their value
        attrs.extend((0..others).map(|i| (0x20 + i as u32, "w".to_string())));

        let mut a = schema.automaton();
        let s0 = a.single(SingleId(0));
        let expanded = a.expand(s0, &view(&attrs));

        let matched = named.iter().filter(|&&ok| ok).count();
        let failed = named.len() - matched;
        let expected = failed == 0 && if repeated { matched >= 1 } else { matched == 1 };
        prop_assert_eq!(a.is_final(expanded), expected);
    }
}

// =============================================================================
// Empty absorbs
// =============================================================================

proptest! {
    /// Every event maps the failure state to itself
    #[test]
    fn prop_empty_absorbs_events(events in events()) {
        let schema = recursive_schema();
        let mut a = schema.automaton();
        let scope = NamespaceScope::new();
        let empty = AttributeView::empty();

        let mut state = StateRef::EMPTY;
        for event in &events {
            state = match event {
                Event::Start(code) => a.start_element(state, *code, empty),
                Event::Text(text) => a.text(state, text, &scope, empty),
                Event::End => a.end_element(state, empty),
            };
            prop_assert!(state.is_empty());
        }
    }

    /// Choice with the failure state on either side is the identity
    #[test]
    fn prop_choice_identity(attrs in attributes(), code in 0u32..4) {
        let schema = recursive_schema();
        let mut a = schema.automaton();
        let view = view(&attrs);

        let s0 = a.single(SingleId(0));
        let expanded = a.expand(s0, &view);
        let derived = a.start_element(expanded, code, &view);

        prop_assert_eq!(a.choice(derived, StateRef::EMPTY), derived);
        for leaf in a.leaves(derived) {
            prop_assert_eq!(a.choice(StateRef::EMPTY, leaf), leaf);
        }
    }
}

// =============================================================================
// Lists
// =============================================================================

proptest! {
    /// A list is fed its tokens one by one, whatever white space separates them
    #[test]
    fn prop_list_tokenization(
        tokens in prop::collection::vec("[a-z]{1,4}", 1..5),
        separators in prop::collection::vec("[ \t\r\n]{1,3}", 5),
        padding in "[ \n]{0,2}",
    ) {
        let mut w = SchemaWriter::new(0);
        let list = w.state(false, true, TEXT);
        let eps = w.state(true, true, IGNORE);
        let string = w.datatype("", "string", &[]);
        let items: Vec<u16> = (0..=tokens.len())
            .map(|i| w.state(i == tokens.len(), false, TEXT))
            .collect();
        for (i, token) in tokens.iter().enumerate() {
            let literal = w.value_literal(token, &[]);
            w.value(items[i], string, literal, items[i + 1]);
        }
        w.list(list, items[0], eps);
        let schema = decode(&w.finish().unwrap());

        let mut text = padding.clone();
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                text.push_str(&separators[i - 1]);
            }
            text.push_str(token);
        }
        text.push_str(&padding);

        let scope = NamespaceScope::new();
        let mut a = schema.automaton();
        let start = a.single(SingleId(0));
        let accepted = a.text(start, &text, &scope, AttributeView::empty());
        prop_assert!(a.is_final(accepted), "{:?} rejected", text);

        // one token short
        let truncated = tokens[..tokens.len() - 1].join(" ");
        let rejected = a.text(start, &truncated, &scope, AttributeView::empty());
        prop_assert!(!a.is_final(rejected));
    }
}

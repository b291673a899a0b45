//! Derivative operations
//!
//! Every operation folds its result into an accumulator through
//! [`Automaton::choice`], so a derivative over a choice is simply the
//! derivatives of its alternatives threaded left to right. Choice trees are
//! walked iteratively with [`Automaton::leaves`].
//!
//! Calls that the algebra never produces (closing an element on a bare
//! compiled state, for instance) indicate a corrupted state graph and panic.

use super::state::{Automaton, State, StateRef};
use super::transitions::{AttTransition, InterleaveId, SingleId};
use crate::attributes::AttributeView;
use crate::datatypes::{is_whitespace_only, tokens, ValidationContext};
use crate::names::NameCode;
use tracing::trace;

impl<'s> Automaton<'s> {
    /// Derivative by an element start tag.
    ///
    /// The content of the new element is already expanded with `attributes`.
    pub fn start_element(&mut self, state: StateRef, name: NameCode, attributes: &AttributeView) -> StateRef {
        if attributes.is_empty() {
            if let Some(&cached) = self.start_cache.get(&(state, name)) {
                return cached;
            }
        }

        let result = self.derive_start(state, name, attributes, StateRef::EMPTY);
        if attributes.is_empty() {
            self.start_cache.insert((state, name), result);
        }

        trace!(name, from = %self.display(state), to = %self.display(result), "start element");
        result
    }

    /// Derivative by an element end tag.
    ///
    /// `parent_attributes` are those of the element that becomes current again.
    pub fn end_element(&mut self, state: StateRef, parent_attributes: &AttributeView) -> StateRef {
        if parent_attributes.is_empty() {
            if let Some(&cached) = self.end_cache.get(&state) {
                return cached;
            }
        }

        let result = self.derive_end(state, parent_attributes, StateRef::EMPTY);
        if parent_attributes.is_empty() {
            self.end_cache.insert(state, result);
        }

        trace!(from = %self.display(state), to = %self.display(result), "end element");
        result
    }

    /// Derivative by a run of character data
    pub fn text(
        &mut self,
        state: StateRef,
        value: &str,
        context: &dyn ValidationContext,
        attributes: &AttributeView,
    ) -> StateRef {
        let ignorable = is_whitespace_only(value);
        let result = self.derive_text(state, value, ignorable, context, attributes, StateRef::EMPTY);
        trace!(from = %self.display(state), to = %self.display(result), "text");
        result
    }

    /// Epsilon-closure under the attributes of the current element
    pub fn expand(&mut self, state: StateRef, attributes: &AttributeView) -> StateRef {
        self.derive_expand(state, attributes, StateRef::EMPTY)
    }

    /// `expand` when the state can expand; otherwise just its union with `acc`
    pub fn expand_fast(&mut self, state: StateRef, attributes: &AttributeView, acc: StateRef) -> StateRef {
        if self.is_expandable(state) {
            return self.derive_expand(state, attributes, acc);
        }
        self.leaves(state)
            .into_iter()
            .fold(acc, |acc, leaf| self.choice(acc, leaf))
    }

    fn derive_start(
        &mut self,
        state: StateRef,
        name: NameCode,
        attributes: &AttributeView,
        mut acc: StateRef,
    ) -> StateRef {
        for leaf in self.leaves(state) {
            acc = match self.state(leaf) {
                State::Empty => acc,
                State::Single(id) => self.start_single(id, name, attributes, acc),
                State::After { child, then } => {
                    let derived = self.derive_start(child, name, attributes, StateRef::EMPTY);
                    self.wrap_after_by_after(derived, then, acc)
                }
                State::Interleave { lhs, rhs, alphabet } => {
                    let l = self.derive_start(lhs, name, attributes, StateRef::EMPTY);
                    let r = self.derive_start(rhs, name, attributes, StateRef::EMPTY);
                    let acc = self.wrap_after_by_interleave_left(r, lhs, alphabet, acc);
                    self.wrap_after_by_interleave_right(l, rhs, alphabet, acc)
                }
                State::Choice(..) => unreachable!("leaves are never choices"),
            };
        }
        acc
    }

    fn start_single(
        &mut self,
        id: SingleId,
        name: NameCode,
        attributes: &AttributeView,
        mut acc: StateRef,
    ) -> StateRef {
        let schema = self.schema();
        for transition in schema.state(id).element().matching(name) {
            let content = self.content_head(transition.left, attributes);
            let right = self.single(transition.right);
            let after = self.after(content, right);
            acc = self.choice(acc, after);
        }
        acc
    }

    /// Expanded content model of a child element
    fn content_head(&mut self, left: SingleId, attributes: &AttributeView) -> StateRef {
        if !attributes.is_empty() {
            let head = self.single(left);
            return self.derive_expand(head, attributes, StateRef::EMPTY);
        }
        if let Some(&cached) = self.content_heads.get(&left) {
            return cached;
        }
        let head = self.single(left);
        let expanded = self.derive_expand(head, attributes, StateRef::EMPTY);
        self.content_heads.insert(left, expanded);
        expanded
    }

    fn derive_end(&mut self, state: StateRef, attributes: &AttributeView, mut acc: StateRef) -> StateRef {
        for leaf in self.leaves(state) {
            acc = match self.state(leaf) {
                State::Empty => acc,
                State::After { child, then } => {
                    if self.is_final(child) {
                        self.expand_fast(then, attributes, acc)
                    } else {
                        acc
                    }
                }
                State::Single(_) | State::Interleave { .. } => {
                    panic!("end element reached {} outside of any element", self.display(leaf))
                }
                State::Choice(..) => unreachable!("leaves are never choices"),
            };
        }
        acc
    }

    fn derive_expand(&mut self, state: StateRef, attributes: &AttributeView, mut acc: StateRef) -> StateRef {
        for leaf in self.leaves(state) {
            acc = match self.state(leaf) {
                State::Empty => acc,
                State::Single(id) => self.expand_single(id, leaf, attributes, acc),
                State::After { child, then } => {
                    // `then` is expanded when the element closes, with the parent's attributes
                    let expanded = self.derive_expand(child, attributes, StateRef::EMPTY);
                    let after = self.after(expanded, then);
                    self.choice(acc, after)
                }
                State::Interleave { lhs, rhs, alphabet } => {
                    let l = self.derive_expand(lhs, attributes, StateRef::EMPTY);
                    let r = self.derive_expand(rhs, attributes, StateRef::EMPTY);
                    let interleave = self.interleave(l, r, alphabet);
                    self.choice(acc, interleave)
                }
                State::Choice(..) => unreachable!("leaves are never choices"),
            };
        }
        acc
    }

    fn expand_single(
        &mut self,
        id: SingleId,
        handle: StateRef,
        attributes: &AttributeView,
        mut acc: StateRef,
    ) -> StateRef {
        if self.contains(acc, handle) {
            return acc;
        }

        let schema = self.schema();
        let single = schema.state(id);
        if single.is_persistent() {
            acc = self.choice(acc, handle);
        }

        if !attributes.is_empty() {
            for transition in single.att() {
                if self.attribute_matches(transition, attributes) {
                    let right = self.single(transition.right);
                    acc = self.expand_fast(right, attributes, acc);
                }
            }
        }

        for transition in single.no_att() {
            if transition.accepts(attributes) {
                let right = self.single(transition.right);
                acc = self.expand_fast(right, attributes, acc);
            }
        }

        for transition in single.interleave() {
            let left = self.single(transition.left);
            let left = self.expand_fast(left, attributes, StateRef::EMPTY);
            let right = self.single(transition.right);
            let right = self.expand_fast(right, attributes, StateRef::EMPTY);
            let interleave = self.interleave(left, right, transition.id);
            acc = self.choice(acc, interleave);
        }

        acc
    }

    /// Count the attributes the transition names; each either satisfies the
    /// value pattern (match) or not (fail)
    fn attribute_matches(&mut self, transition: &AttTransition, attributes: &AttributeView) -> bool {
        let mut matched = 0;
        let mut failed = 0;

        for attribute in attributes.iter() {
            if !transition.signature.accepts(attribute.name) {
                continue;
            }
            let left = self.single(transition.left);
            let derived = self.derive_text(
                left,
                &attribute.value,
                is_whitespace_only(&attribute.value),
                attributes.context(),
                AttributeView::empty(),
                StateRef::EMPTY,
            );
            if self.is_final(derived) {
                matched += 1;
            } else {
                failed += 1;
            }
        }

        if transition.repeated {
            matched > 0 && failed == 0
        } else {
            matched == 1 && failed == 0
        }
    }

    fn derive_text(
        &mut self,
        state: StateRef,
        value: &str,
        ignorable: bool,
        context: &dyn ValidationContext,
        attributes: &AttributeView,
        mut acc: StateRef,
    ) -> StateRef {
        for leaf in self.leaves(state) {
            acc = match self.state(leaf) {
                State::Empty => acc,
                State::Single(id) => self.text_single(id, leaf, value, ignorable, context, attributes, acc),
                State::After { child, then } => {
                    let derived = self.derive_text(child, value, ignorable, context, attributes, StateRef::EMPTY);
                    let after = self.after(derived, then);
                    self.choice(acc, after)
                }
                State::Interleave { lhs, rhs, alphabet } => {
                    let split = *self.schema().interleave(alphabet);
                    let rebuilt = if split.text_to_left {
                        let l = self.derive_text(lhs, value, ignorable, context, attributes, StateRef::EMPTY);
                        self.interleave(l, rhs, alphabet)
                    } else {
                        let r = self.derive_text(rhs, value, ignorable, context, attributes, StateRef::EMPTY);
                        self.interleave(lhs, r, alphabet)
                    };

                    let mut acc = self.choice(acc, rebuilt);
                    if let State::Interleave { lhs, rhs, .. } = self.state(rebuilt) {
                        if self.is_final(lhs) && self.is_final(rhs) {
                            let join = self.single(split.join);
                            acc = self.expand_fast(join, attributes, acc);
                        }
                    }
                    acc
                }
                State::Choice(..) => unreachable!("leaves are never choices"),
            };
        }
        acc
    }

    #[allow(clippy::too_many_arguments)]
    fn text_single(
        &mut self,
        id: SingleId,
        handle: StateRef,
        value: &str,
        ignorable: bool,
        context: &dyn ValidationContext,
        attributes: &AttributeView,
        mut acc: StateRef,
    ) -> StateRef {
        if ignorable {
            acc = self.choice(acc, handle);
        }

        let schema = self.schema();
        let single = schema.state(id);

        for transition in single.data() {
            if !transition.datatype.is_valid(value, context) {
                continue;
            }
            // the except pattern must not accept the same text
            let except = self.single(transition.left);
            let excluded = self.derive_text(
                except,
                value,
                ignorable,
                context,
                AttributeView::empty(),
                StateRef::EMPTY,
            );
            if !self.is_final(excluded) {
                let right = self.single(transition.right);
                acc = self.expand_fast(right, attributes, acc);
            }
        }

        for transition in single.value() {
            if transition.accepts(value, context) {
                let right = self.single(transition.right);
                acc = self.expand_fast(right, attributes, acc);
            }
        }

        for transition in single.list() {
            let mut item = self.single(transition.left);
            for token in tokens(value) {
                item = self.derive_text(item, token, false, context, AttributeView::empty(), StateRef::EMPTY);
                if item.is_empty() {
                    break;
                }
            }
            if self.is_final(item) {
                let right = self.single(transition.right);
                acc = self.expand_fast(right, attributes, acc);
            }
        }

        acc
    }

    fn wrap_after_by_after(&mut self, state: StateRef, new_then: StateRef, mut acc: StateRef) -> StateRef {
        for leaf in self.leaves(state) {
            acc = match self.state(leaf) {
                State::Empty => acc,
                State::After { child, then } => {
                    let then = self.after(then, new_then);
                    let after = self.after(child, then);
                    self.choice(acc, after)
                }
                _ => panic!("cannot re-attach {} as an element derivative", self.display(leaf)),
            };
        }
        acc
    }

    fn wrap_after_by_interleave_left(
        &mut self,
        state: StateRef,
        lhs: StateRef,
        alphabet: InterleaveId,
        mut acc: StateRef,
    ) -> StateRef {
        for leaf in self.leaves(state) {
            acc = match self.state(leaf) {
                State::Empty => acc,
                State::After { child, then } => {
                    let then = self.interleave(lhs, then, alphabet);
                    let after = self.after(child, then);
                    self.choice(acc, after)
                }
                _ => panic!("cannot re-attach {} as an element derivative", self.display(leaf)),
            };
        }
        acc
    }

    fn wrap_after_by_interleave_right(
        &mut self,
        state: StateRef,
        rhs: StateRef,
        alphabet: InterleaveId,
        mut acc: StateRef,
    ) -> StateRef {
        for leaf in self.leaves(state) {
            acc = match self.state(leaf) {
                State::Empty => acc,
                State::After { child, then } => {
                    let then = self.interleave(then, rhs, alphabet);
                    let after = self.after(child, then);
                    self.choice(acc, after)
                }
                _ => panic!("cannot re-attach {} as an element derivative", self.display(leaf)),
            };
        }
        acc
    }
}

//! Derived states and the per-run arena that interns them

use super::transitions::{InterleaveId, SingleId};
use super::TextSensitivity;
use crate::names::NameCode;
use crate::schema::Schema;
use std::collections::HashMap;
use std::fmt;

/// Handle to a state interned in an [`Automaton`].
///
/// Handles are only meaningful for the automaton that produced them. Interning
/// makes handle equality coincide with structural equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateRef(u32);

impl StateRef {
    /// The failure state
    pub const EMPTY: StateRef = StateRef(0);

    /// True for the failure state
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A derived state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Nothing can match any more
    Empty,
    /// A compiled state
    Single(SingleId),
    /// Either branch; the right operand is never itself a choice
    Choice(StateRef, StateRef),
    /// `child` must finish before the enclosing element closes into `then`
    After {
        /// Content of the open element
        child: StateRef,
        /// Continuation after the element closes
        then: StateRef,
    },
    /// Both branches active at once
    Interleave {
        /// Left branch
        lhs: StateRef,
        /// Right branch
        rhs: StateRef,
        /// Split this interleave came from (text routing and join)
        alphabet: InterleaveId,
    },
}

#[derive(Debug, Clone, Copy)]
struct Node {
    state: State,
    is_final: bool,
    expandable: bool,
    text_sensitivity: TextSensitivity,
}

/// Arena of derived states for one validation run.
///
/// The schema is shared and read-only; everything created while validating a
/// document lives here and is dropped with it.
pub struct Automaton<'s> {
    schema: &'s Schema,
    nodes: Vec<Node>,
    memo: HashMap<State, StateRef>,
    pub(super) content_heads: HashMap<SingleId, StateRef>,
    pub(super) end_cache: HashMap<StateRef, StateRef>,
    pub(super) start_cache: HashMap<(StateRef, NameCode), StateRef>,
}

impl<'s> Automaton<'s> {
    /// Create an arena holding only the failure state
    pub fn new(schema: &'s Schema) -> Self {
        let empty = Node {
            state: State::Empty,
            is_final: false,
            expandable: true,
            text_sensitivity: TextSensitivity::Ignorable,
        };
        let mut memo = HashMap::new();
        memo.insert(State::Empty, StateRef::EMPTY);

        Self {
            schema,
            nodes: vec![empty],
            memo,
            content_heads: HashMap::new(),
            end_cache: HashMap::new(),
            start_cache: HashMap::new(),
        }
    }

    /// Schema this run validates against
    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Number of interned states, the failure state included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the failure state is interned at creation
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, state: StateRef) -> &Node {
        &self.nodes[state.index()]
    }

    /// The structure behind a handle
    pub fn state(&self, state: StateRef) -> State {
        self.node(state).state
    }

    /// True if the state accepts the end of the current content
    pub fn is_final(&self, state: StateRef) -> bool {
        self.node(state).is_final
    }

    /// True if expanding the state may produce anything other than the state itself
    pub fn is_expandable(&self, state: StateRef) -> bool {
        self.node(state).expandable
    }

    /// How the state reacts to character data
    pub fn text_sensitivity(&self, state: StateRef) -> TextSensitivity {
        self.node(state).text_sensitivity
    }

    fn intern(&mut self, state: State) -> StateRef {
        if let Some(&found) = self.memo.get(&state) {
            return found;
        }

        let node = match state {
            State::Empty => unreachable!("the failure state is interned at creation"),
            State::Single(id) => {
                let single = self.schema.state(id);
                Node {
                    state,
                    is_final: single.is_final(),
                    expandable: single.is_expandable(),
                    text_sensitivity: single.text_sensitivity(),
                }
            }
            State::Choice(lhs, rhs) => {
                let (l, r) = (*self.node(lhs), *self.node(rhs));
                Node {
                    state,
                    is_final: l.is_final || r.is_final,
                    expandable: l.expandable || r.expandable,
                    text_sensitivity: l.text_sensitivity.union(r.text_sensitivity),
                }
            }
            State::After { child, .. } => {
                let c = *self.node(child);
                Node {
                    state,
                    is_final: c.is_final,
                    expandable: c.expandable,
                    text_sensitivity: c.text_sensitivity,
                }
            }
            State::Interleave { lhs, rhs, alphabet } => {
                let (l, r) = (*self.node(lhs), *self.node(rhs));
                let split = self.schema.interleave(alphabet);
                let join_final = self.schema.state(split.join).is_final();
                Node {
                    state,
                    is_final: l.is_final && r.is_final && join_final,
                    expandable: l.expandable || r.expandable,
                    text_sensitivity: if split.text_to_left {
                        l.text_sensitivity
                    } else {
                        r.text_sensitivity
                    },
                }
            }
        };

        let handle = StateRef(self.nodes.len() as u32);
        self.nodes.push(node);
        self.memo.insert(state, handle);
        handle
    }

    /// Handle of a compiled state
    pub fn single(&mut self, id: SingleId) -> StateRef {
        self.intern(State::Single(id))
    }

    /// Handle of the schema's initial state
    pub fn initial_state(&mut self) -> StateRef {
        let id = self.schema.initial_state();
        self.single(id)
    }

    /// Union of `block` and one more alternative.
    ///
    /// # Panics
    ///
    /// Panics if `alternative` is itself a choice.
    pub fn choice(&mut self, block: StateRef, alternative: StateRef) -> StateRef {
        if let State::Choice(..) = self.state(alternative) {
            panic!(
                "choice alternative {} must not be a choice",
                self.display(alternative)
            );
        }
        if block.is_empty() {
            return alternative;
        }
        if alternative.is_empty() || self.contains(block, alternative) {
            return block;
        }
        self.intern(State::Choice(block, alternative))
    }

    /// Sequencing; empty if either part is empty
    pub fn after(&mut self, child: StateRef, then: StateRef) -> StateRef {
        if child.is_empty() || then.is_empty() {
            return StateRef::EMPTY;
        }
        self.intern(State::After { child, then })
    }

    /// Interleaving; empty if either branch is empty
    pub fn interleave(&mut self, lhs: StateRef, rhs: StateRef, alphabet: InterleaveId) -> StateRef {
        if lhs.is_empty() || rhs.is_empty() {
            return StateRef::EMPTY;
        }
        self.intern(State::Interleave { lhs, rhs, alphabet })
    }

    /// Non-choice alternatives of a state, left to right
    pub fn leaves(&self, state: StateRef) -> Vec<StateRef> {
        let mut leaves = Vec::new();
        let mut stack = vec![state];
        while let Some(current) = stack.pop() {
            match self.state(current) {
                State::Choice(lhs, rhs) => {
                    stack.push(rhs);
                    stack.push(lhs);
                }
                _ => leaves.push(current),
            }
        }
        leaves
    }

    /// True if every alternative of `state` is already covered by `block`
    pub fn contains(&self, block: StateRef, state: StateRef) -> bool {
        if block == state {
            return true;
        }
        if let State::Choice(lhs, rhs) = self.state(state) {
            return self.contains(block, lhs) && self.contains(block, rhs);
        }

        let mut stack = vec![block];
        while let Some(current) = stack.pop() {
            if current == state {
                return true;
            }
            match (self.state(current), self.state(state)) {
                (State::Choice(lhs, rhs), _) => {
                    stack.push(rhs);
                    stack.push(lhs);
                }
                (State::After { child, then }, State::After { child: c2, then: t2 }) => {
                    if self.contains(child, c2) && self.contains(then, t2) && self.contains(t2, then) {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    /// Render a state for diagnostics
    pub fn display(&self, state: StateRef) -> DisplayState<'_, 's> {
        DisplayState {
            automaton: self,
            state,
        }
    }

    fn write_state(&self, f: &mut fmt::Formatter<'_>, state: StateRef, precedence: u8) -> fmt::Result {
        match self.state(state) {
            State::Empty => write!(f, "#err"),
            State::Single(id) => {
                let single = self.schema.state(id);
                if single.is_final() && single.has_no_transitions() {
                    write!(f, "#eps")
                } else {
                    write!(f, "{}", id)
                }
            }
            State::Choice(lhs, rhs) => {
                let parens = precedence > 2;
                if parens {
                    write!(f, "(")?;
                }
                self.write_state(f, lhs, 2)?;
                write!(f, "|")?;
                self.write_state(f, rhs, 2)?;
                if parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
            State::After { child, then } => {
                let parens = precedence > 1;
                if parens {
                    write!(f, "(")?;
                }
                self.write_state(f, child, 1)?;
                write!(f, " then ")?;
                self.write_state(f, then, 1)?;
                if parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
            State::Interleave { lhs, rhs, alphabet } => {
                let parens = precedence >= 2;
                if parens {
                    write!(f, "(")?;
                }
                self.write_state(f, lhs, 3)?;
                write!(f, "&")?;
                self.write_state(f, rhs, 3)?;
                write!(f, "->{}", self.schema.interleave(alphabet).join)?;
                if parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Automaton<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Automaton")
            .field("states", &self.nodes.len())
            .field("content_heads", &self.content_heads.len())
            .finish()
    }
}

/// [`fmt::Display`] adapter returned by [`Automaton::display`]
pub struct DisplayState<'a, 's> {
    automaton: &'a Automaton<'s>,
    state: StateRef,
}

impl fmt::Display for DisplayState<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.automaton.write_state(f, self.state, 0)
    }
}

//! The derivative automaton
//!
//! Compiled states ([`SingleState`]) live in the [`Schema`](crate::schema::Schema)
//! and never change. Validation works on derived states: combinations of
//! compiled states built by the derivative operations and interned in a
//! per-run [`Automaton`] arena.

pub mod derivatives;
pub mod state;
pub mod transitions;

pub use state::{Automaton, State, StateRef};
pub use transitions::{
    AttTransition, Chain, DataTransition, ElementTable, ElementTransition, InterleaveId,
    InterleaveTransition, ListTransition, NameSignature, NoAttTransition, SingleId, SingleState,
    ValueTransition,
};

use std::fmt;

/// How a state reacts to character data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextSensitivity {
    /// Only white space may appear
    WhitespaceOnly,
    /// Text never changes the state
    Ignorable,
    /// Text must be fed to the automaton
    Sensitive,
}

impl TextSensitivity {
    /// Decode the two-bit header field
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(TextSensitivity::WhitespaceOnly),
            1 => Some(TextSensitivity::Ignorable),
            2 => Some(TextSensitivity::Sensitive),
            _ => None,
        }
    }

    /// Encode as the two-bit header field
    pub fn bits(self) -> u16 {
        match self {
            TextSensitivity::WhitespaceOnly => 0,
            TextSensitivity::Ignorable => 1,
            TextSensitivity::Sensitive => 2,
        }
    }

    /// Sensitivity of a union of two states
    pub fn union(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            TextSensitivity::Sensitive
        }
    }
}

impl fmt::Display for TextSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TextSensitivity::WhitespaceOnly => "whitespace-only",
            TextSensitivity::Ignorable => "ignorable",
            TextSensitivity::Sensitive => "sensitive",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_sensitivity_bits() {
        for ts in [
            TextSensitivity::WhitespaceOnly,
            TextSensitivity::Ignorable,
            TextSensitivity::Sensitive,
        ] {
            assert_eq!(TextSensitivity::from_bits(ts.bits()), Some(ts));
        }
        assert_eq!(TextSensitivity::from_bits(3), None);
    }

    #[test]
    fn test_union() {
        use TextSensitivity::*;
        assert_eq!(Ignorable.union(Ignorable), Ignorable);
        assert_eq!(Ignorable.union(WhitespaceOnly), Sensitive);
        assert_eq!(Sensitive.union(Sensitive), Sensitive);
    }
}

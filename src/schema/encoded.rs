//! The encoded schema artifact
//!
//! A compiled grammar is a handful of flat 16-bit buffers plus the datatype
//! and literal descriptors they index into. On disk it is stored as JSON.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A datatype parameter (facet) with the prefix bindings in effect where it was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatatypeParameter {
    /// Parameter name
    pub name: String,
    /// Parameter value
    pub value: String,
    /// `(prefix, namespace URI)` pairs
    #[serde(default)]
    pub context: Vec<(String, String)>,
}

/// Reference to a datatype of some library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatatypeDescriptor {
    /// Library namespace; empty for the built-in library
    pub namespace_uri: String,
    /// Datatype name inside the library
    pub local_name: String,
    /// Parameters in declaration order
    #[serde(default)]
    pub parameters: Vec<DatatypeParameter>,
}

/// Literal of a `<value>` pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueDescriptor {
    /// Lexical form
    pub value: String,
    /// `(prefix, namespace URI)` pairs used to interpret the literal
    #[serde(default)]
    pub context: Vec<(String, String)>,
}

/// All buffers of a compiled grammar.
///
/// Every buffer is a sequence of 16-bit units; see the decoder for the layout
/// of each one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedSchema {
    /// Repeated `code(2) uri NUL local NUL`
    #[serde(default)]
    pub name_literals: Vec<u16>,
    /// Code of names absent from the literal table
    pub default_name_code: u32,
    /// State headers, nine units per state
    pub states: Vec<u16>,
    /// Attribute transitions
    #[serde(default)]
    pub att: Vec<u16>,
    /// Data transitions
    #[serde(default)]
    pub data: Vec<u16>,
    /// Element transitions
    #[serde(default)]
    pub element: Vec<u16>,
    /// Interleave transitions
    #[serde(default)]
    pub interleave: Vec<u16>,
    /// List transitions
    #[serde(default)]
    pub list: Vec<u16>,
    /// Attribute absence transitions
    #[serde(default)]
    pub no_att: Vec<u16>,
    /// Value transitions
    #[serde(default)]
    pub value: Vec<u16>,
    /// Datatypes referenced by data and value transitions
    #[serde(default)]
    pub datatypes: Vec<DatatypeDescriptor>,
    /// Literals referenced by value transitions
    #[serde(default)]
    pub value_literals: Vec<ValueDescriptor>,
}

impl EncodedSchema {
    /// Parse the JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load the JSON form from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Number of states described by the header buffer
    pub fn state_count(&self) -> usize {
        self.states.len() / super::decoder::STATE_STRIDE
    }
}

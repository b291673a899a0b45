//! RELAX NG built-in datatypes
//!
//! The empty namespace always resolves to this library, so schemas that use
//! only `string` and `token` load without any registered library.

use super::{
    collapse, DataValue, Datatype, DatatypeBuilder, DatatypeLibrary, ValidationContext,
};
use crate::error::{Error, Result};
use std::sync::Arc;

/// The two built-in datatypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinDatatype {
    /// Every string is valid; the value is the text itself
    String,
    /// Every string is valid; the value is the text with white space collapsed
    Token,
}

impl BuiltinDatatype {
    /// Look up a built-in datatype by local name
    pub fn from_name(local_name: &str) -> Option<Self> {
        match local_name {
            "string" => Some(BuiltinDatatype::String),
            "token" => Some(BuiltinDatatype::Token),
            _ => None,
        }
    }

    fn value_of(&self, text: &str) -> String {
        match self {
            BuiltinDatatype::String => text.to_string(),
            BuiltinDatatype::Token => collapse(text),
        }
    }
}

impl Datatype for BuiltinDatatype {
    fn is_valid(&self, _text: &str, _context: &dyn ValidationContext) -> bool {
        true
    }

    fn create_value(&self, text: &str, _context: &dyn ValidationContext) -> Option<DataValue> {
        Some(Box::new(self.value_of(text)))
    }

    fn same_value(&self, lhs: &DataValue, rhs: &DataValue) -> bool {
        match (lhs.downcast_ref::<String>(), rhs.downcast_ref::<String>()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

/// Library for the empty datatype namespace
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLibrary;

impl BuiltinLibrary {
    /// Create the built-in library
    pub fn new() -> Self {
        Self
    }
}

struct BuiltinBuilder(BuiltinDatatype);

impl DatatypeBuilder for BuiltinBuilder {
    fn add_parameter(&mut self, name: &str, _value: &str, _context: &dyn ValidationContext) -> Result<()> {
        Err(Error::Datatype(format!(
            "built-in datatypes take no parameters (got '{}')",
            name
        )))
    }

    fn create_datatype(self: Box<Self>) -> Result<Arc<dyn Datatype>> {
        Ok(Arc::new(self.0))
    }
}

impl DatatypeLibrary for BuiltinLibrary {
    fn create_datatype_builder(&self, local_name: &str) -> Result<Box<dyn DatatypeBuilder>> {
        BuiltinDatatype::from_name(local_name)
            .map(|dt| Box::new(BuiltinBuilder(dt)) as Box<dyn DatatypeBuilder>)
            .ok_or_else(|| Error::Datatype(format!("unknown built-in datatype '{}'", local_name)))
    }
}

//! Compiled schemas
//!
//! A [`Schema`] is the decoded, immutable state graph of one grammar. It is
//! built once from an [`EncodedSchema`] and then shared by any number of
//! validation runs, each of which owns its own [`Automaton`].

pub mod decoder;
pub mod encoded;
pub mod writer;

pub use encoded::{DatatypeDescriptor, DatatypeParameter, EncodedSchema, ValueDescriptor};
pub use writer::SchemaWriter;

use crate::automaton::{Automaton, InterleaveTransition, InterleaveId, SingleId, SingleState};
use crate::datatypes::DatatypeLibraryFactory;
use crate::error::Result;
use crate::limits::Limits;
use crate::names::{NameCode, NameResolver};
use crate::validator::Validator;
use std::path::Path;
use tracing::debug;

/// Decoded state graph of a grammar
#[derive(Debug)]
pub struct Schema {
    names: NameResolver,
    states: Vec<SingleState>,
    interleaves: Vec<InterleaveTransition>,
    limits: Limits,
}

impl Schema {
    /// Decode `encoded`, resolving datatype libraries through `factory`
    pub fn new(encoded: &EncodedSchema, factory: &dyn DatatypeLibraryFactory) -> Result<Self> {
        Self::with_limits(encoded, factory, Limits::default())
    }

    /// Decode with explicit resource limits; the limits also apply to validation runs
    pub fn with_limits(
        encoded: &EncodedSchema,
        factory: &dyn DatatypeLibraryFactory,
        limits: Limits,
    ) -> Result<Self> {
        limits.check_schema_states(encoded.state_count())?;

        let names = NameResolver::decode(&encoded.name_literals, encoded.default_name_code)?;
        let datatypes = decoder::create_datatypes(&encoded.datatypes, factory)?;
        let graph = decoder::decode(encoded, &datatypes)?;

        debug!(
            states = graph.states.len(),
            names = names.len(),
            "schema ready"
        );

        Ok(Self {
            names,
            states: graph.states,
            interleaves: graph.interleaves,
            limits,
        })
    }

    /// Parse the JSON artifact and decode it
    pub fn from_json(json: &str, factory: &dyn DatatypeLibraryFactory) -> Result<Self> {
        Self::new(&EncodedSchema::from_json(json)?, factory)
    }

    /// Load the JSON artifact from disk and decode it
    pub fn from_file(path: impl AsRef<Path>, factory: &dyn DatatypeLibraryFactory) -> Result<Self> {
        Self::new(&EncodedSchema::load(path)?, factory)
    }

    /// Name code for `(uri, local)`
    pub fn name_code_of(&self, uri: &str, local: &str) -> NameCode {
        self.names.resolve(uri, local)
    }

    /// The name dictionary
    pub fn names(&self) -> &NameResolver {
        &self.names
    }

    /// Limits applied to runs over this schema
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// The state validation starts from
    pub fn initial_state(&self) -> SingleId {
        SingleId(0)
    }

    /// A compiled state.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this schema.
    pub fn state(&self, id: SingleId) -> &SingleState {
        &self.states[id.index()]
    }

    /// All compiled states in index order
    pub fn states(&self) -> &[SingleState] {
        &self.states
    }

    /// Interleave transition identifying `id`
    pub fn interleave(&self, id: InterleaveId) -> &InterleaveTransition {
        &self.interleaves[id.index()]
    }

    /// Number of interleave transitions
    pub fn interleave_count(&self) -> usize {
        self.interleaves.len()
    }

    /// Fresh automaton for one validation run
    pub fn automaton(&self) -> Automaton<'_> {
        Automaton::new(self)
    }

    /// Fresh push validator for one document
    pub fn validator(&self) -> Validator<'_> {
        Validator::new(self)
    }
}

//! Programmatic construction of encoded schemas
//!
//! [`SchemaWriter`] produces the same buffers a grammar compiler would, which
//! makes it the convenient way to build small schemas in tests and tools.
//! Records may be added in any order; [`SchemaWriter::finish`] groups them by
//! state.

use super::decoder::{
    FLAG_FINAL, FLAG_PERSISTENT, NO_STATE, REPEATED, STATE_STRIDE, TEXT_TO_LEFT,
};
use super::encoded::{DatatypeDescriptor, DatatypeParameter, EncodedSchema, ValueDescriptor};
use crate::automaton::{NameSignature, TextSensitivity};
use crate::error::{DecodeError, Error, Result};
use crate::limits::MAX_ENCODED_STATES;
use crate::names::NameCode;

const UNSET: u16 = 0;

#[derive(Debug, Clone, Copy)]
struct StateDecl {
    is_final: bool,
    is_persistent: bool,
    text_sensitivity: TextSensitivity,
    next: u16,
}

/// Records of one family, tagged with the state that owns them
#[derive(Debug, Clone, Default)]
struct Records(Vec<(u16, Vec<u16>)>);

impl Records {
    fn add(&mut self, from: u16, record: Vec<u16>) {
        self.0.push((from, record));
    }

    /// Concatenate the records state by state and compute each state's offset
    fn layout(&self, state_count: usize) -> Result<(Vec<u16>, Vec<u16>)> {
        let mut sorted: Vec<_> = self.0.iter().collect();
        sorted.sort_by_key(|(from, _)| *from);

        let mut buffer = Vec::new();
        let mut offsets = Vec::with_capacity(state_count);
        let mut records = sorted.into_iter().peekable();
        for state in 0..state_count {
            offsets.push(unit(buffer.len(), "transition buffer")?);
            while let Some((_, record)) = records.next_if(|(from, _)| usize::from(*from) == state) {
                buffer.extend_from_slice(record);
            }
        }

        if let Some((from, _)) = records.next() {
            return Err(DecodeError::new(format!("transition recorded for undeclared state {}", from)).into());
        }
        Ok((buffer, offsets))
    }
}

fn unit(value: usize, what: &str) -> Result<u16> {
    u16::try_from(value)
        .ok()
        .filter(|v| *v != NO_STATE)
        .ok_or_else(|| Error::LimitExceeded(format!("{} does not fit in 16 bits", what)))
}

fn int(value: u32) -> [u16; 2] {
    [(value & 0xFFFF) as u16, (value >> 16) as u16]
}

fn signature(sig: NameSignature) -> [u16; 4] {
    let [m0, m1] = int(sig.mask);
    let [t0, t1] = int(sig.test);
    [m0, m1, t0, t1]
}

/// Builder for [`EncodedSchema`]
#[derive(Debug, Clone)]
pub struct SchemaWriter {
    default_name_code: NameCode,
    name_literals: Vec<u16>,
    states: Vec<StateDecl>,
    att: Records,
    data: Records,
    element: Records,
    interleave: Records,
    list: Records,
    no_att: Records,
    value: Records,
    datatypes: Vec<DatatypeDescriptor>,
    value_literals: Vec<ValueDescriptor>,
}

impl SchemaWriter {
    /// Create a writer; names without a literal resolve to `default_name_code`
    pub fn new(default_name_code: NameCode) -> Self {
        Self {
            default_name_code,
            name_literals: Vec::new(),
            states: Vec::new(),
            att: Records::default(),
            data: Records::default(),
            element: Records::default(),
            interleave: Records::default(),
            list: Records::default(),
            no_att: Records::default(),
            value: Records::default(),
            datatypes: Vec::new(),
            value_literals: Vec::new(),
        }
    }

    /// Map `(uri, local)` to `code`; `local` may be the `*` wildcard
    pub fn name(&mut self, uri: &str, local: &str, code: NameCode) -> &mut Self {
        self.name_literals.extend(int(code));
        for part in [uri, local] {
            self.name_literals.extend(part.encode_utf16());
            self.name_literals.push(0);
        }
        self
    }

    /// Declare a state; the first one declared is the initial state
    pub fn state(&mut self, is_final: bool, is_persistent: bool, text_sensitivity: TextSensitivity) -> u16 {
        let id = self.states.len() as u16;
        self.states.push(StateDecl {
            is_final,
            is_persistent,
            text_sensitivity,
            next: NO_STATE,
        });
        id
    }

    /// Let `state` continue with the transitions of `next`
    pub fn link(&mut self, state: u16, next: u16) -> &mut Self {
        if let Some(decl) = self.states.get_mut(usize::from(state)) {
            decl.next = next;
        }
        self
    }

    /// Child element transition
    pub fn element(&mut self, from: u16, sig: NameSignature, left: u16, right: u16) -> &mut Self {
        let mut record = vec![left, right];
        record.extend(signature(sig));
        self.element.add(from, record);
        self
    }

    /// Attribute presence transition
    pub fn attribute(&mut self, from: u16, sig: NameSignature, repeated: bool, left: u16, right: u16) -> &mut Self {
        let mut record = vec![left, right];
        record.extend(signature(sig));
        record.push(if repeated { REPEATED } else { UNSET });
        self.att.add(from, record);
        self
    }

    /// Data transition; `except` is the except pattern (a non-final state for none)
    pub fn data(&mut self, from: u16, datatype: u16, except: u16, right: u16) -> &mut Self {
        self.data.add(from, vec![except, right, datatype]);
        self
    }

    /// Value transition against a literal from [`SchemaWriter::value_literal`]
    pub fn value(&mut self, from: u16, datatype: u16, literal: u16, right: u16) -> &mut Self {
        self.value.add(from, vec![right, datatype, literal]);
        self
    }

    /// List transition
    pub fn list(&mut self, from: u16, left: u16, right: u16) -> &mut Self {
        self.list.add(from, vec![left, right]);
        self
    }

    /// Interleave split transition
    pub fn interleave(&mut self, from: u16, left: u16, right: u16, join: u16, text_to_left: bool) -> &mut Self {
        self.interleave.add(
            from,
            vec![left, right, join, if text_to_left { TEXT_TO_LEFT } else { UNSET }],
        );
        self
    }

    /// Attribute absence transition
    pub fn no_attribute(
        &mut self,
        from: u16,
        right: u16,
        negative: &[NameSignature],
        positive: &[NameSignature],
    ) -> &mut Self {
        let sizes = ((negative.len().min(0xFF) as u16) << 8) | positive.len().min(0xFF) as u16;
        let mut record = vec![right, sizes];
        for sig in negative.iter().take(0xFF).chain(positive.iter().take(0xFF)) {
            record.extend(signature(*sig));
        }
        self.no_att.add(from, record);
        self
    }

    /// Declare a datatype and return its index
    pub fn datatype(&mut self, namespace_uri: &str, local_name: &str, parameters: &[(&str, &str)]) -> u16 {
        self.datatypes.push(DatatypeDescriptor {
            namespace_uri: namespace_uri.to_string(),
            local_name: local_name.to_string(),
            parameters: parameters
                .iter()
                .map(|(name, value)| DatatypeParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    context: Vec::new(),
                })
                .collect(),
        });
        (self.datatypes.len() - 1) as u16
    }

    /// Declare a value literal with its `(prefix, uri)` bindings and return its index
    pub fn value_literal(&mut self, value: &str, context: &[(&str, &str)]) -> u16 {
        self.value_literals.push(ValueDescriptor {
            value: value.to_string(),
            context: context
                .iter()
                .map(|(p, u)| (p.to_string(), u.to_string()))
                .collect(),
        });
        (self.value_literals.len() - 1) as u16
    }

    /// Lay out the buffers
    pub fn finish(&self) -> Result<EncodedSchema> {
        let count = self.states.len();
        if count >= MAX_ENCODED_STATES {
            return Err(Error::LimitExceeded(format!("{} states", count)));
        }

        let (att, att_offsets) = self.att.layout(count)?;
        let (data, data_offsets) = self.data.layout(count)?;
        let (element, element_offsets) = self.element.layout(count)?;
        let (interleave, interleave_offsets) = self.interleave.layout(count)?;
        let (list, list_offsets) = self.list.layout(count)?;
        let (no_att, no_att_offsets) = self.no_att.layout(count)?;
        let (value, value_offsets) = self.value.layout(count)?;

        let mut states = Vec::with_capacity(count * STATE_STRIDE);
        for (i, decl) in self.states.iter().enumerate() {
            let mut flags = decl.text_sensitivity.bits() << 2;
            if decl.is_final {
                flags |= FLAG_FINAL;
            }
            if decl.is_persistent {
                flags |= FLAG_PERSISTENT;
            }
            states.extend([
                u16::from(b'0') + flags,
                decl.next,
                att_offsets[i],
                data_offsets[i],
                element_offsets[i],
                interleave_offsets[i],
                list_offsets[i],
                no_att_offsets[i],
                value_offsets[i],
            ]);
        }

        Ok(EncodedSchema {
            name_literals: self.name_literals.clone(),
            default_name_code: self.default_name_code,
            states,
            att,
            data,
            element,
            interleave,
            list,
            no_att,
            value,
            datatypes: self.datatypes.clone(),
            value_literals: self.value_literals.clone(),
        })
    }
}

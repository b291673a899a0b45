//! Decoder for the encoded state graph
//!
//! Buffer layouts (all values are 16-bit units, 32-bit integers are stored as
//! two units with the low unit first):
//!
//! | buffer       | stride   | record                                              |
//! |--------------|----------|-----------------------------------------------------|
//! | `states`     | 9        | flags, linked next, offsets into the seven families |
//! | `att`        | 7        | left, right, mask(2), test(2), `'R'` if repeated    |
//! | `data`       | 3        | left, right, datatype                               |
//! | `element`    | 6        | left, right, mask(2), test(2)                       |
//! | `interleave` | 4        | left, right, join, `'L'` if text goes left          |
//! | `list`       | 2        | left, right                                         |
//! | `no_att`     | variable | right, `neg << 8 \| pos`, neg + pos (mask, test)    |
//! | `value`      | 3        | right, datatype, value literal                      |
//!
//! The records of state `i` in a family run from its own offset to the offset
//! of state `i + 1` (the end of the buffer for the last state). A state's
//! chains continue with the chains of its linked-next state, so linked states
//! are decoded first.

use super::encoded::{DatatypeDescriptor, EncodedSchema, ValueDescriptor};
use crate::automaton::{
    AttTransition, Chain, DataTransition, ElementTable, ElementTransition, InterleaveId,
    InterleaveTransition, ListTransition, NameSignature, NoAttTransition, SingleId, SingleState,
    TextSensitivity, ValueTransition,
};
use crate::datatypes::{BuiltinLibrary, Datatype, DatatypeLibrary, DatatypeLibraryFactory};
use crate::error::{DecodeError, Error, Result};
use crate::limits::MAX_ENCODED_STATES;
use crate::names::read_int;
use crate::namespaces::NamespaceScope;
use std::sync::Arc;
use tracing::debug;

/// Units per state header
pub const STATE_STRIDE: usize = 9;
/// Units per attribute transition
pub const ATT_STRIDE: usize = 7;
/// Units per data transition
pub const DATA_STRIDE: usize = 3;
/// Units per element transition
pub const ELEMENT_STRIDE: usize = 6;
/// Units per interleave transition
pub const INTERLEAVE_STRIDE: usize = 4;
/// Units per list transition
pub const LIST_STRIDE: usize = 2;
/// Units per value transition
pub const VALUE_STRIDE: usize = 3;

/// Linked-next value meaning "no linked state"
pub const NO_STATE: u16 = 0xFFFF;

/// Header flag: the state survives expansion
pub const FLAG_PERSISTENT: u16 = 0b0001;
/// Header flag: the state is final
pub const FLAG_FINAL: u16 = 0b0010;
const TEXT_SHIFT: u16 = 2;
const FLAG_BITS: u16 = 0b1111;

/// Flag unit marking a repeated attribute transition
pub const REPEATED: u16 = b'R' as u16;
/// Flag unit marking an interleave whose text goes to the left branch
pub const TEXT_TO_LEFT: u16 = b'L' as u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Att,
    Data,
    Element,
    Interleave,
    List,
    NoAtt,
    Value,
}

impl Family {
    const ALL: [Family; 7] = [
        Family::Att,
        Family::Data,
        Family::Element,
        Family::Interleave,
        Family::List,
        Family::NoAtt,
        Family::Value,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    fn buffer_name(self) -> &'static str {
        match self {
            Family::Att => "att",
            Family::Data => "data",
            Family::Element => "element",
            Family::Interleave => "interleave",
            Family::List => "list",
            Family::NoAtt => "no_att",
            Family::Value => "value",
        }
    }

    /// Fixed record size, `None` for the variable-length absence records
    fn stride(self) -> Option<usize> {
        match self {
            Family::Att => Some(ATT_STRIDE),
            Family::Data => Some(DATA_STRIDE),
            Family::Element => Some(ELEMENT_STRIDE),
            Family::Interleave => Some(INTERLEAVE_STRIDE),
            Family::List => Some(LIST_STRIDE),
            Family::NoAtt => None,
            Family::Value => Some(VALUE_STRIDE),
        }
    }

    fn buffer(self, encoded: &EncodedSchema) -> &[u16] {
        match self {
            Family::Att => &encoded.att,
            Family::Data => &encoded.data,
            Family::Element => &encoded.element,
            Family::Interleave => &encoded.interleave,
            Family::List => &encoded.list,
            Family::NoAtt => &encoded.no_att,
            Family::Value => &encoded.value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Header {
    is_final: bool,
    is_persistent: bool,
    text_sensitivity: TextSensitivity,
    next: Option<usize>,
    /// `[start, end)` per family
    ranges: [(usize, usize); 7],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pending,
    InProgress,
    Done,
}

/// Chains under construction for one state
#[derive(Default, Clone)]
struct Chains {
    att: Chain<AttTransition>,
    data: Chain<DataTransition>,
    element: Chain<ElementTransition>,
    interleave: Chain<InterleaveTransition>,
    list: Chain<ListTransition>,
    no_att: Chain<NoAttTransition>,
    value: Chain<ValueTransition>,
}

/// Output of the decoder
pub(crate) struct DecodedGraph {
    pub states: Vec<SingleState>,
    pub interleaves: Vec<InterleaveTransition>,
}

/// Resolve every datatype descriptor through `factory`.
///
/// The empty namespace always goes to the built-in library.
pub(crate) fn create_datatypes(
    descriptors: &[DatatypeDescriptor],
    factory: &dyn DatatypeLibraryFactory,
) -> Result<Vec<Arc<dyn Datatype>>> {
    descriptors
        .iter()
        .map(|descriptor| {
            let library: Arc<dyn DatatypeLibrary> = if descriptor.namespace_uri.is_empty() {
                Arc::new(BuiltinLibrary::new())
            } else {
                factory
                    .create_datatype_library(&descriptor.namespace_uri)
                    .ok_or_else(|| Error::UnresolvableDatatypeLibrary(descriptor.namespace_uri.clone()))?
            };

            let mut builder = library.create_datatype_builder(&descriptor.local_name)?;
            for param in &descriptor.parameters {
                let context = scope_of(&param.context);
                builder.add_parameter(&param.name, &param.value, &context)?;
            }
            builder.create_datatype()
        })
        .collect()
}

fn scope_of(bindings: &[(String, String)]) -> NamespaceScope {
    NamespaceScope::from_bindings(bindings.iter().map(|(p, u)| (p.as_str(), u.as_str())))
}

struct Decoder<'a> {
    encoded: &'a EncodedSchema,
    datatypes: &'a [Arc<dyn Datatype>],
    literals: &'a [ValueDescriptor],
    headers: Vec<Header>,
}

/// Rebuild the state graph from its buffers
pub(crate) fn decode(encoded: &EncodedSchema, datatypes: &[Arc<dyn Datatype>]) -> Result<DecodedGraph> {
    let headers = read_headers(encoded)?;
    let decoder = Decoder {
        encoded,
        datatypes,
        literals: &encoded.value_literals,
        headers,
    };
    let graph = decoder.run()?;

    debug!(
        states = graph.states.len(),
        interleaves = graph.interleaves.len(),
        datatypes = datatypes.len(),
        "decoded schema graph"
    );
    Ok(graph)
}

fn read_headers(encoded: &EncodedSchema) -> Result<Vec<Header>> {
    let buf = &encoded.states;
    if buf.len() % STATE_STRIDE != 0 {
        return Err(DecodeError::new(format!(
            "header length {} is not a multiple of {}",
            buf.len(),
            STATE_STRIDE
        ))
        .in_buffer("states")
        .into());
    }

    let count = buf.len() / STATE_STRIDE;
    if count == 0 {
        return Err(DecodeError::new("schema has no states").in_buffer("states").into());
    }
    if count >= MAX_ENCODED_STATES {
        return Err(DecodeError::new(format!(
            "{} states cannot be addressed with 16-bit indices",
            count
        ))
        .in_buffer("states")
        .into());
    }

    let offset_of = |state: usize, family: Family| usize::from(buf[state * STATE_STRIDE + 2 + family.slot()]);

    let mut headers = Vec::with_capacity(count);
    for i in 0..count {
        let base = i * STATE_STRIDE;
        let flags = buf[base] & FLAG_BITS;
        let text_sensitivity = TextSensitivity::from_bits(flags >> TEXT_SHIFT).ok_or_else(|| {
            DecodeError::new(format!("state {} has an invalid text sensitivity", i))
                .in_buffer("states")
                .at(base)
        })?;

        let next = match buf[base + 1] {
            NO_STATE => None,
            n if usize::from(n) < count => Some(usize::from(n)),
            n => {
                return Err(DecodeError::new(format!("linked state {} out of range", n))
                    .in_buffer("states")
                    .at(base + 1)
                    .into())
            }
        };

        let mut ranges = [(0, 0); 7];
        for family in Family::ALL {
            let len = family.buffer(encoded).len();
            let start = offset_of(i, family);
            let end = if i + 1 < count { offset_of(i + 1, family) } else { len };
            if start > end || end > len {
                return Err(DecodeError::new(format!(
                    "state {} has an invalid {} range {}..{} (buffer length {})",
                    i,
                    family.buffer_name(),
                    start,
                    end,
                    len
                ))
                .in_buffer("states")
                .at(base + 2 + family.slot())
                .into());
            }
            if let Some(stride) = family.stride() {
                if start % stride != 0 || (end - start) % stride != 0 {
                    return Err(DecodeError::new(format!(
                        "state {} has a partial {} record",
                        i,
                        family.buffer_name()
                    ))
                    .in_buffer(family.buffer_name())
                    .at(start)
                    .into());
                }
            }
            ranges[family.slot()] = (start, end);
        }

        headers.push(Header {
            is_final: flags & FLAG_FINAL != 0,
            is_persistent: flags & FLAG_PERSISTENT != 0,
            text_sensitivity,
            next,
            ranges,
        });
    }

    Ok(headers)
}

impl<'a> Decoder<'a> {
    fn run(&self) -> Result<DecodedGraph> {
        let count = self.headers.len();
        let interleaves = self.read_interleaves()?;

        let mut status = vec![Status::Pending; count];
        let mut chains: Vec<Chains> = vec![Chains::default(); count];
        let mut stack = Vec::new();

        for idx in (0..count).rev() {
            // push the undecoded part of the linked-next chain
            let mut cursor = Some(idx);
            while let Some(s) = cursor {
                match status[s] {
                    Status::Done => break,
                    Status::InProgress => {
                        return Err(DecodeError::new(format!("linked-next cycle through state {}", s))
                            .in_buffer("states")
                            .at(s * STATE_STRIDE + 1)
                            .into())
                    }
                    Status::Pending => {
                        status[s] = Status::InProgress;
                        stack.push(s);
                        cursor = self.headers[s].next;
                    }
                }
            }

            while let Some(s) = stack.pop() {
                let inherited = match self.headers[s].next {
                    Some(next) => chains[next].clone(),
                    None => Chains::default(),
                };
                chains[s] = self.decode_state(s, inherited, &interleaves)?;
                status[s] = Status::Done;
            }
        }

        let states: Vec<SingleState> = chains
            .into_iter()
            .enumerate()
            .map(|(i, chains)| {
                let header = &self.headers[i];
                let mut state = SingleState::new(
                    SingleId(i as u32),
                    header.is_final,
                    header.is_persistent,
                    header.text_sensitivity,
                );
                state.att = chains.att;
                state.data = chains.data;
                state.element = ElementTable::from_chain(&chains.element);
                state.interleave = chains.interleave;
                state.list = chains.list;
                state.no_att = chains.no_att;
                state.value = chains.value;
                state
            })
            .collect();

        check_expansion_cycles(&states)?;
        Ok(DecodedGraph { states, interleaves })
    }

    fn state_at(&self, family: Family, pos: usize) -> Result<SingleId> {
        let raw = family.buffer(self.encoded)[pos];
        if usize::from(raw) >= self.headers.len() {
            return Err(DecodeError::new(format!("state index {} out of range", raw))
                .in_buffer(family.buffer_name())
                .at(pos)
                .into());
        }
        Ok(SingleId(u32::from(raw)))
    }

    fn datatype_at(&self, family: Family, pos: usize) -> Result<&'a Arc<dyn Datatype>> {
        let raw = usize::from(family.buffer(self.encoded)[pos]);
        self.datatypes.get(raw).ok_or_else(|| {
            DecodeError::new(format!("datatype index {} out of range", raw))
                .in_buffer(family.buffer_name())
                .at(pos)
                .into()
        })
    }

    fn signature_at(&self, family: Family, pos: usize) -> NameSignature {
        let buf = family.buffer(self.encoded);
        NameSignature::new(read_int(buf, pos), read_int(buf, pos + 2))
    }

    /// Every interleave record, indexed by record number
    fn read_interleaves(&self) -> Result<Vec<InterleaveTransition>> {
        let family = Family::Interleave;
        let buf = family.buffer(self.encoded);
        if buf.len() % INTERLEAVE_STRIDE != 0 {
            return Err(DecodeError::new("partial interleave record")
                .in_buffer(family.buffer_name())
                .at(buf.len() - buf.len() % INTERLEAVE_STRIDE)
                .into());
        }

        (0..buf.len() / INTERLEAVE_STRIDE)
            .map(|n| {
                let i = n * INTERLEAVE_STRIDE;
                Ok(InterleaveTransition {
                    id: InterleaveId(n as u32),
                    left: self.state_at(family, i)?,
                    right: self.state_at(family, i + 1)?,
                    join: self.state_at(family, i + 2)?,
                    text_to_left: buf[i + 3] == TEXT_TO_LEFT,
                })
            })
            .collect()
    }

    /// Fixed-stride record starts of `family` for state `s`, last record first
    fn records_backward(&self, s: usize, family: Family) -> impl Iterator<Item = usize> {
        let (start, end) = self.headers[s].ranges[family.slot()];
        let stride = family.stride().unwrap_or(1);
        (start..end).step_by(stride).rev()
    }

    fn decode_state(&self, s: usize, mut chains: Chains, interleaves: &[InterleaveTransition]) -> Result<Chains> {
        for i in self.records_backward(s, Family::Att) {
            let buf = &self.encoded.att;
            chains.att = chains.att.prepend(AttTransition {
                left: self.state_at(Family::Att, i)?,
                right: self.state_at(Family::Att, i + 1)?,
                signature: self.signature_at(Family::Att, i + 2),
                repeated: buf[i + 6] == REPEATED,
            });
        }

        for i in self.records_backward(s, Family::Data) {
            chains.data = chains.data.prepend(DataTransition {
                left: self.state_at(Family::Data, i)?,
                right: self.state_at(Family::Data, i + 1)?,
                datatype: Arc::clone(self.datatype_at(Family::Data, i + 2)?),
            });
        }

        for i in self.records_backward(s, Family::Element) {
            chains.element = chains.element.prepend(ElementTransition {
                left: self.state_at(Family::Element, i)?,
                right: self.state_at(Family::Element, i + 1)?,
                signature: self.signature_at(Family::Element, i + 2),
            });
        }

        for i in self.records_backward(s, Family::Interleave) {
            chains.interleave = chains.interleave.prepend(interleaves[i / INTERLEAVE_STRIDE]);
        }

        for i in self.records_backward(s, Family::List) {
            chains.list = chains.list.prepend(ListTransition {
                left: self.state_at(Family::List, i)?,
                right: self.state_at(Family::List, i + 1)?,
            });
        }

        for record in self.no_att_records(s)?.into_iter().rev() {
            chains.no_att = chains.no_att.prepend(record);
        }

        for i in self.records_backward(s, Family::Value) {
            chains.value = chains.value.prepend(self.value_record(i)?);
        }

        Ok(chains)
    }

    fn no_att_records(&self, s: usize) -> Result<Vec<NoAttTransition>> {
        let family = Family::NoAtt;
        let buf = family.buffer(self.encoded);
        let (start, end) = self.headers[s].ranges[family.slot()];
        let mut records = Vec::new();

        let mut i = start;
        while i < end {
            if i + 2 > end {
                return Err(overrun(i));
            }
            let right = self.state_at(family, i)?;
            let sizes = buf[i + 1];
            let negative = usize::from(sizes >> 8);
            let positive = usize::from(sizes & 0xFF);
            let record_end = i + 2 + 4 * (negative + positive);
            if record_end > end {
                return Err(overrun(i));
            }

            let signatures: Vec<_> = (0..negative + positive)
                .map(|k| self.signature_at(family, i + 2 + 4 * k))
                .collect();
            let (negative, positive) = signatures.split_at(negative);
            records.push(NoAttTransition {
                right,
                negative: negative.to_vec(),
                positive: positive.to_vec(),
            });
            i = record_end;
        }

        Ok(records)
    }

    fn value_record(&self, i: usize) -> Result<ValueTransition> {
        let family = Family::Value;
        let right = self.state_at(family, i)?;
        let datatype = Arc::clone(self.datatype_at(family, i + 1)?);
        let index = usize::from(self.encoded.value[i + 2]);
        let literal = self.literals.get(index).ok_or_else(|| {
            DecodeError::new(format!("value literal index {} out of range", index))
                .in_buffer(family.buffer_name())
                .at(i + 2)
        })?;

        let value = datatype
            .create_value(&literal.value, &scope_of(&literal.context))
            .ok_or_else(|| {
                DecodeError::new(format!("literal '{}' is not a valid value of its datatype", literal.value))
                    .in_buffer(family.buffer_name())
                    .at(i)
            })?;

        Ok(ValueTransition { datatype, value, right })
    }
}

/// States reached from `state` without consuming an event: attribute,
/// attribute-absence and interleave branch targets
fn expansion_targets(state: &SingleState) -> impl Iterator<Item = usize> + '_ {
    state
        .att()
        .iter()
        .map(|t| t.right.index())
        .chain(state.no_att().iter().map(|t| t.right.index()))
        .chain(
            state
                .interleave()
                .iter()
                .flat_map(|t| [t.left.index(), t.right.index()]),
        )
}

/// Reject expansion cycles that expansion cannot cut short.
///
/// Expansion stops on a state it has already collected, but only persistent
/// states are collected, and interleave branches start from nothing. So a
/// cycle made of non-persistent states, or one passing through an interleave
/// branch, never terminates.
fn check_expansion_cycles(states: &[SingleState]) -> Result<()> {
    let cycle = |s: usize, message: &str| -> Error {
        DecodeError::new(format!("{} {}", message, s))
            .in_buffer("states")
            .at(s * STATE_STRIDE)
            .into()
    };

    let all = components(states, |_| true);
    for (s, state) in states.iter().enumerate() {
        for t in state.interleave() {
            if all[t.left.index()] == all[s] || all[t.right.index()] == all[s] {
                return Err(cycle(s, "interleave branch expands back into state"));
            }
        }
    }

    let transient = |s: usize| !states[s].is_persistent();
    let transient_components = components(states, transient);
    for (s, state) in states.iter().enumerate().filter(|(s, _)| transient(*s)) {
        if expansion_targets(state).any(|t| transient(t) && transient_components[t] == transient_components[s]) {
            return Err(cycle(s, "expansion cycle through non-persistent state"));
        }
    }
    Ok(())
}

/// Strongly connected components of the expansion graph restricted to the
/// `include`d states (Tarjan, with an explicit stack).
///
/// Returns a component number per state; excluded states get `usize::MAX`.
fn components(states: &[SingleState], include: impl Fn(usize) -> bool) -> Vec<usize> {
    const UNVISITED: usize = usize::MAX;

    let successors = |s: usize| -> Vec<usize> { expansion_targets(&states[s]).filter(|&t| include(t)).collect() };
    let count = states.len();
    let mut index = vec![UNVISITED; count];
    let mut low = vec![0; count];
    let mut on_stack = vec![false; count];
    let mut component = vec![UNVISITED; count];
    let mut stack = Vec::new();
    let mut next_index = 0;
    let mut next_component = 0;

    for root in 0..count {
        if !include(root) || index[root] != UNVISITED {
            continue;
        }

        index[root] = next_index;
        low[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        // (state, its successors, next successor to visit)
        let mut work = vec![(root, successors(root), 0usize)];

        while let Some((s, succ, pos)) = work.last_mut() {
            let s = *s;
            if let Some(&t) = succ.get(*pos) {
                *pos += 1;
                if index[t] == UNVISITED {
                    index[t] = next_index;
                    low[t] = next_index;
                    next_index += 1;
                    stack.push(t);
                    on_stack[t] = true;
                    work.push((t, successors(t), 0));
                } else if on_stack[t] {
                    low[s] = low[s].min(index[t]);
                }
                continue;
            }

            work.pop();
            if let Some((parent, _, _)) = work.last() {
                low[*parent] = low[*parent].min(low[s]);
            }
            if low[s] == index[s] {
                while let Some(t) = stack.pop() {
                    on_stack[t] = false;
                    component[t] = next_component;
                    if t == s {
                        break;
                    }
                }
                next_component += 1;
            }
        }
    }
    component
}

fn overrun(offset: usize) -> Error {
    DecodeError::new("attribute absence record overruns its range")
        .in_buffer(Family::NoAtt.buffer_name())
        .at(offset)
        .into()
}

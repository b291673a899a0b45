//! Name codes and XML name utilities
//!
//! The automaton never compares element or attribute names as strings. Each
//! `(namespace URI, local name)` pair is mapped once to a small integer name
//! code, and transitions test those codes against a mask/test signature.

use crate::error::{DecodeError, Result};
use crate::namespaces::QName;
use indexmap::IndexMap;

/// Integer surrogate for a resolved `(namespace URI, local name)` pair
pub type NameCode = u32;

/// Local name that stands for "any local name in this namespace"
pub const WILDCARD: &str = "*";

const NUL: u16 = 0;

/// Dictionary from names to name codes.
///
/// Lookup tries the exact pair, then the namespace wildcard `(uri, "*")`, then
/// falls back to the schema-wide default code.
#[derive(Debug, Clone)]
pub struct NameResolver {
    literals: IndexMap<String, IndexMap<String, NameCode>>,
    default_code: NameCode,
}

impl NameResolver {
    /// Create an empty resolver; every name maps to `default_code`
    pub fn new(default_code: NameCode) -> Self {
        Self {
            literals: IndexMap::new(),
            default_code,
        }
    }

    /// Decode the literal table: repeated `code(2) uri NUL local NUL`
    pub fn decode(table: &[u16], default_code: NameCode) -> Result<Self> {
        let mut resolver = Self::new(default_code);
        let mut pos = 0;

        while pos < table.len() {
            let start = pos;
            if pos + 2 > table.len() {
                return Err(truncated(start).into());
            }
            let code = read_int(table, pos);
            pos += 2;
            let (uri, next) = read_string(table, pos, start)?;
            let (local, next) = read_string(table, next, start)?;
            pos = next;

            resolver.insert(uri, local, code).map_err(|e| e.at(start))?;
        }

        Ok(resolver)
    }

    /// Register a name literal
    pub fn insert(
        &mut self,
        uri: impl Into<String>,
        local: impl Into<String>,
        code: NameCode,
    ) -> std::result::Result<(), DecodeError> {
        let uri = uri.into();
        let local = local.into();
        let locals = self.literals.entry(uri.clone()).or_default();
        if locals.contains_key(&local) {
            return Err(DecodeError::new(format!(
                "duplicate name literal {}",
                QName::new(uri, local)
            ))
            .in_buffer("name"));
        }
        locals.insert(local, code);
        Ok(())
    }

    /// Resolve a name to its code
    pub fn resolve(&self, uri: &str, local: &str) -> NameCode {
        match self.literals.get(uri) {
            Some(locals) => locals
                .get(local)
                .or_else(|| locals.get(WILDCARD))
                .copied()
                .unwrap_or(self.default_code),
            None => self.default_code,
        }
    }

    /// Code given to names that appear nowhere in the schema
    pub fn default_code(&self) -> NameCode {
        self.default_code
    }

    /// Number of registered literals
    pub fn len(&self) -> usize {
        self.literals.values().map(IndexMap::len).sum()
    }

    /// True if no literal is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the registered literals in table order
    pub fn iter(&self) -> impl Iterator<Item = (QName, NameCode)> + '_ {
        self.literals.iter().flat_map(|(uri, locals)| {
            locals
                .iter()
                .map(move |(local, code)| (QName::new(uri.as_str(), local.as_str()), *code))
        })
    }
}

fn truncated(offset: usize) -> DecodeError {
    DecodeError::new("unterminated name literal")
        .in_buffer("name")
        .at(offset)
}

/// Read a 32-bit integer stored as two units, low unit first
pub(crate) fn read_int(buf: &[u16], pos: usize) -> u32 {
    (u32::from(buf[pos + 1]) << 16) | u32::from(buf[pos])
}

/// Read a NUL-terminated UTF-16 string; `start` locates the enclosing literal
fn read_string(buf: &[u16], pos: usize, start: usize) -> std::result::Result<(String, usize), DecodeError> {
    let end = buf
        .get(pos..)
        .and_then(|rest| rest.iter().position(|&u| u == NUL))
        .map(|len| pos + len)
        .ok_or_else(|| truncated(start))?;
    let text = String::from_utf16(&buf[pos..end]).map_err(|_| {
        DecodeError::new("name literal is not valid UTF-16")
            .in_buffer("name")
            .at(pos)
    })?;
    Ok((text, end + 1))
}

/// Check if a string is a valid XML Name
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_name_start_char(c) => chars.all(is_name_char),
        _ => false,
    }
}

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    !name.contains(':') && is_valid_name(name)
}

/// Check if a string is a valid QName (qualified name)
pub fn is_valid_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_ncname(prefix) && is_valid_ncname(local),
        None => is_valid_ncname(name),
    }
}

/// Check if a string is a valid NMTOKEN
pub fn is_valid_nmtoken(token: &str) -> bool {
    !token.is_empty() && token.chars().all(is_name_char)
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}

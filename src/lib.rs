//! # validatelet
//!
//! A streaming validator for precompiled RELAX NG grammars.
//!
//! A grammar compiler lowers a RELAX NG schema into a compact state graph: a
//! handful of 16-bit buffers plus datatype and literal descriptors. This crate
//! decodes that graph once into an immutable [`Schema`] and validates documents
//! against it by computing derivatives: every parser event maps the current
//! state to the state that remains after consuming it. A document is valid iff
//! the state after the last event is final.
//!
//! ## Features
//!
//! - Decoder for the encoded state graph, with bounds checking
//! - Derivative automaton with hash-consed states and per-run caches
//! - Push API ([`Validator`]) and a `roxmltree` tree driver
//! - RELAX NG built-in datatypes and a subset of the XML Schema datatypes
//! - JSON form of the encoded schema for storage and tooling
//!
//! ## Example
//!
//! ```rust,ignore
//! use validatelet::{DatatypeRegistry, Schema};
//!
//! let schema = Schema::from_file("grammar.json", &DatatypeRegistry::with_xsd())?;
//! validatelet::validate_str(&schema, "<doc/>")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names
pub mod namespaces;
pub mod names;
pub mod attributes;

// Datatypes
pub mod datatypes;

// State graph and derivatives
pub mod automaton;
pub mod schema;

// Drivers
pub mod validator;
pub mod documents;

// Re-exports for convenience
pub use attributes::AttributeView;
pub use automaton::{Automaton, StateRef, TextSensitivity};
pub use datatypes::{DatatypeLibraryFactory, DatatypeRegistry};
pub use documents::{validate_document, validate_file, validate_str};
pub use error::{Error, Result};
pub use limits::Limits;
pub use namespaces::{NamespaceScope, QName};
pub use schema::{EncodedSchema, Schema, SchemaWriter};
pub use validator::Validator;

/// Version of the validatelet library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

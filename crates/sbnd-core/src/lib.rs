//! # sbnd-core: Foundational Types for schemabound
//!
//! This crate is the leaf of the workspace DAG. It defines the seam through
//! which schema references are resolved and the read-only view used to walk
//! schemas without caring whether a fragment is inline or behind a `$ref`.
//!
//! ## Key Types
//!
//! - [`Resolver`]: capability mapping a `$ref` string to a canonical id and
//!   the referenced fragment. Implemented by `sbnd_schema::SchemaRegistry`,
//!   or by callers with their own reference scheme.
//!
//! - [`SchemaView`]: a lookup/enumeration surface over a schema fragment that
//!   transparently follows `$ref` chains, detecting cycles by canonical id.
//!
//! - [`ResolveError`]: every way reference resolution can fail.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sbnd-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod resolver;
pub mod view;

pub use error::ResolveError;
pub use resolver::{
    document_part, rebase_fragment_refs, reference_of, ResolvedRef, Resolver, REF_KEY,
};
pub use view::SchemaView;

//! # sbnd-model: Self-Validating Models
//!
//! Turns a JSON Schema into a reusable [`ModelType`] whose instances
//! ([`Model`]) behave like key/value mappings that refuse to become invalid.
//!
//! ## Lifecycle
//!
//! ```text
//! schema ──▶ ModelFactory::create ──▶ ModelType ──▶ instantiate ──▶ Model
//!                                        │                           │
//!                                        └── nested ModelType cache ◀┘
//!                                            (per property name)
//! ```
//!
//! ## Guarantees
//!
//! - **Validity.** Every mutation (`set`, `delete`, `update`) builds the
//!   complete candidate state and validates it before anything is committed.
//!   A rejected mutation leaves the model exactly as it was.
//! - **Defaults.** Properties with a schema `default` read as that default
//!   until set, and are listed by [`Model::keys`].
//! - **Nested models.** Plain objects stored under object-typed properties
//!   become nested [`Model`]s enforcing their own sub-schema. Nested types
//!   are generated once per property and cached on the parent type.
//! - **Change tracking.** [`Model::patch`] is the JSON Patch from the state at
//!   construction to the current state, recomputed on every call.
//!
//! ## Crate Policy
//!
//! - Validation is delegated to `sbnd-schema`; diffing to `json-patch`.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - `Model` is intentionally not `Clone`: copies are plain JSON
//!   ([`Model::to_map`], [`Model::to_value`]).

pub mod behavior;
pub mod error;
pub mod factory;
pub mod model;

pub use behavior::{Behavior, DefaultBehavior, Mutation};
pub use error::{InvalidOperation, ModelError};
pub use factory::{ModelBuilder, ModelFactory, ModelType, DEFAULT_MODEL_NAME};
pub use model::{Field, Model};

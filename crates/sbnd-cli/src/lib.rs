//! # sbnd-cli: schemabound Command-Line Interface
//!
//! A clap-based front end over the model factory.
//!
//! ## Subcommands
//!
//! - `validate`: instantiate a model from each document
//! - `patch`: apply an update and print the JSON Patch it produces
//! - `inspect`: print a model type's name, defaults and nested properties
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handlers return data; printing and exit status belong to `main`.
//! - Handler functions delegate to `sbnd-model`, with no validation logic here.

pub mod inspect;
pub mod patch;
pub mod schema;
pub mod validate;

//! # Model Behavior Hooks
//!
//! A [`Behavior`] customizes every model type produced by one factory call,
//! nested types included. It can add constraints the schema cannot express
//! and observe committed mutations.

use std::fmt;

use sbnd_schema::ValidationViolations;
use serde_json::{Map, Value};

/// A committed change to a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mutation<'a> {
    /// `key` was assigned `value`.
    Set {
        /// The assigned key.
        key: &'a str,
        /// The value as supplied by the caller.
        value: &'a Value,
    },
    /// `key` was removed.
    Delete {
        /// The removed key.
        key: &'a str,
    },
    /// Several keys were assigned in one validated step.
    Update {
        /// The assigned keys, in the order supplied.
        keys: &'a [String],
    },
}

/// Customization shared by a model type and all its nested types.
pub trait Behavior: Send + Sync + fmt::Debug {
    /// Extra constraint checked after the schema accepts `candidate`.
    ///
    /// Rejections surface exactly like schema violations.
    fn check(&self, candidate: &Map<String, Value>) -> Result<(), ValidationViolations> {
        let _ = candidate;
        Ok(())
    }

    /// Called after `mutation` has been committed to a model named `model`.
    fn on_commit(&self, model: &str, mutation: &Mutation<'_>) {
        let _ = (model, mutation);
    }
}

/// Accepts whatever the schema accepts; traces commits.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl Behavior for DefaultBehavior {
    fn on_commit(&self, model: &str, mutation: &Mutation<'_>) {
        tracing::trace!(model, ?mutation, "committed mutation");
    }
}

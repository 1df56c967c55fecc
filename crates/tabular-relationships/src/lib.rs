//! Relationship activation for Tabular models.
//!
//! A Tabular model allows at most one active path between any two tables. This crate builds a
//! [`RelationshipGraph`] of active relationships from a [`ModelSnapshot`], decides whether a new
//! activation would introduce an alternate path, and drives the resulting reference fan-out
//! through a [`CommandSink`].

mod activation;
mod error;
mod external;
mod graph;
mod ident;
mod memory;
mod options;
mod snapshot;

pub use crate::activation::{
    plan_activation, plan_deactivation, ActivationPlan, RelationshipActivator,
};
pub use crate::error::{RelationshipError, RelationshipResult};
pub use crate::external::{CommandSink, ModelCommand, ModelSource};
pub use crate::graph::{RelationshipGraph, RelationshipGraphNode};
pub use crate::ident::{
    format_column_ref, parse_column_ref, table_eq, FullName, RelationshipPair,
};
pub use crate::memory::InMemoryModel;
pub use crate::options::{ActivationOptions, GraphOptions};
pub use crate::snapshot::{
    Materialization, ModelSnapshot, ReferenceRecord, RelationshipDefinition, TableInfo,
};

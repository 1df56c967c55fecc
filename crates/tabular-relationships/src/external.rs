//! Seams toward the external Tabular model.
//!
//! The relationship logic never talks to a server directly. It reads a [`ModelSnapshot`] through
//! [`ModelSource`] and sends structural edits through [`CommandSink`]; edits only become visible
//! in later snapshots after [`CommandSink::commit`].

use crate::error::RelationshipResult;
use crate::ident::RelationshipPair;
use crate::snapshot::{ModelSnapshot, ReferenceRecord, RelationshipDefinition};
use serde::{Deserialize, Serialize};

pub trait ModelSource {
    fn snapshot(&self) -> RelationshipResult<ModelSnapshot>;
}

pub trait CommandSink {
    fn add_reference(&mut self, record: ReferenceRecord) -> RelationshipResult<()>;

    /// Replace the record occupying the same `(table, relationship)` slot.
    fn update_reference(&mut self, record: ReferenceRecord) -> RelationshipResult<()>;

    fn remove_reference(
        &mut self,
        table: &str,
        relationship: &RelationshipPair,
    ) -> RelationshipResult<()>;

    fn add_relationship(&mut self, definition: RelationshipDefinition) -> RelationshipResult<()>;

    fn remove_relationship(&mut self, relationship: &RelationshipPair) -> RelationshipResult<()>;

    /// Flush all edits issued since the last commit to the model.
    fn commit(&mut self) -> RelationshipResult<()>;

    /// Discard all edits issued since the last commit.
    fn rollback(&mut self) -> RelationshipResult<()>;
}

/// A structural edit, as issued to a [`CommandSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ModelCommand {
    AddReference(ReferenceRecord),
    UpdateReference(ReferenceRecord),
    #[serde(rename_all = "camelCase")]
    RemoveReference {
        table: String,
        relationship: RelationshipPair,
    },
    AddRelationship(RelationshipDefinition),
    RemoveRelationship(RelationshipPair),
    Commit,
    Rollback,
}

impl ModelCommand {
    /// Send this command to `sink`.
    pub fn apply<S: CommandSink + ?Sized>(self, sink: &mut S) -> RelationshipResult<()> {
        match self {
            ModelCommand::AddReference(record) => sink.add_reference(record),
            ModelCommand::UpdateReference(record) => sink.update_reference(record),
            ModelCommand::RemoveReference {
                table,
                relationship,
            } => sink.remove_reference(&table, &relationship),
            ModelCommand::AddRelationship(definition) => sink.add_relationship(definition),
            ModelCommand::RemoveRelationship(relationship) => {
                sink.remove_relationship(&relationship)
            }
            ModelCommand::Commit => sink.commit(),
            ModelCommand::Rollback => sink.rollback(),
        }
    }
}

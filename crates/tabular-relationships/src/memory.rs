use crate::error::{RelationshipError, RelationshipResult};
use crate::external::{CommandSink, ModelCommand, ModelSource};
use crate::ident::RelationshipPair;
use crate::snapshot::{ModelSnapshot, ReferenceRecord, RelationshipDefinition};

/// An in-process model that stages edits and applies them on `commit`.
///
/// Every command that reaches the sink is recorded in [`InMemoryModel::commands`], including ones
/// that were rejected, so callers can assert exactly what was sent.
#[derive(Clone, Debug, Default)]
pub struct InMemoryModel {
    committed: ModelSnapshot,
    staged: ModelSnapshot,
    commands: Vec<ModelCommand>,
    commits: usize,
}

impl InMemoryModel {
    pub fn new(snapshot: ModelSnapshot) -> Self {
        Self {
            staged: snapshot.clone(),
            committed: snapshot,
            commands: Vec::new(),
            commits: 0,
        }
    }

    pub fn committed(&self) -> &ModelSnapshot {
        &self.committed
    }

    /// Edits issued but not yet committed.
    pub fn has_pending_changes(&self) -> bool {
        self.staged != self.committed
    }

    pub fn commands(&self) -> &[ModelCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<ModelCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    fn reference_position(&self, table: &str, relationship: &RelationshipPair) -> Option<usize> {
        self.staged
            .references
            .iter()
            .position(|r| r.same_slot(table, relationship))
    }

    fn require_table(&self, table: &str) -> RelationshipResult<()> {
        match self.staged.table(table) {
            Some(_) => Ok(()),
            None => Err(RelationshipError::UnknownTable(table.to_string())),
        }
    }
}

impl ModelSource for InMemoryModel {
    fn snapshot(&self) -> RelationshipResult<ModelSnapshot> {
        Ok(self.committed.clone())
    }
}

impl CommandSink for InMemoryModel {
    fn add_reference(&mut self, record: ReferenceRecord) -> RelationshipResult<()> {
        self.commands.push(ModelCommand::AddReference(record.clone()));
        self.require_table(&record.table)?;
        if self
            .reference_position(&record.table, &record.relationship)
            .is_some()
        {
            return Err(RelationshipError::External(format!(
                "table {} already holds a reference for {}",
                record.table, record.relationship
            )));
        }
        self.staged.references.push(record);
        Ok(())
    }

    fn update_reference(&mut self, record: ReferenceRecord) -> RelationshipResult<()> {
        self.commands
            .push(ModelCommand::UpdateReference(record.clone()));
        let idx = self
            .reference_position(&record.table, &record.relationship)
            .ok_or_else(|| {
                RelationshipError::External(format!(
                    "table {} holds no reference for {}",
                    record.table, record.relationship
                ))
            })?;
        self.staged.references[idx] = record;
        Ok(())
    }

    fn remove_reference(
        &mut self,
        table: &str,
        relationship: &RelationshipPair,
    ) -> RelationshipResult<()> {
        self.commands.push(ModelCommand::RemoveReference {
            table: table.to_string(),
            relationship: relationship.clone(),
        });
        let idx = self
            .reference_position(table, relationship)
            .ok_or_else(|| {
                RelationshipError::External(format!(
                    "table {table} holds no reference for {relationship}"
                ))
            })?;
        self.staged.references.remove(idx);
        Ok(())
    }

    fn add_relationship(&mut self, definition: RelationshipDefinition) -> RelationshipResult<()> {
        self.commands
            .push(ModelCommand::AddRelationship(definition.clone()));
        self.require_table(definition.relationship.primary_table())?;
        self.require_table(definition.relationship.foreign_table())?;
        if self.staged.relationship(&definition.relationship).is_some() {
            return Err(RelationshipError::DuplicateRelationship(
                definition.relationship,
            ));
        }
        self.staged.relationships.push(definition);
        Ok(())
    }

    fn remove_relationship(&mut self, relationship: &RelationshipPair) -> RelationshipResult<()> {
        self.commands
            .push(ModelCommand::RemoveRelationship(relationship.clone()));
        let before = self.staged.relationships.len();
        self.staged
            .relationships
            .retain(|r| &r.relationship != relationship);
        if self.staged.relationships.len() == before {
            return Err(RelationshipError::RelationshipNotFound(relationship.clone()));
        }
        Ok(())
    }

    fn commit(&mut self) -> RelationshipResult<()> {
        self.commands.push(ModelCommand::Commit);
        self.committed = self.staged.clone();
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> RelationshipResult<()> {
        self.commands.push(ModelCommand::Rollback);
        self.staged = self.committed.clone();
        Ok(())
    }
}

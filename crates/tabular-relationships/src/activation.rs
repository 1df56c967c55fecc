//! Relationship activation and deactivation.
//!
//! Activating `foreign -> primary` materializes more than the direct reference. Every table that
//! (transitively) references the foreign table needs an intermediate reference to the primary
//! table, and the foreign table plus all of those upstream tables need intermediate references for
//! every active relationship below the primary table. The full fan-out is:
//!
//! 1. the direct `Regular` reference on the foreign table;
//! 2. an `Indirect` reference for the new relationship on each upstream table;
//! 3. an `Indirect` reference on the foreign table for each relationship below the primary table;
//! 4. the combination of 2 and 3 on each upstream table.
//!
//! Deactivation removes the same set. All preconditions, including the alternate-path check and
//! the state of every reference slot the plan touches, are evaluated against a snapshot before the
//! first command is sent, so a rejected call leaves the model untouched. If the sink itself fails
//! partway through a batch, the batch is rolled back.

use crate::error::{RelationshipError, RelationshipResult};
use crate::external::{CommandSink, ModelSource};
use crate::graph::RelationshipGraph;
use crate::ident::{fold_case, table_eq, RelationshipPair};
use crate::options::{ActivationOptions, GraphOptions};
use crate::snapshot::{ModelSnapshot, ReferenceRecord, RelationshipDefinition};
use std::collections::HashSet;

/// The reference records one activation adds (or one deactivation removes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivationPlan {
    pub relationship: RelationshipPair,
    pub direct: ReferenceRecord,
    /// Deduplicated by `(table, relationship)`, in fan-out order.
    pub intermediates: Vec<ReferenceRecord>,
}

impl ActivationPlan {
    fn build(graph: &RelationshipGraph, pair: &RelationshipPair) -> RelationshipResult<Self> {
        let upstream = graph.table_list_foreign_key_up(pair.foreign_table())?;
        let downstream = graph.relationships_list_primary_key_down(pair.primary_table())?;

        let mut seen = HashSet::new();
        let mut intermediates = Vec::new();
        let mut push = |table: &str, relationship: &RelationshipPair| {
            if seen.insert((fold_case(table), relationship.clone())) {
                intermediates.push(ReferenceRecord::indirect(
                    table,
                    relationship.clone(),
                    pair.clone(),
                ));
            }
        };

        for table in &upstream {
            push(table, pair);
        }
        for relationship in &downstream {
            push(pair.foreign_table(), relationship);
        }
        for table in &upstream {
            for relationship in &downstream {
                push(table, relationship);
            }
        }

        log::debug!(
            "fan-out for {pair}: {} upstream tables, {} downstream relationships, {} intermediate references",
            upstream.len(),
            downstream.len(),
            intermediates.len()
        );

        Ok(Self {
            relationship: pair.clone(),
            direct: ReferenceRecord::regular(pair.clone()),
            intermediates,
        })
    }

    /// The direct record followed by the intermediates.
    pub fn records(&self) -> impl Iterator<Item = &ReferenceRecord> {
        std::iter::once(&self.direct).chain(self.intermediates.iter())
    }

    pub fn record_count(&self) -> usize {
        1 + self.intermediates.len()
    }
}

fn validate_pair(pair: &RelationshipPair) -> RelationshipResult<()> {
    if pair.primary.is_blank() {
        return Err(RelationshipError::InvalidArgument(format!(
            "primary key end of {pair} is missing a table or column"
        )));
    }
    if pair.foreign.is_blank() {
        return Err(RelationshipError::InvalidArgument(format!(
            "foreign key end of {pair} is missing a table or column"
        )));
    }
    if table_eq(pair.primary_table(), pair.foreign_table()) {
        return Err(RelationshipError::InvalidArgument(format!(
            "relationship {pair} references its own table"
        )));
    }
    Ok(())
}

fn checked_activation_plan(
    snapshot: &ModelSnapshot,
    pair: &RelationshipPair,
    options: GraphOptions,
) -> RelationshipResult<ActivationPlan> {
    if snapshot.is_active(pair) {
        return Err(RelationshipError::AlreadyActive(pair.clone()));
    }

    let graph = RelationshipGraph::from_snapshot_with_options(snapshot, options);
    if graph.relationship_alternate_path_exists(pair.primary_table(), pair.foreign_table())? {
        return Err(RelationshipError::AlternatePath {
            relationship: pair.clone(),
            primary_table: pair.primary_table().to_string(),
            foreign_table: pair.foreign_table().to_string(),
        });
    }
    let plan = ActivationPlan::build(&graph, pair)?;

    if let Some(record) = plan
        .records()
        .find(|r| snapshot.reference(&r.table, &r.relationship).is_some())
    {
        return Err(RelationshipError::ReferenceConflict {
            table: record.table.clone(),
            relationship: record.relationship.clone(),
        });
    }
    Ok(plan)
}

/// Compute what activating `pair` would add, without touching the model.
pub fn plan_activation(
    snapshot: &ModelSnapshot,
    pair: &RelationshipPair,
    options: GraphOptions,
) -> RelationshipResult<ActivationPlan> {
    validate_pair(pair)?;
    if snapshot.relationship(pair).is_none() {
        return Err(RelationshipError::RelationshipNotFound(pair.clone()));
    }
    checked_activation_plan(snapshot, pair, options)
}

/// Compute what deactivating `pair` would remove, without touching the model.
pub fn plan_deactivation(
    snapshot: &ModelSnapshot,
    pair: &RelationshipPair,
    options: GraphOptions,
) -> RelationshipResult<ActivationPlan> {
    validate_pair(pair)?;
    if !snapshot.is_active(pair) {
        return Err(RelationshipError::NotActive(pair.clone()));
    }
    let graph = RelationshipGraph::from_snapshot_with_options(snapshot, options);
    let plan = ActivationPlan::build(&graph, pair)?;

    if let Some(record) = plan
        .records()
        .find(|r| snapshot.reference(&r.table, &r.relationship).is_none())
    {
        return Err(RelationshipError::ReferenceMissing {
            table: record.table.clone(),
            relationship: record.relationship.clone(),
        });
    }
    Ok(plan)
}

/// Drives relationship changes against an external model.
#[derive(Clone, Copy, Debug, Default)]
pub struct RelationshipActivator {
    options: ActivationOptions,
}

impl RelationshipActivator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ActivationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ActivationOptions {
        &self.options
    }

    /// Make a defined relationship active.
    pub fn activate<M>(
        &self,
        model: &mut M,
        pair: &RelationshipPair,
    ) -> RelationshipResult<ActivationPlan>
    where
        M: ModelSource + CommandSink,
    {
        let snapshot = model.snapshot()?;
        let plan = plan_activation(&snapshot, pair, self.options.graph).inspect_err(|err| {
            log::warn!("rejected activation of {pair}: {err}");
        })?;

        self.send_batch(model, |model| add_references(model, &plan))?;
        log::info!("activated {pair} ({} reference records)", plan.record_count());
        Ok(plan)
    }

    /// Make an active relationship inactive; its definition is kept.
    pub fn deactivate<M>(
        &self,
        model: &mut M,
        pair: &RelationshipPair,
    ) -> RelationshipResult<ActivationPlan>
    where
        M: ModelSource + CommandSink,
    {
        let snapshot = model.snapshot()?;
        let plan = plan_deactivation(&snapshot, pair, self.options.graph).inspect_err(|err| {
            log::warn!("rejected deactivation of {pair}: {err}");
        })?;

        self.send_batch(model, |model| remove_references(model, &plan))?;
        log::info!("deactivated {pair} ({} reference records)", plan.record_count());
        Ok(plan)
    }

    /// Add a relationship definition, optionally activating it in the same batch.
    ///
    /// When `activate` is set the alternate-path check runs before the definition is written.
    pub fn define_relationship<M>(
        &self,
        model: &mut M,
        definition: RelationshipDefinition,
        activate: bool,
    ) -> RelationshipResult<Option<ActivationPlan>>
    where
        M: ModelSource + CommandSink,
    {
        let pair = definition.relationship.clone();
        validate_pair(&pair)?;

        let snapshot = model.snapshot()?;
        for table in [pair.primary_table(), pair.foreign_table()] {
            if snapshot.table(table).is_none() {
                return Err(RelationshipError::UnknownTable(table.to_string()));
            }
        }
        if snapshot.relationship(&pair).is_some() {
            return Err(RelationshipError::DuplicateRelationship(pair));
        }

        let plan = if activate {
            let plan = checked_activation_plan(&snapshot, &pair, self.options.graph)
                .inspect_err(|err| log::warn!("rejected activation of {pair}: {err}"))?;
            Some(plan)
        } else {
            None
        };

        self.send_batch(model, |model| {
            model.add_relationship(definition)?;
            if let Some(plan) = &plan {
                add_references(model, plan)?;
            }
            Ok(())
        })?;
        log::info!(
            "defined {pair}{}",
            if plan.is_some() { " (active)" } else { "" }
        );
        Ok(plan)
    }

    /// Remove a relationship definition, deactivating it first when it is active.
    pub fn drop_relationship<M>(
        &self,
        model: &mut M,
        pair: &RelationshipPair,
    ) -> RelationshipResult<()>
    where
        M: ModelSource + CommandSink,
    {
        validate_pair(pair)?;
        let snapshot = model.snapshot()?;
        if snapshot.relationship(pair).is_none() {
            return Err(RelationshipError::RelationshipNotFound(pair.clone()));
        }

        let plan = if snapshot.is_active(pair) {
            Some(plan_deactivation(&snapshot, pair, self.options.graph)?)
        } else {
            None
        };

        self.send_batch(model, |model| {
            if let Some(plan) = &plan {
                remove_references(model, plan)?;
            }
            model.remove_relationship(pair)
        })?;
        log::info!("dropped {pair}");
        Ok(())
    }

    /// Send one batch of edits and commit it. A failure anywhere in the batch rolls back
    /// everything issued since the last commit.
    fn send_batch<M, F>(&self, model: &mut M, edits: F) -> RelationshipResult<()>
    where
        M: CommandSink,
        F: FnOnce(&mut M) -> RelationshipResult<()>,
    {
        let result = edits(model).and_then(|()| {
            if self.options.commit_after_batch {
                model.commit()?;
            }
            Ok(())
        });

        if let Err(err) = &result {
            log::warn!("model rejected batch, rolling back: {err}");
            if let Err(rollback_err) = model.rollback() {
                log::error!("rollback after failed batch also failed: {rollback_err}");
            }
        }
        result
    }
}

fn add_references<M: CommandSink>(model: &mut M, plan: &ActivationPlan) -> RelationshipResult<()> {
    for record in plan.records() {
        model.add_reference(record.clone())?;
    }
    Ok(())
}

fn remove_references<M: CommandSink>(
    model: &mut M,
    plan: &ActivationPlan,
) -> RelationshipResult<()> {
    for record in plan.intermediates.iter().rev() {
        model.remove_reference(&record.table, &record.relationship)?;
    }
    model.remove_reference(&plan.direct.table, &plan.direct.relationship)
}

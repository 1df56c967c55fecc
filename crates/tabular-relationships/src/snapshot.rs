//! Read view of the external Tabular model.
//!
//! A [`ModelSnapshot`] is what the relationship graph is built from: the tables, the raw
//! relationship definitions (active or not), and the reference records that materialize
//! relationships for navigation. The external model remains the source of truth; a snapshot is
//! taken, used for one decision, and dropped.

use crate::ident::{table_eq, RelationshipPair};
use serde::{Deserialize, Serialize};

/// How a reference record is materialized in the external model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Materialization {
    /// A directly active relationship.
    Regular,
    /// A propagated intermediate reference required by an upstream table.
    Indirect,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub partitions: Vec<String>,
}

fn default_visible() -> bool {
    true
}

impl TableInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            visible: true,
            partitions: Vec::new(),
        }
    }
}

/// A raw relationship between two columns, independent of whether it is active.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDefinition {
    pub relationship: RelationshipPair,
    #[serde(default)]
    pub name: Option<String>,
}

impl RelationshipDefinition {
    pub fn new(relationship: RelationshipPair) -> Self {
        Self {
            relationship,
            name: None,
        }
    }
}

/// A reference held by `table` toward `relationship.primary.table`.
///
/// `Regular` records live on the foreign table of `relationship` and have no `via`. `Indirect`
/// records carry the directly activated relationship that caused them in `via`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRecord {
    pub table: String,
    pub relationship: RelationshipPair,
    pub materialization: Materialization,
    #[serde(default)]
    pub via: Option<RelationshipPair>,
}

impl ReferenceRecord {
    pub fn regular(relationship: RelationshipPair) -> Self {
        Self {
            table: relationship.foreign.table.clone(),
            relationship,
            materialization: Materialization::Regular,
            via: None,
        }
    }

    pub fn indirect(
        table: impl Into<String>,
        relationship: RelationshipPair,
        via: RelationshipPair,
    ) -> Self {
        Self {
            table: table.into(),
            relationship,
            materialization: Materialization::Indirect,
            via: Some(via),
        }
    }

    /// Two records address the same slot when they sit on the same table for the same pair.
    pub fn same_slot(&self, table: &str, relationship: &RelationshipPair) -> bool {
        table_eq(&self.table, table) && &self.relationship == relationship
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSnapshot {
    #[serde(default)]
    pub tables: Vec<TableInfo>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDefinition>,
    #[serde(default)]
    pub references: Vec<ReferenceRecord>,
}

impl ModelSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, id: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| table_eq(&t.id, id))
    }

    pub fn relationship(&self, pair: &RelationshipPair) -> Option<&RelationshipDefinition> {
        self.relationships.iter().find(|r| &r.relationship == pair)
    }

    pub fn reference(&self, table: &str, pair: &RelationshipPair) -> Option<&ReferenceRecord> {
        self.references.iter().find(|r| r.same_slot(table, pair))
    }

    /// Whether `pair` is currently materialized as an active (`Regular`) reference.
    pub fn is_active(&self, pair: &RelationshipPair) -> bool {
        self.references
            .iter()
            .any(|r| r.materialization == Materialization::Regular && &r.relationship == pair)
    }

    pub fn active_relationships(&self) -> impl Iterator<Item = &RelationshipPair> {
        self.references
            .iter()
            .filter(|r| r.materialization == Materialization::Regular)
            .map(|r| &r.relationship)
    }
}

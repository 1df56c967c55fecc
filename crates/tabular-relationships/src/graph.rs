//! Graph of active relationships.
//!
//! Each table gets a [`RelationshipGraphNode`] with two edge lists:
//! - `foreign_key_up`: relationships where the table is the primary ("one") side, i.e. edges
//!   toward the tables that reference it;
//! - `primary_key_down`: relationships where the table is the foreign ("many") side, i.e. edges
//!   toward the tables it references.
//!
//! Only active (`Regular`) references are recorded. The engine allows a single active path
//! between any two tables, so the graph is expected to be a DAG; every walk still tracks the
//! tables on the current path and fails with [`RelationshipError::CycleDetected`] instead of
//! recursing forever when that assumption is broken.

use crate::error::{RelationshipError, RelationshipResult};
use crate::ident::{fold_case, RelationshipPair};
use crate::options::GraphOptions;
use crate::snapshot::{Materialization, ModelSnapshot};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelationshipGraphNode {
    /// Table id as first seen while building the graph.
    pub table: String,
    pub foreign_key_up: Vec<RelationshipPair>,
    pub primary_key_down: Vec<RelationshipPair>,
}

impl RelationshipGraphNode {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WalkDirection {
    PrimaryKeyDown,
    ForeignKeyUp,
}

impl WalkDirection {
    fn next_table(self, pair: &RelationshipPair) -> &str {
        match self {
            WalkDirection::PrimaryKeyDown => pair.primary_table(),
            WalkDirection::ForeignKeyUp => pair.foreign_table(),
        }
    }
}

/// Result of one depth-first walk: reached tables and crossed edges, each listed once in
/// first-visit order.
#[derive(Default)]
struct Walk {
    tables: Vec<String>,
    edges: Vec<RelationshipPair>,
}

struct WalkState {
    direction: WalkDirection,
    start: String,
    path: Vec<String>,
    /// Folded key of each table on `path`, mapped to its position there.
    path_index: HashMap<String, usize>,
    visited: HashSet<String>,
    seen_edges: HashSet<RelationshipPair>,
    walk: Walk,
}

#[derive(Clone, Debug, Default)]
pub struct RelationshipGraph {
    nodes: HashMap<String, RelationshipGraphNode>,
    options: GraphOptions,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GraphOptions) -> Self {
        Self {
            nodes: HashMap::new(),
            options,
        }
    }

    pub fn from_snapshot(snapshot: &ModelSnapshot) -> Self {
        Self::from_snapshot_with_options(snapshot, GraphOptions::default())
    }

    pub fn from_snapshot_with_options(snapshot: &ModelSnapshot, options: GraphOptions) -> Self {
        let mut graph = Self::with_options(options);
        for reference in &snapshot.references {
            if reference.materialization != Materialization::Regular {
                continue;
            }
            graph.add_edge(reference.relationship.clone());
        }
        log::debug!(
            "built relationship graph: {} tables, {} active relationships",
            graph.nodes.len(),
            graph.edge_count()
        );
        graph
    }

    /// Record an active relationship. Adding the same pair twice is a no-op.
    pub fn add_edge(&mut self, pair: RelationshipPair) {
        let primary = self
            .nodes
            .entry(fold_case(pair.primary_table()))
            .or_insert_with(|| RelationshipGraphNode::new(pair.primary_table()));
        if !primary.foreign_key_up.contains(&pair) {
            primary.foreign_key_up.push(pair.clone());
        }

        let foreign = self
            .nodes
            .entry(fold_case(pair.foreign_table()))
            .or_insert_with(|| RelationshipGraphNode::new(pair.foreign_table()));
        if !foreign.primary_key_down.contains(&pair) {
            foreign.primary_key_down.push(pair);
        }
    }

    pub fn node(&self, table: &str) -> Option<&RelationshipGraphNode> {
        self.nodes.get(&fold_case(table))
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.nodes.values().map(|n| n.table.as_str())
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.primary_key_down.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Every table `table` transitively references.
    pub fn table_list_primary_key_down(&self, table: &str) -> RelationshipResult<Vec<String>> {
        Ok(self.walk(table, WalkDirection::PrimaryKeyDown)?.tables)
    }

    /// Every table that transitively references `table`.
    pub fn table_list_foreign_key_up(&self, table: &str) -> RelationshipResult<Vec<String>> {
        Ok(self.walk(table, WalkDirection::ForeignKeyUp)?.tables)
    }

    /// The relationships crossed while walking down from `table`.
    pub fn relationships_list_primary_key_down(
        &self,
        table: &str,
    ) -> RelationshipResult<Vec<RelationshipPair>> {
        Ok(self.walk(table, WalkDirection::PrimaryKeyDown)?.edges)
    }

    /// Whether activating a relationship from `foreign_table` to `primary_table` would give some
    /// pair of tables a second active path.
    ///
    /// Let `below` be everything `primary_table` already reaches, and `above` be `foreign_table`
    /// plus everything that reaches it. The new edge would let each table in `above` reach
    /// `primary_table` and all of `below`; if any of them already reaches one of those tables,
    /// the path would be ambiguous.
    pub fn relationship_alternate_path_exists(
        &self,
        primary_table: &str,
        foreign_table: &str,
    ) -> RelationshipResult<bool> {
        let primary_key = fold_case(primary_table);
        let below: HashSet<String> = self
            .table_list_primary_key_down(primary_table)?
            .iter()
            .map(|t| fold_case(t))
            .collect();

        let mut above = vec![foreign_table.to_string()];
        above.extend(self.table_list_foreign_key_up(foreign_table)?);

        for table in &above {
            for reached in self.table_list_primary_key_down(table)? {
                let key = fold_case(&reached);
                if key == primary_key || below.contains(&key) {
                    log::debug!(
                        "alternate path: {table} already reaches {reached} (activating {foreign_table} -> {primary_table})"
                    );
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn edges(&self, key: &str, direction: WalkDirection) -> &[RelationshipPair] {
        match self.nodes.get(key) {
            Some(node) => match direction {
                WalkDirection::PrimaryKeyDown => &node.primary_key_down,
                WalkDirection::ForeignKeyUp => &node.foreign_key_up,
            },
            None => &[],
        }
    }

    fn walk(&self, table: &str, direction: WalkDirection) -> RelationshipResult<Walk> {
        let key = fold_case(table);
        let mut state = WalkState {
            direction,
            start: table.to_string(),
            path: Vec::new(),
            path_index: HashMap::new(),
            visited: HashSet::from([key.clone()]),
            seen_edges: HashSet::new(),
            walk: Walk::default(),
        };
        self.visit(table, key, &mut state)?;
        Ok(state.walk)
    }

    fn visit(&self, table: &str, key: String, state: &mut WalkState) -> RelationshipResult<()> {
        let max_depth = self.options.effective_max_depth();
        if state.path.len() > max_depth {
            return Err(RelationshipError::DepthExceeded {
                table: state.start.clone(),
                max_depth,
            });
        }
        state.path_index.insert(key.clone(), state.path.len());
        state.path.push(table.to_string());

        for pair in self.edges(&key, state.direction) {
            let next = state.direction.next_table(pair);
            let next_key = fold_case(next);

            if let Some(&start) = state.path_index.get(&next_key) {
                let mut path = state.path[start..].to_vec();
                path.push(next.to_string());
                return Err(RelationshipError::CycleDetected { path });
            }

            if state.seen_edges.insert(pair.clone()) {
                state.walk.edges.push(pair.clone());
            }
            if state.visited.insert(next_key.clone()) {
                state.walk.tables.push(next.to_string());
                self.visit(next, next_key, state)?;
            }
        }

        state.path.pop();
        state.path_index.remove(&key);
        Ok(())
    }
}

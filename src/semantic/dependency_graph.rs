//! Dependency graph over derived fields.
//!
//! Nodes are derived fields; an edge `dependency -> consumer` records that
//! the consumer's requirements mention the dependency, either as an
//! attribute or as the terminal field of an order clause. References inside
//! nested joins count against the joined entity's fields.
//!
//! A topological sort yields the order in which fields can be closed so that
//! every dependency is processed before anything that consumes it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as EdgeDirection;

use crate::error::SchemaError;
use crate::model::registry::Catalog;
use crate::model::requirement::{FieldRef, OrderClause, OrderField, RequirementSet};

/// Why one derived field depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Attribute,
    Order,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Attribute => f.write_str("attribute"),
            EdgeKind::Order => f.write_str("order"),
        }
    }
}

/// Which references become edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edges {
    /// Attribute and order references: used for closure.
    All,
    /// Order references only: used for order inheritance.
    OrderOnly,
}

/// Directed graph of derived-field dependencies.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<FieldRef, EdgeKind>,
    node_index: HashMap<FieldRef, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a set of derived fields.
    ///
    /// Every field in `derived` becomes a node, even with no edges, so it
    /// shows up in [`processing_order`](Self::processing_order).
    pub fn build<C: Catalog + ?Sized>(
        catalog: &C,
        derived: &BTreeMap<FieldRef, RequirementSet>,
        edges: Edges,
    ) -> Self {
        let mut graph = Self::new();
        for field in derived.keys() {
            graph.add_field(field.clone());
        }
        for (consumer, requirements) in derived {
            graph.collect(catalog, consumer, &consumer.entity, requirements, edges);
        }
        graph
    }

    /// Get or create the node for a field.
    pub fn add_field(&mut self, field: FieldRef) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&field) {
            idx
        } else {
            let idx = self.graph.add_node(field.clone());
            self.node_index.insert(field, idx);
            idx
        }
    }

    /// Record that `consumer` depends on `dependency`. Repeated edges of the
    /// same kind are ignored.
    pub fn add_dependency(&mut self, consumer: FieldRef, dependency: FieldRef, kind: EdgeKind) {
        let from = self.add_field(dependency);
        let to = self.add_field(consumer);
        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|e| *e.weight() == kind);
        if !exists {
            self.graph.add_edge(from, to, kind);
        }
    }

    fn collect<C: Catalog + ?Sized>(
        &mut self,
        catalog: &C,
        consumer: &FieldRef,
        entity: &str,
        requirements: &RequirementSet,
        edges: Edges,
    ) {
        if edges == Edges::All {
            for name in requirements.field_names() {
                if catalog.is_derived(entity, name) {
                    self.add_dependency(
                        consumer.clone(),
                        FieldRef::new(entity, name),
                        EdgeKind::Attribute,
                    );
                }
            }
        }

        for clause in &requirements.order {
            if let OrderClause::Path(path) = clause {
                if let OrderField::Field(name) = &path.field {
                    let owner = path.owner(entity);
                    if catalog.is_derived(owner, name) {
                        self.add_dependency(
                            consumer.clone(),
                            FieldRef::new(owner, name.as_str()),
                            EdgeKind::Order,
                        );
                    }
                }
            }
        }

        for join in &requirements.joins {
            self.collect(catalog, consumer, &join.target, &join.requirements, edges);
        }
    }

    /// Fields in dependency order: every field comes after everything it
    /// depends on.
    ///
    /// Fails with [`SchemaError::CircularDependency`] naming the field where
    /// the cycle was detected and every field on the cycle.
    pub fn processing_order(&self) -> Result<Vec<FieldRef>, SchemaError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .map(|idx| self.graph[idx].clone())
                .collect()),
            Err(cycle) => {
                let at = &self.graph[cycle.node_id()];
                let members = self
                    .detect_cycles()
                    .into_iter()
                    .find(|members| members.contains(at))
                    .unwrap_or_else(|| vec![at.clone()]);
                Err(SchemaError::CircularDependency {
                    entity: at.entity.clone(),
                    field: at.field.clone(),
                    cycle: members.iter().map(|f| f.to_string()).collect(),
                })
            }
        }
    }

    /// Detect all cycles in the graph.
    ///
    /// Only strongly connected components with more than one node, or a
    /// single node with a self-loop, are cycles.
    pub fn detect_cycles(&self) -> Vec<Vec<FieldRef>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                if scc.len() == 1 {
                    let idx = scc[0];
                    self.graph.edges_connecting(idx, idx).next().is_some()
                } else {
                    true
                }
            })
            .map(|scc| {
                scc.into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect()
            })
            .collect()
    }

    /// Fields `field` depends on directly, with the kind of reference.
    pub fn direct_dependencies(&self, field: &FieldRef) -> Vec<(FieldRef, EdgeKind)> {
        let Some(&idx) = self.node_index.get(field) else {
            return vec![];
        };

        self.graph
            .edges_directed(idx, EdgeDirection::Incoming)
            .map(|edge| (self.graph[edge.source()].clone(), *edge.weight()))
            .collect()
    }

    pub fn field_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

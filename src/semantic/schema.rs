//! The closed schema and its one-time initialization.
//!
//! Initialization runs four passes over the registry:
//!
//! ```text
//! Registry ──► register_all ──► DependencyGraph(All) ──► close_all
//!                                                            │
//!          ClosedSchema ◄── inherit_all ◄── DependencyGraph(OrderOnly)
//! ```
//!
//! Any failure aborts the whole initialization. The result is immutable and
//! shared read-only by every request.

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;

use crate::config::Limits;
use crate::error::{RequestResult, SchemaResult};
use crate::model::declaration::QueryRequest;
use crate::model::registry::{Catalog, EntityDefinition, Registry};
use crate::model::requirement::{FieldRef, OrderClause, RequirementSet};

use super::closure::close_all;
use super::dependency_graph::{DependencyGraph, Edges};
use super::expand::{expand_request, Expansion};
use super::order_inheritance::{inherit_all, InheritedOrder};
use super::registrar::register_all;

/// A registry whose derived fields have all been closed.
///
/// Every derived field's requirements name base fields and joins only, and
/// every order clause that sorted by a derived field has been replaced by
/// that field's own order.
#[derive(Debug, Clone)]
pub struct ClosedSchema {
    registry: Registry,
    derived: BTreeMap<FieldRef, RequirementSet>,
    limits: Limits,
}

/// Close `registry` with default limits.
pub fn initialize_schema(registry: &Registry) -> SchemaResult<ClosedSchema> {
    initialize_schema_with(registry, Limits::default())
}

/// Close `registry`, applying `limits` to every declaration and request.
pub fn initialize_schema_with(registry: &Registry, limits: Limits) -> SchemaResult<ClosedSchema> {
    let mut derived = register_all(registry, &limits)?;

    let closure_order = DependencyGraph::build(registry, &derived, Edges::All).processing_order()?;
    close_all(registry, &closure_order, &mut derived);

    let order_graph = DependencyGraph::build(registry, &derived, Edges::OrderOnly);
    let inheritance_order = order_graph.processing_order()?;
    inherit_all(registry, &inheritance_order, &mut derived)?;

    log::info!(
        "closed schema: {} entities, {} derived fields",
        registry.len(),
        derived.len()
    );

    Ok(ClosedSchema {
        registry: registry.clone(),
        derived,
        limits,
    })
}

impl ClosedSchema {
    /// Closed requirements of one derived field.
    pub fn requirements(&self, entity: &str, field: &str) -> Option<&RequirementSet> {
        self.derived.get(&FieldRef::new(entity, field))
    }

    /// Derived fields of `entity` with their closed requirements, in
    /// declaration order.
    pub fn derived_fields(&self, entity: &str) -> Vec<(&str, &RequirementSet)> {
        let Some(def) = self.registry.entity(entity) else {
            return vec![];
        };
        def.derived_fields()
            .filter_map(|(name, _)| {
                self.derived
                    .get(&FieldRef::new(entity, name))
                    .map(|requirements| (name, requirements))
            })
            .collect()
    }

    /// Every closed derived field, keyed by entity and field.
    pub fn all_derived(&self) -> &BTreeMap<FieldRef, RequirementSet> {
        &self.derived
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Expand a request against `entity`.
    pub fn expand(&self, entity: &str, request: &QueryRequest) -> RequestResult<Expansion> {
        expand_request(self, entity, request)
    }
}

impl Catalog for ClosedSchema {
    fn entity(&self, name: &str) -> Option<&EntityDefinition> {
        self.registry.entity(name)
    }
}

impl InheritedOrder for ClosedSchema {
    fn inherited_order(&self, field: &FieldRef) -> Option<&[OrderClause]> {
        self.derived.inherited_order(field)
    }
}

/// Holds a [`ClosedSchema`] that is initialized at most once.
///
/// Concurrent callers of [`get_or_init`](Self::get_or_init) block until the
/// first initialization finishes. A failed initialization leaves the cell
/// empty so a later call can retry with a corrected registry.
#[derive(Debug, Default)]
pub struct SchemaCell {
    cell: OnceCell<ClosedSchema>,
    limits: Limits,
}

impl SchemaCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self {
            cell: OnceCell::new(),
            limits,
        }
    }

    /// The closed schema, initializing it from `registry` on first use.
    ///
    /// Once initialized, later registries are ignored; a registry that
    /// differs from the closed one is logged at `warn`.
    pub fn get_or_init(&self, registry: &Registry) -> SchemaResult<&ClosedSchema> {
        if let Some(schema) = self.cell.get() {
            if schema.registry() != registry {
                log::warn!(
                    "schema already initialized; ignoring a different registry ({} entities)",
                    registry.len()
                );
            }
            return Ok(schema);
        }
        self.cell
            .get_or_try_init(|| initialize_schema_with(registry, self.limits))
    }

    pub fn get(&self) -> Option<&ClosedSchema> {
        self.cell.get()
    }
}

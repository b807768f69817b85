//! Transitive closure of derived-field requirements.
//!
//! Fields are visited in dependency order. Each attribute naming another
//! derived field is dropped and replaced by that field's already-closed
//! requirements; the same happens inside nested joins, scoped to the joined
//! entity. By induction on the order, one pass leaves every derived field
//! expressed in base fields and joins only.

use std::collections::BTreeMap;

use crate::model::registry::Catalog;
use crate::model::requirement::{Attribute, FieldRef, JoinSpec, RequirementSet};

use super::merge::{merge_join, merge_requirements};

/// Close every field in `order`, rewriting `derived` in place.
///
/// `order` must list dependencies before their consumers, as produced by
/// [`DependencyGraph::processing_order`](super::dependency_graph::DependencyGraph::processing_order).
/// Re-running on an already closed map changes nothing.
pub fn close_all<C: Catalog + ?Sized>(
    catalog: &C,
    order: &[FieldRef],
    derived: &mut BTreeMap<FieldRef, RequirementSet>,
) {
    for field in order {
        let Some(requirements) = derived.get(field) else {
            continue;
        };
        let closed = close_set(catalog, &field.entity, requirements, &*derived);
        log::debug!("closed {}: {}", field, closed);
        derived.insert(field.clone(), closed);
    }
}

/// Close one requirement set scoped to `entity`, looking dependencies up in
/// `closed`.
pub fn close_set<C: Catalog + ?Sized>(
    catalog: &C,
    entity: &str,
    requirements: &RequirementSet,
    closed: &BTreeMap<FieldRef, RequirementSet>,
) -> RequirementSet {
    let mut inlined = Vec::new();
    let attributes = requirements.attributes.as_ref().map(|attributes| {
        let mut kept = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            match attribute {
                Attribute::Field(name) if catalog.is_derived(entity, name) => {
                    inlined.push(FieldRef::new(entity, name.as_str()));
                }
                _ => kept.push(attribute.clone()),
            }
        }
        kept
    });

    let mut out = RequirementSet {
        attributes,
        joins: Vec::with_capacity(requirements.joins.len()),
        order: requirements.order.clone(),
    };

    for join in &requirements.joins {
        let closed_join = JoinSpec {
            target: join.target.clone(),
            alias: join.alias.clone(),
            requirements: close_set(catalog, &join.target, &join.requirements, closed),
        };
        merge_join(&mut out.joins, &closed_join);
    }

    for dependency in &inlined {
        match closed.get(dependency) {
            Some(dependency_set) => merge_requirements(&mut out, dependency_set),
            None => log::warn!("no closed requirements for {}", dependency),
        }
    }

    out
}

//! Structural merge of requirement sets.
//!
//! - Attributes: union, first occurrence wins the position. `None` ("all
//!   fields") absorbs anything merged with it.
//! - Joins: same target and alias merge recursively, others are appended.
//! - Order: concatenation, skipping clauses the consumer already has.
//!
//! Used both when closing the schema and when expanding a request.

use crate::model::requirement::{Attribute, JoinSpec, OrderClause, RequirementSet};

/// Merge `from` into `into`.
pub fn merge_requirements(into: &mut RequirementSet, from: &RequirementSet) {
    merge_attributes(&mut into.attributes, from.attributes.as_deref());
    for join in &from.joins {
        merge_join(&mut into.joins, join);
    }
    for clause in &from.order {
        merge_order_clause(&mut into.order, clause);
    }
}

/// Union two attribute lists. `from: None` widens `into` to all fields.
pub fn merge_attributes(into: &mut Option<Vec<Attribute>>, from: Option<&[Attribute]>) {
    match (into.as_mut(), from) {
        (None, _) => {}
        (Some(_), None) => *into = None,
        (Some(attributes), Some(incoming)) => {
            for attribute in incoming {
                merge_attribute(attributes, attribute.clone());
            }
        }
    }
}

pub fn merge_attribute(attributes: &mut Vec<Attribute>, attribute: Attribute) {
    if !attributes.contains(&attribute) {
        attributes.push(attribute);
    }
}

/// Merge one join into a join list by (target, alias) identity.
pub fn merge_join(joins: &mut Vec<JoinSpec>, join: &JoinSpec) {
    match joins.iter_mut().find(|existing| existing.same_join(join)) {
        Some(existing) => merge_requirements(&mut existing.requirements, &join.requirements),
        None => joins.push(join.clone()),
    }
}

pub fn merge_order_clause(order: &mut Vec<OrderClause>, clause: &OrderClause) {
    if !order.contains(clause) {
        order.push(clause.clone());
    }
}

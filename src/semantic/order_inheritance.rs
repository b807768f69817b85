//! Order inheritance: sorting by a derived field means sorting by that
//! field's own order clauses.
//!
//! A structured clause whose terminal field is derived is replaced, in
//! place, by the derived field's order clauses, each prefixed with the
//! original clause's join path; the inherited directions are kept as they
//! are. Raw clauses and clauses on base fields pass through untouched. A
//! spliced clause is skipped when it is already in the list, and a later
//! clause equal to a spliced one is skipped too.

use std::collections::BTreeMap;

use crate::error::SchemaError;
use crate::model::registry::Catalog;
use crate::model::requirement::{
    FieldRef, JoinSpec, OrderClause, OrderField, RequirementSet,
};

use super::merge::merge_order_clause;

/// Source of the (already substituted) order clauses of derived fields.
pub trait InheritedOrder {
    fn inherited_order(&self, field: &FieldRef) -> Option<&[OrderClause]>;
}

impl InheritedOrder for BTreeMap<FieldRef, RequirementSet> {
    fn inherited_order(&self, field: &FieldRef) -> Option<&[OrderClause]> {
        self.get(field).map(|set| set.order.as_slice())
    }
}

/// Substitute order clauses for every field in `order`, rewriting `derived`
/// in place. `order` must list a field after every field its order clauses
/// sort by.
pub fn inherit_all<C: Catalog + ?Sized>(
    catalog: &C,
    order: &[FieldRef],
    derived: &mut BTreeMap<FieldRef, RequirementSet>,
) -> Result<(), SchemaError> {
    for field in order {
        let Some(requirements) = derived.get(field) else {
            continue;
        };
        let rewritten = substitute_set(catalog, &field.entity, requirements, &*derived).map_err(
            |missing| SchemaError::MissingOrderClause {
                entity: missing.entity,
                field: missing.field,
                referenced_by: field.to_string(),
            },
        )?;
        derived.insert(field.clone(), rewritten);
    }
    Ok(())
}

/// Substitute the order of `requirements` and of every nested join.
///
/// On failure returns the derived field that was sorted by but has no
/// order clauses.
pub fn substitute_set<C, S>(
    catalog: &C,
    entity: &str,
    requirements: &RequirementSet,
    source: &S,
) -> Result<RequirementSet, FieldRef>
where
    C: Catalog + ?Sized,
    S: InheritedOrder + ?Sized,
{
    let joins = requirements
        .joins
        .iter()
        .map(|join| {
            Ok(JoinSpec {
                target: join.target.clone(),
                alias: join.alias.clone(),
                requirements: substitute_set(catalog, &join.target, &join.requirements, source)?,
            })
        })
        .collect::<Result<Vec<_>, FieldRef>>()?;

    Ok(RequirementSet {
        attributes: requirements.attributes.clone(),
        joins,
        order: substitute_order(catalog, entity, &requirements.order, source)?,
    })
}

/// Substitute one order list scoped to `entity`.
pub fn substitute_order<C, S>(
    catalog: &C,
    entity: &str,
    clauses: &[OrderClause],
    source: &S,
) -> Result<Vec<OrderClause>, FieldRef>
where
    C: Catalog + ?Sized,
    S: InheritedOrder + ?Sized,
{
    let mut out = Vec::with_capacity(clauses.len());
    let mut spliced: Vec<OrderClause> = Vec::new();
    for clause in clauses {
        let OrderClause::Path(path) = clause else {
            out.push(clause.clone());
            continue;
        };
        let owner = path.owner(entity);
        let name = match &path.field {
            OrderField::Field(name) if catalog.is_derived(owner, name) => name,
            _ => {
                if !spliced.contains(clause) {
                    out.push(clause.clone());
                }
                continue;
            }
        };

        let referenced = FieldRef::new(owner, name.as_str());
        let inherited = match source.inherited_order(&referenced) {
            Some(inherited) if !inherited.is_empty() => inherited,
            _ => return Err(referenced),
        };
        for inner in inherited {
            let clause = inner.reparented(&path.joins);
            merge_order_clause(&mut out, &clause);
            spliced.push(clause);
        }
    }
    Ok(out)
}

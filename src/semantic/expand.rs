//! Request expansion.
//!
//! A request names fields the caller wants back, some of which may be
//! derived. Expansion replaces each derived field with its closed
//! requirements (recursively for every joined entity), substitutes derived
//! sort keys and reports everything it added, so the caller can compute the
//! derived values and strip the helper data before answering.

use serde::Serialize;

use crate::error::{RequestError, RequestResult};
use crate::model::declaration::QueryRequest;
use crate::model::registry::Catalog;
use crate::model::requirement::{Attribute, JoinRef, JoinSpec, OrderClause, RequirementSet};

use super::merge::{merge_attribute, merge_requirements};
use super::normalize::Normalizer;
use super::order_inheritance::substitute_order;
use super::schema::ClosedSchema;

/// An expanded request plus what was injected into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expansion {
    pub request: RequirementSet,
    pub injected: InjectionReport,
}

/// What expansion added at one entity level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InjectionReport {
    /// Derived fields whose values the caller must compute.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<String>,
    /// Base attributes fetched only to compute derived fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<InjectedJoin>,
}

/// Injection report for one join of the expanded request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectedJoin {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// The whole join is helper data: the request did not ask for it.
    pub added: bool,
    pub injected: InjectionReport,
}

impl InjectionReport {
    /// True when expansion added nothing anywhere in the tree.
    pub fn is_empty(&self) -> bool {
        self.derived.is_empty()
            && self.attributes.is_empty()
            && self
                .joins
                .iter()
                .all(|join| !join.added && join.injected.is_empty())
    }

    /// Every injected derived field as a dotted path from the root entity,
    /// e.g. `Label` or `Person:Owner.Display`.
    pub fn derived_fields(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_derived("", &mut out);
        out
    }

    fn collect_derived(&self, prefix: &str, out: &mut Vec<String>) {
        out.extend(self.derived.iter().map(|field| format!("{}{}", prefix, field)));
        for join in &self.joins {
            let step = JoinRef {
                target: join.target.clone(),
                alias: join.alias.clone(),
            };
            join.injected.collect_derived(&format!("{}{}.", prefix, step), out);
        }
    }
}

/// Expand `request` against `entity`.
///
/// Fails without touching the schema; later requests are unaffected.
pub fn expand_request(
    schema: &ClosedSchema,
    entity: &str,
    request: &QueryRequest,
) -> RequestResult<Expansion> {
    let normalized = Normalizer::for_request(schema, schema.limits()).requirements(
        entity,
        request.attributes.as_ref(),
        request.joins.as_ref(),
        &request.order,
        0,
    )?;

    let (expanded, injected) = expand_level(schema, entity, &normalized, Some(&normalized))?;
    log::debug!("expanded request on {}: {}", entity, expanded);

    Ok(Expansion {
        request: expanded,
        injected,
    })
}

/// Expand one entity level.
///
/// `requested` is what the caller asked for at this level, or `None` when the
/// whole level was injected.
fn expand_level(
    schema: &ClosedSchema,
    entity: &str,
    set: &RequirementSet,
    requested: Option<&RequirementSet>,
) -> RequestResult<(RequirementSet, InjectionReport)> {
    let mut report = InjectionReport::default();
    let mut out = RequirementSet {
        attributes: None,
        joins: set.joins.clone(),
        order: set.order.clone(),
    };

    // Derived entries are dropped from the list, then their requirements are
    // merged after the remaining entries.
    let mut inlined: Vec<&str> = Vec::new();
    match &set.attributes {
        Some(attributes) => {
            let mut kept = Vec::with_capacity(attributes.len());
            for attribute in attributes {
                match attribute {
                    Attribute::Field(name) if schema.is_derived(entity, name) => {
                        inlined.push(name.as_str())
                    }
                    _ => merge_attribute(&mut kept, attribute.clone()),
                }
            }
            out.attributes = Some(kept);
        }
        None => inlined.extend(schema.derived_fields(entity).into_iter().map(|(name, _)| name)),
    }

    for name in inlined {
        match schema.requirements(entity, name) {
            Some(closed) => merge_requirements(&mut out, closed),
            None => log::warn!("no closed requirements for {}.{}", entity, name),
        }
        report.derived.push(name.to_string());
    }

    for join in std::mem::take(&mut out.joins) {
        let requested_join = requested
            .and_then(|r| r.find_join(&join.target, join.alias.as_deref()))
            .map(|j| &j.requirements);
        let (requirements, injected) =
            expand_level(schema, &join.target, &join.requirements, requested_join)?;
        report.joins.push(InjectedJoin {
            target: join.target.clone(),
            alias: join.alias.clone(),
            added: requested_join.is_none(),
            injected,
        });
        out.joins.push(JoinSpec {
            target: join.target,
            alias: join.alias,
            requirements,
        });
    }

    let resolved: Vec<OrderClause> = out
        .order
        .iter()
        .map(|clause| resolve_aliases(clause, &out.joins))
        .collect();
    out.order = substitute_order(schema, entity, &resolved, schema).map_err(|missing| {
        RequestError::MissingOrderClause {
            entity: missing.entity,
            field: missing.field,
        }
    })?;

    report.attributes = match requested {
        None => out.field_names().map(str::to_string).collect(),
        Some(RequirementSet {
            attributes: Some(asked),
            ..
        }) => out
            .field_names()
            .filter(|name| !asked.iter().any(|a| a.field_name() == Some(*name)))
            .map(str::to_string)
            .collect(),
        Some(_) => Vec::new(),
    };

    Ok((out, report))
}

/// Give unaliased order path steps the alias of the join the request
/// actually uses for them.
fn resolve_aliases(clause: &OrderClause, joins: &[JoinSpec]) -> OrderClause {
    let OrderClause::Path(path) = clause else {
        return clause.clone();
    };

    let mut resolved = path.clone();
    let mut level = joins;
    for step in &mut resolved.joins {
        let Some(join) = find_request_join(level, step) else {
            break;
        };
        step.alias = join.alias.clone();
        level = &join.requirements.joins;
    }
    OrderClause::Path(resolved)
}

fn find_request_join<'a>(joins: &'a [JoinSpec], step: &JoinRef) -> Option<&'a JoinSpec> {
    if step.alias.is_some() {
        return joins
            .iter()
            .find(|join| join.matches(&step.target, step.alias.as_deref()));
    }
    let candidates: Vec<&JoinSpec> = joins.iter().filter(|j| j.target == step.target).collect();
    candidates
        .iter()
        .copied()
        .find(|join| join.alias.is_none())
        .or(match candidates.as_slice() {
            [only] => Some(*only),
            _ => None,
        })
}

//! Normalization of attribute, join and order declarations.
//!
//! Turns the loosely-shaped [declaration](crate::model::declaration) forms into
//! [requirement](crate::model::requirement) forms, validating every name
//! against a [`Catalog`] on the way. The registrar runs this once per derived
//! field; the expander runs it once per request.

use crate::config::Limits;
use crate::error::DeclarationError;
use crate::model::declaration::{
    AttributeDecl, JoinDecl, JoinDeclSpec, OneOrMany, OrderDecl, OrderItemDecl,
};
use crate::model::registry::Catalog;
use crate::model::requirement::{
    Attribute, Direction, JoinRef, JoinSpec, OrderClause, OrderField, OrderPath, RequirementSet,
};

use super::merge::{merge_attribute, merge_join};

type Result<T> = std::result::Result<T, DeclarationError>;

/// Normalizer bound to a catalog and a set of limits.
pub struct Normalizer<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    limits: &'a Limits,
    allow_raw_attributes: bool,
}

impl<'a, C: Catalog + ?Sized> Normalizer<'a, C> {
    /// Normalizer for derived-field declarations: attributes must be field names.
    pub fn for_schema(catalog: &'a C, limits: &'a Limits) -> Self {
        Self {
            catalog,
            limits,
            allow_raw_attributes: false,
        }
    }

    /// Normalizer for requests: raw attributes pass through.
    pub fn for_request(catalog: &'a C, limits: &'a Limits) -> Self {
        Self {
            catalog,
            limits,
            allow_raw_attributes: true,
        }
    }

    /// Normalize a full requirement set scoped to `entity`.
    ///
    /// `depth` is the number of joins between the root entity and `entity`.
    pub fn requirements(
        &self,
        entity: &str,
        attributes: Option<&OneOrMany<AttributeDecl>>,
        joins: Option<&OneOrMany<JoinDecl>>,
        order: &[OrderDecl],
        depth: usize,
    ) -> Result<RequirementSet> {
        self.require_entity(entity)?;
        Ok(RequirementSet {
            attributes: self.attributes(entity, attributes)?,
            joins: self.joins(entity, joins, depth)?,
            order: self.order(entity, order)?,
        })
    }

    /// Normalize an attribute list. `None` stays `None` ("all fields").
    pub fn attributes(
        &self,
        entity: &str,
        decl: Option<&OneOrMany<AttributeDecl>>,
    ) -> Result<Option<Vec<Attribute>>> {
        let Some(decl) = decl else {
            return Ok(None);
        };

        let mut attributes = Vec::new();
        for item in decl.as_slice() {
            let attribute = match item {
                AttributeDecl::Name(name) => {
                    self.require_field(entity, name)?;
                    Attribute::Field(name.clone())
                }
                AttributeDecl::Raw(token) if self.allow_raw_attributes => Attribute::Raw {
                    raw: token.raw.clone(),
                },
                AttributeDecl::Raw(token) => {
                    return Err(DeclarationError::InvalidAttribute {
                        entity: entity.to_string(),
                        detail: format!("raw attribute '{}' where a field name is required", token.raw),
                    })
                }
                AttributeDecl::Other(value) => {
                    return Err(DeclarationError::InvalidAttribute {
                        entity: entity.to_string(),
                        detail: format!("expected a field name, got {}", value),
                    })
                }
            };
            merge_attribute(&mut attributes, attribute);
        }
        Ok(Some(attributes))
    }

    /// Normalize a join list hanging off `parent`. Joins to the same
    /// target and alias are merged.
    pub fn joins(
        &self,
        parent: &str,
        decl: Option<&OneOrMany<JoinDecl>>,
        depth: usize,
    ) -> Result<Vec<JoinSpec>> {
        let mut joins = Vec::new();
        for item in decl.map(OneOrMany::as_slice).unwrap_or_default() {
            let join = self.join(parent, item, depth + 1)?;
            merge_join(&mut joins, &join);
        }
        Ok(joins)
    }

    /// Normalize one join declaration into `{target, alias}` form and
    /// validate its association from `parent`.
    pub fn join(&self, parent: &str, decl: &JoinDecl, depth: usize) -> Result<JoinSpec> {
        if depth > self.limits.max_join_depth {
            return Err(DeclarationError::JoinDepthExceeded {
                entity: parent.to_string(),
                limit: self.limits.max_join_depth,
            });
        }

        let bare;
        let spec: &JoinDeclSpec = match decl {
            JoinDecl::Entity(name) => {
                bare = JoinDeclSpec::new(name.clone());
                &bare
            }
            JoinDecl::Spec(spec) => &**spec,
            JoinDecl::Other(value) => {
                return Err(DeclarationError::InvalidJoin {
                    entity: parent.to_string(),
                    detail: format!("expected an entity name or join object, got {}", value),
                })
            }
        };

        let step = self.join_step(parent, &spec.target, spec.alias.as_deref())?;
        let requirements = self.requirements(
            &step.target,
            spec.attributes.as_ref(),
            spec.joins.as_ref(),
            &spec.order,
            depth,
        )?;

        Ok(JoinSpec {
            target: step.target,
            alias: step.alias,
            requirements,
        })
    }

    /// Normalize an order list scoped to `entity`.
    pub fn order(&self, entity: &str, decls: &[OrderDecl]) -> Result<Vec<OrderClause>> {
        decls
            .iter()
            .map(|decl| self.order_clause(entity, decl))
            .collect()
    }

    /// Normalize one order entry.
    ///
    /// A bare field sorts ascending. In a path array, a trailing
    /// case-insensitive `asc`/`desc` is the direction (otherwise ASC is
    /// implied), the element before it is the sort key, and everything before
    /// that is a join path whose every step must be an association of the
    /// step before it.
    pub fn order_clause(&self, entity: &str, decl: &OrderDecl) -> Result<OrderClause> {
        match decl {
            OrderDecl::Raw(token) => Ok(OrderClause::Raw {
                raw: token.raw.clone(),
            }),
            OrderDecl::Field(name) => {
                self.require_field(entity, name)?;
                Ok(OrderClause::by(name.clone(), Direction::Asc))
            }
            OrderDecl::Path(items) => self.order_path(entity, items).map(OrderClause::Path),
            OrderDecl::Other(value) => Err(invalid_order(
                entity,
                format!("expected a field, path array or raw token, got {}", value),
            )),
        }
    }

    fn order_path(&self, entity: &str, items: &[OrderItemDecl]) -> Result<OrderPath> {
        let mut items = items;
        let mut direction = Direction::Asc;
        if let [rest @ .., OrderItemDecl::Name(token)] = items {
            if !rest.is_empty() {
                if let Some(parsed) = Direction::parse(token) {
                    direction = parsed;
                    items = rest;
                }
            }
        }

        let Some((terminal, segments)) = items.split_last() else {
            return Err(invalid_order(entity, "empty order path".to_string()));
        };

        let mut parent = entity.to_string();
        let mut joins = Vec::with_capacity(segments.len());
        for segment in segments {
            let step = match segment {
                OrderItemDecl::Name(target) => self.join_step(&parent, target, None)?,
                OrderItemDecl::Join(join) => {
                    self.join_step(&parent, &join.target, join.alias.as_deref())?
                }
                OrderItemDecl::Raw(token) => {
                    return Err(invalid_order(
                        entity,
                        format!("raw token '{}' inside an order path", token.raw),
                    ))
                }
                OrderItemDecl::Other(value) => {
                    return Err(invalid_order(
                        entity,
                        format!("expected a join in order path, got {}", value),
                    ))
                }
            };
            parent = step.target.clone();
            joins.push(step);
        }

        let field = match terminal {
            OrderItemDecl::Name(name) => {
                self.require_field(&parent, name)?;
                OrderField::Field(name.clone())
            }
            OrderItemDecl::Raw(token) => OrderField::Raw {
                raw: token.raw.clone(),
            },
            OrderItemDecl::Join(join) => {
                return Err(invalid_order(
                    entity,
                    format!("order path ends in join '{}' instead of a field", join.target),
                ))
            }
            OrderItemDecl::Other(value) => {
                return Err(invalid_order(
                    entity,
                    format!("expected a sort field, got {}", value),
                ))
            }
        };

        Ok(OrderPath {
            joins,
            field,
            direction,
        })
    }

    fn join_step(&self, parent: &str, target: &str, alias: Option<&str>) -> Result<JoinRef> {
        self.require_entity(target)?;
        if self.catalog.association(parent, target, alias).is_none() {
            return Err(DeclarationError::InvalidAssociation {
                entity: parent.to_string(),
                target: target.to_string(),
                alias: alias.map(str::to_string),
            });
        }
        Ok(JoinRef {
            target: target.to_string(),
            alias: alias.map(str::to_string),
        })
    }

    fn require_entity(&self, name: &str) -> Result<()> {
        match self.catalog.entity(name) {
            Some(_) => Ok(()),
            None => Err(DeclarationError::UnknownEntity {
                name: name.to_string(),
            }),
        }
    }

    fn require_field(&self, entity: &str, field: &str) -> Result<()> {
        match self.catalog.field_kind(entity, field) {
            Some(_) => Ok(()),
            None => Err(DeclarationError::UnknownField {
                entity: entity.to_string(),
                field: field.to_string(),
            }),
        }
    }
}

fn invalid_order(entity: &str, detail: String) -> DeclarationError {
    DeclarationError::InvalidOrderClause {
        entity: entity.to_string(),
        detail,
    }
}

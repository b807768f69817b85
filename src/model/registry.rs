//! Entity registry: entities, their fields and their associations.
//!
//! The registry is owned by the host; this crate only reads it through the
//! [`Catalog`] trait. [`Registry`] is the in-memory implementation used by
//! the loader, the CLI and the tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::declaration::DerivedDecl;

/// Lookups the resolver needs from an entity registry.
pub trait Catalog {
    /// Look up an entity by name.
    fn entity(&self, name: &str) -> Option<&EntityDefinition>;

    /// Look up the association `(target, alias)` declared on `entity`.
    ///
    /// With an alias, both target and effective alias must match. Without
    /// one, the association whose effective alias is the target's own name
    /// wins; failing that, the only association to `target` does.
    fn association(
        &self,
        entity: &str,
        target: &str,
        alias: Option<&str>,
    ) -> Option<&AssociationDefinition> {
        let def = self.entity(entity)?;
        match alias {
            Some(alias) => def
                .associations
                .iter()
                .find(|a| a.target == target && a.effective_alias() == alias),
            None => {
                let candidates: Vec<&AssociationDefinition> = def
                    .associations
                    .iter()
                    .filter(|a| a.target == target)
                    .collect();
                candidates
                    .iter()
                    .copied()
                    .find(|a| a.effective_alias() == target)
                    .or(match candidates.as_slice() {
                        [only] => Some(*only),
                        _ => None,
                    })
            }
        }
    }

    /// Classify `field` on `entity`; `None` if either is unknown.
    fn field_kind(&self, entity: &str, field: &str) -> Option<FieldKind> {
        self.entity(entity)?.field(field).map(FieldDefinition::kind)
    }

    fn is_derived(&self, entity: &str, field: &str) -> bool {
        self.field_kind(entity, field) == Some(FieldKind::Derived)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Base,
    Derived,
}

/// A field on an entity. Carries a [`DerivedDecl`] when derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Informational column type for base fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedDecl>,
}

impl FieldDefinition {
    pub fn base(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            derived: None,
        }
    }

    pub fn derived(name: impl Into<String>, decl: DerivedDecl) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            derived: Some(decl),
        }
    }

    pub fn kind(&self) -> FieldKind {
        if self.derived.is_some() {
            FieldKind::Derived
        } else {
            FieldKind::Base
        }
    }
}

/// How the target relates to the source entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    #[default]
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDefinition {
    pub target: String,
    /// Defaults to the target's name.
    #[serde(default, alias = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub kind: AssociationKind,
}

impl AssociationDefinition {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            alias: None,
            kind: AssociationKind::default(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_kind(mut self, kind: AssociationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn effective_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub associations: Vec<AssociationDefinition>,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_base(self, name: impl Into<String>) -> Self {
        self.with_field(FieldDefinition::base(name))
    }

    pub fn with_derived(self, name: impl Into<String>, decl: DerivedDecl) -> Self {
        self.with_field(FieldDefinition::derived(name, decl))
    }

    pub fn with_association(mut self, association: AssociationDefinition) -> Self {
        self.associations.push(association);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Derived fields with their declarations, in declaration order.
    pub fn derived_fields(&self) -> impl Iterator<Item = (&str, &DerivedDecl)> {
        self.fields
            .iter()
            .filter_map(|f| f.derived.as_ref().map(|d| (f.name.as_str(), d)))
    }
}

/// In-memory entity registry keyed by entity name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    entities: BTreeMap<String, EntityDefinition>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, replacing any previous entity of the same name.
    /// Use the loader for duplicate-checked construction.
    pub fn insert(&mut self, entity: EntityDefinition) -> Option<EntityDefinition> {
        self.entities.insert(entity.name.clone(), entity)
    }

    pub fn with_entity(mut self, entity: EntityDefinition) -> Self {
        self.insert(entity);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityDefinition> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Catalog for Registry {
    fn entity(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities.get(name)
    }
}

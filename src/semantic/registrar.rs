//! Schema registrar: validates and normalizes every derived field's
//! declaration before any closure work runs.

use std::collections::BTreeMap;

use crate::config::Limits;
use crate::error::SchemaError;
use crate::model::declaration::DerivedDecl;
use crate::model::registry::{Catalog, Registry};
use crate::model::requirement::{FieldRef, RequirementSet};

use super::normalize::Normalizer;

/// Normalize one derived field of `entity`.
///
/// Attributes must be field names on `entity`; a field that declares no
/// attributes needs none of its own. Joins and order paths are resolved
/// against the catalog's associations.
pub fn register<C: Catalog + ?Sized>(
    catalog: &C,
    entity: &str,
    field: &str,
    decl: &DerivedDecl,
    limits: &Limits,
) -> Result<RequirementSet, SchemaError> {
    let normalizer = Normalizer::for_schema(catalog, limits);
    let mut requirements = normalizer
        .requirements(
            entity,
            decl.attributes.as_ref(),
            decl.joins.as_ref(),
            &decl.order,
            0,
        )
        .map_err(|source| SchemaError::Invalid {
            entity: entity.to_string(),
            field: field.to_string(),
            source,
        })?;

    if requirements.attributes.is_none() {
        requirements.attributes = Some(Vec::new());
    }

    log::debug!("registered {}.{}: {}", entity, field, requirements);
    Ok(requirements)
}

/// Register every derived field in the registry.
///
/// Stops at the first invalid field; nothing registered so far is returned.
pub fn register_all(
    registry: &Registry,
    limits: &Limits,
) -> Result<BTreeMap<FieldRef, RequirementSet>, SchemaError> {
    let mut derived = BTreeMap::new();
    for entity in registry.entities() {
        for (field, decl) in entity.derived_fields() {
            let requirements = register(registry, &entity.name, field, decl, limits)?;
            derived.insert(FieldRef::new(entity.name.as_str(), field), requirements);
        }
    }
    Ok(derived)
}

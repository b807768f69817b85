//! Error types for schema initialization and request expansion.
//!
//! Normalization of attribute, join and order declarations is shared between
//! the registrar (schema time) and the expander (request time), so its
//! failures live in [`DeclarationError`]. The two phases wrap it with their
//! own context: [`SchemaError`] names the derived field being registered,
//! [`RequestError`] is returned per request and never poisons the schema.

use thiserror::Error;

/// A malformed or unresolvable attribute, join or order declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("Unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    #[error("Unknown entity: '{name}'")]
    UnknownEntity { name: String },

    #[error("Invalid attribute on entity '{entity}': {detail}")]
    InvalidAttribute { entity: String, detail: String },

    #[error("Invalid join on entity '{entity}': {detail}")]
    InvalidJoin { entity: String, detail: String },

    #[error("Invalid order clause on entity '{entity}': {detail}")]
    InvalidOrderClause { entity: String, detail: String },

    #[error("No association from '{entity}' to '{target}'{}", alias_suffix(.alias))]
    InvalidAssociation {
        entity: String,
        target: String,
        alias: Option<String>,
    },

    #[error("Joins nested deeper than {limit} levels below entity '{entity}'")]
    JoinDepthExceeded { entity: String, limit: usize },
}

fn alias_suffix(alias: &Option<String>) -> String {
    match alias {
        Some(alias) => format!(" as '{}'", alias),
        None => String::new(),
    }
}

/// Schema initialization failure. Initialization is all-or-nothing: no
/// partially closed schema is ever returned alongside one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Derived field '{entity}.{field}' is invalid: {source}")]
    Invalid {
        entity: String,
        field: String,
        #[source]
        source: DeclarationError,
    },

    #[error("Circular dependency at '{entity}.{field}': {}", .cycle.join(" -> "))]
    CircularDependency {
        entity: String,
        field: String,
        /// Every `entity.field` in the offending cycle.
        cycle: Vec<String>,
    },

    #[error(
        "Order clause of '{referenced_by}' sorts by derived field '{entity}.{field}', \
         which declares no order of its own"
    )]
    MissingOrderClause {
        entity: String,
        field: String,
        referenced_by: String,
    },
}

impl SchemaError {
    /// The underlying declaration error, if this is a validation failure.
    pub fn declaration(&self) -> Option<&DeclarationError> {
        match self {
            SchemaError::Invalid { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure expanding a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error(transparent)]
    Invalid(#[from] DeclarationError),

    #[error("Cannot order by derived field '{entity}.{field}': it declares no order")]
    MissingOrderClause { entity: String, field: String },
}

pub type SchemaResult<T> = Result<T, SchemaError>;
pub type RequestResult<T> = Result<T, RequestError>;

//! Declaration shapes, as written in a registry document or an incoming request.
//!
//! These mirror what users actually write: a single attribute instead of a
//! list, a bare entity name instead of a join object, `['name', 'desc']`
//! order arrays. Each loosely-shaped position is a tagged union with a
//! catch-all `Other` variant, so malformed input survives deserialization and
//! is rejected during normalization with an error that names the entity.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single value or a list of values.
///
/// `Many` is tried first: the item types carry a catch-all variant that
/// would otherwise swallow a whole array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item),
            OneOrMany::Many(items) => items,
        }
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        OneOrMany::Many(items)
    }
}

/// Opaque token: `{ raw = "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawToken {
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeDecl {
    Name(String),
    Raw(RawToken),
    Other(Value),
}

impl From<&str> for AttributeDecl {
    fn from(name: &str) -> Self {
        AttributeDecl::Name(name.to_string())
    }
}

/// Join declaration: a bare entity name or a join object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinDecl {
    Entity(String),
    Spec(Box<JoinDeclSpec>),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinDeclSpec {
    #[serde(alias = "model", alias = "entity")]
    pub target: String,
    #[serde(default, alias = "as")]
    pub alias: Option<String>,
    #[serde(default)]
    pub attributes: Option<OneOrMany<AttributeDecl>>,
    #[serde(default, alias = "include")]
    pub joins: Option<OneOrMany<JoinDecl>>,
    #[serde(default)]
    pub order: Vec<OrderDecl>,
}

impl JoinDeclSpec {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            alias: None,
            attributes: None,
            joins: None,
            order: Vec::new(),
        }
    }
}

/// One element of an order path array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderItemDecl {
    Name(String),
    Raw(RawToken),
    Join(JoinRefDecl),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinRefDecl {
    #[serde(alias = "model", alias = "entity")]
    pub target: String,
    #[serde(default, alias = "as")]
    pub alias: Option<String>,
}

/// One entry of an order list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderDecl {
    /// A bare field name, sorted ascending.
    Field(String),
    Raw(RawToken),
    /// `[join..., field, direction?]`
    Path(Vec<OrderItemDecl>),
    Other(Value),
}

/// The requirements a derived field declares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedDecl {
    #[serde(default)]
    pub attributes: Option<OneOrMany<AttributeDecl>>,
    #[serde(default, alias = "include")]
    pub joins: Option<OneOrMany<JoinDecl>>,
    #[serde(default)]
    pub order: Vec<OrderDecl>,
}

/// A request against one entity, before expansion.
///
/// Absent `attributes` means "all fields".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub attributes: Option<OneOrMany<AttributeDecl>>,
    #[serde(default, alias = "include")]
    pub joins: Option<OneOrMany<JoinDecl>>,
    #[serde(default)]
    pub order: Vec<OrderDecl>,
}

impl QueryRequest {
    pub fn attributes<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: Some(OneOrMany::Many(
                attributes
                    .into_iter()
                    .map(|a| AttributeDecl::Name(a.into()))
                    .collect(),
            )),
            ..Self::default()
        }
    }
}

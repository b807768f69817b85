//! Normalized requirement shapes.
//!
//! Everything here has already passed through normalization: join targets are
//! resolved entity names, order clauses carry an explicit direction, and raw
//! tokens are tagged as such instead of being sniffed at use sites.

use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

/// A reference to a field on a specific entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub entity: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.field)
    }
}

/// One entry of an attribute list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Attribute {
    /// A field of the entity the list is scoped to.
    Field(String),
    /// Opaque expression passed through to the query engine untouched.
    Raw { raw: String },
}

impl Attribute {
    pub fn field(name: impl Into<String>) -> Self {
        Attribute::Field(name.into())
    }

    pub fn field_name(&self) -> Option<&str> {
        match self {
            Attribute::Field(name) => Some(name),
            Attribute::Raw { .. } => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Field(name) => f.write_str(name),
            Attribute::Raw { raw } => write!(f, "raw({})", raw),
        }
    }
}

/// The (attributes, joins, order) triple shared by derived fields, joins and
/// requests.
///
/// `attributes: None` means "every field of the entity".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequirementSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderClause>,
}

impl RequirementSet {
    /// A set that needs nothing: an explicit, empty attribute list.
    pub fn empty() -> Self {
        Self {
            attributes: Some(Vec::new()),
            joins: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Names of the plain field attributes, in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .flatten()
            .filter_map(Attribute::field_name)
    }

    pub fn find_join(&self, target: &str, alias: Option<&str>) -> Option<&JoinSpec> {
        self.joins.iter().find(|j| j.matches(target, alias))
    }
}

impl fmt::Display for RequirementSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attributes {
            Some(attrs) => {
                let names: Vec<String> = attrs.iter().map(|a| a.to_string()).collect();
                write!(f, "[{}]", names.join(", "))?;
            }
            None => f.write_str("*")?,
        }
        for join in &self.joins {
            write!(f, " +{}", join)?;
        }
        if !self.order.is_empty() {
            let order: Vec<String> = self.order.iter().map(|o| o.to_string()).collect();
            write!(f, " order by {}", order.join(", "))?;
        }
        Ok(())
    }
}

/// A join from a parent entity to `target`, with its own nested requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinSpec {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(flatten)]
    pub requirements: RequirementSet,
}

impl JoinSpec {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            alias: None,
            requirements: RequirementSet::default(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements.attributes =
            Some(attributes.into_iter().map(Attribute::field).collect());
        self
    }

    /// Two joins are the same join iff target and alias both match.
    pub fn matches(&self, target: &str, alias: Option<&str>) -> bool {
        self.target == target && self.alias.as_deref() == alias
    }

    pub fn same_join(&self, other: &JoinSpec) -> bool {
        self.matches(&other.target, other.alias.as_deref())
    }

    pub fn join_ref(&self) -> JoinRef {
        JoinRef {
            target: self.target.clone(),
            alias: self.alias.clone(),
        }
    }
}

impl fmt::Display for JoinSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.join_ref())?;
        write!(f, "({})", self.requirements)
    }
}

/// A bare join step, as used in order paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinRef {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl JoinRef {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            alias: None,
        }
    }
}

impl fmt::Display for JoinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) if alias != &self.target => write!(f, "{}:{}", self.target, alias),
            _ => f.write_str(&self.target),
        }
    }
}

/// Sort direction. Normalization always produces one of these two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parse a direction token case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("asc") {
            Some(Direction::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Some(Direction::Desc)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal sort key of a structured order clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum OrderField {
    Field(String),
    Raw { raw: String },
}

/// A structured order clause: join path, terminal key, direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPath {
    pub joins: Vec<JoinRef>,
    pub field: OrderField,
    pub direction: Direction,
}

impl OrderPath {
    pub fn field(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            joins: Vec::new(),
            field: OrderField::Field(name.into()),
            direction,
        }
    }

    /// Entity the terminal field belongs to, given the entity the path starts at.
    pub fn owner<'a>(&'a self, root: &'a str) -> &'a str {
        self.joins.last().map(|j| j.target.as_str()).unwrap_or(root)
    }
}

impl Serialize for OrderPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.joins.len() + 2))?;
        for join in &self.joins {
            seq.serialize_element(join)?;
        }
        seq.serialize_element(&self.field)?;
        seq.serialize_element(&self.direction)?;
        seq.end()
    }
}

/// One entry of an order list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OrderClause {
    /// Opaque token, never validated or rewritten.
    Raw { raw: String },
    Path(OrderPath),
}

impl OrderClause {
    pub fn by(field: impl Into<String>, direction: Direction) -> Self {
        OrderClause::Path(OrderPath::field(field, direction))
    }

    /// This clause seen from one level up: `prefix` is prepended to its path.
    pub fn reparented(&self, prefix: &[JoinRef]) -> Self {
        match self {
            OrderClause::Raw { .. } => self.clone(),
            OrderClause::Path(path) => {
                let mut joins = prefix.to_vec();
                joins.extend(path.joins.iter().cloned());
                OrderClause::Path(OrderPath {
                    joins,
                    field: path.field.clone(),
                    direction: path.direction,
                })
            }
        }
    }
}

impl fmt::Display for OrderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderClause::Raw { raw } => write!(f, "raw({})", raw),
            OrderClause::Path(path) => {
                for join in &path.joins {
                    write!(f, "{}.", join)?;
                }
                match &path.field {
                    OrderField::Field(name) => f.write_str(name)?,
                    OrderField::Raw { raw } => write!(f, "raw({})", raw)?,
                }
                write!(f, " {}", path.direction)
            }
        }
    }
}

//! Entity registry and the two shapes requirements take: as declared, and
//! normalized.

pub mod declaration;
pub mod loader;
pub mod registry;
pub mod requirement;

pub use declaration::{
    AttributeDecl, DerivedDecl, JoinDecl, JoinDeclSpec, OneOrMany, OrderDecl, QueryRequest,
};
pub use registry::{
    AssociationDefinition, AssociationKind, Catalog, EntityDefinition, FieldDefinition, FieldKind,
    Registry,
};
pub use requirement::{
    Attribute, Direction, FieldRef, JoinRef, JoinSpec, OrderClause, OrderField, OrderPath,
    RequirementSet,
};

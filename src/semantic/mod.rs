//! Semantic layer: derived-field resolution.
//!
//! Schema initialization runs once, in four passes:
//!
//! 1. **Register** - normalize and validate every derived field declaration
//! 2. **Order** - sort derived fields so dependencies come first
//! 3. **Close** - inline derived dependencies until only base fields remain
//! 4. **Inherit order** - replace derived sort keys with their own order
//!
//! The resulting [`ClosedSchema`] is immutable. Each request is then
//! expanded against it independently.

pub mod closure;
pub mod dependency_graph;
pub mod expand;
pub mod merge;
pub mod normalize;
pub mod order_inheritance;
pub mod registrar;
pub mod schema;

pub use dependency_graph::{DependencyGraph, EdgeKind, Edges};
pub use expand::{expand_request, Expansion, InjectedJoin, InjectionReport};
pub use merge::merge_requirements;
pub use normalize::Normalizer;
pub use order_inheritance::InheritedOrder;
pub use registrar::{register, register_all};
pub use schema::{initialize_schema, initialize_schema_with, ClosedSchema, SchemaCell};

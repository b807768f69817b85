//! # Derivo
//!
//! Derived-field requirement resolution for a query layer.
//!
//! ## Architecture
//!
//! Entities declare derived fields together with what computing them needs:
//! attributes, joins to related entities and an order. Derivo closes those
//! declarations once and then rewrites every incoming request so that it
//! fetches exactly what the derived fields need:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          Registry (entities, fields, associations)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [registrar]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Normalized requirement sets per derived field     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [dependency graph + closure + order inheritance]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     ClosedSchema                         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [expander, once per request]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Expanded request + injection report             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod semantic;

pub use error::{DeclarationError, RequestError, SchemaError};
pub use model::{QueryRequest, Registry};
pub use semantic::{
    expand_request, initialize_schema, initialize_schema_with, ClosedSchema, Expansion,
    InjectionReport, SchemaCell,
};

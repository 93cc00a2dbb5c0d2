//! SQL assembly for ReportQL
//!
//! Three stages live here: the builder turns classified intents, resolved
//! entities, and the request profile into an `IntermediateStatement`; the
//! dialect renderers turn that statement into literal SQL; the validator
//! screens the result for unsafe or expensive shapes.

pub mod builder;
pub mod render;
pub mod validate;

pub use builder::{complexity_of, BuildError, SqlBuilder};
pub use render::{render, DialectRenderer, MySqlRenderer, OracleRenderer, PostgresRenderer};
pub use validate::{Validation, Validator};

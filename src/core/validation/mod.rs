//! Declarative input validation
//!
//! Endpoints declare a fixed list of [`ValidationRule`]s; the engine
//! evaluates them against the raw request input and collects every failing
//! field before anything else runs. The engine is a pure function of
//! input + rules, so it is unit-testable without any HTTP plumbing.

pub mod engine;
pub mod rules;

pub use engine::validate;
pub use rules::{FieldType, ValidationRule};

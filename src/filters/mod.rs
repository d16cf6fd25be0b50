//! # Filter Expressions
//!
//! Test events can be skipped by a boolean expression evaluated against the
//! event. Expressions use rhai syntax and may call the helpers in
//! [`functions`], e.g. `any(route, "users") && httpMethod == "get"`.

pub mod engine;
pub mod functions;
pub mod predicate;

pub use predicate::{
    CompiledFilter, FILTER_ENV_VAR, FilterSource, TestFilter, create_default_predicate,
};

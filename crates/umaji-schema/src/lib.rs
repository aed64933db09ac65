//! # umaji-schema
//!
//! JSON Schemas for every report `umaji` prints.
//!
//! Report types are defined in `umaji-core` with `#[derive(JsonSchema)]`.
//! This crate collects them into a [`SchemaRegistry`] so `umaji schema <name>`
//! can export them and tests can validate command output against them.

pub mod error;
pub mod registry;

pub use error::SchemaError;
pub use registry::SchemaRegistry;

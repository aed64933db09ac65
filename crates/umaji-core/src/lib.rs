//! # umaji-core
//!
//! Core types, identity normalization, and date-domain rules for umaji.
//!
//! This crate provides the foundational types shared across all umaji crates:
//! - The canonical field set that every workbook is mapped onto
//! - Mark records, identity keys, and field diffs
//! - The Identity Normalizer (pure, deterministic key derivation)
//! - The single date-domain predicate used by import, detection, and quarantine
//! - The JRA venue table
//! - Report types returned as JSON by `umaji` commands
//! - Row-level identity errors

pub mod date_domain;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod identity;
pub mod normalize;
pub mod responses;
pub mod venue;

pub use date_domain::DateDomain;
pub use entities::{IdentityKey, MarkFields, MarkRecord};
pub use errors::IdentityError;
pub use identity::IdentityNormalizer;

//! Repository modules over the mark store.
//!
//! Each module adds methods to `MarkService` via `impl MarkService` blocks.

pub mod anomaly;
pub mod audit;
pub mod marks;

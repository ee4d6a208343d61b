//! Public facade crate for `webscout`.
//!
//! This crate intentionally contains no IO or provider-specific logic.
//! It re-exports the backend-agnostic types/traits from `webscout-core`.

pub use webscout_core::*;

//! reelsearch-core
//!
//! Shared domain types, errors, injection traits, configuration and the
//! artifact cache used by the lexical, vector and hybrid crates.

pub mod cache;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};

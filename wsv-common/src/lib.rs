//! # WSV Common Library
//!
//! Shared code for the Works Single View importer:
//! - Domain model (work records, contributor sets, ISWC validation)
//! - Database layer (schema, canonical store, staging area, run bookkeeping)
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod model;

pub use error::{Error, Result};
pub use model::{ContributorSet, WorkRecord};

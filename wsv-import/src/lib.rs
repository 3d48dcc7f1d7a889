//! # wsv-import
//!
//! Chunked CSV import-and-reconcile pipeline for musical work records.
//!
//! The importer reads a delimited file in bounded chunks, normalizes each
//! row, bulk-loads the chunk into a staging area, and folds it into the
//! canonical store with two linkage passes: exact (by ISWC) and fuzzy
//! (title plus at least one shared contributor).

pub mod import;
pub mod sample;
pub mod utils;

pub use import::{CsvImporter, ImportSummary};

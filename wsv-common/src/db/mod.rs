//! Database layer: pool initialization, schema, and store surfaces
//!
//! The canonical store is a SQLite database. Reconciliation consumes the
//! surfaces in [`works`] and [`staging`]; it never issues ad hoc SQL.

pub mod init;
pub mod runs;
pub mod staging;
pub mod works;

pub use init::init_database;

//! Recipient directory: which groups receive which categories.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlDirectory;
pub use traits::{GroupRecord, RecipientDirectory};

//! Local storage: mirrored tables, mutation log, sync metadata

mod connection;
pub(crate) mod mutation_log;
mod queries;
mod schema;
pub(crate) mod store;

pub(crate) use connection::Database;
pub use queries::{QueryFacade, TableCounts, TaskDetail};
pub use store::{LocalStore, Mirrored, TableSync};

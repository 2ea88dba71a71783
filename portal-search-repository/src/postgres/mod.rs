//! PostgreSQL implementation of the portal stores.
//!
//! Reads the portal's relational tables (`tardis_portal_*`). A database that is not
//! reachable, or whose tables have not been migrated yet, is reported as
//! [`StoreError::Unavailable`](crate::errors::StoreError::Unavailable).

mod store;
mod tables;

pub use store::PostgresStore;

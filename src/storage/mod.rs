//! SQLite persistence
//!
//! One database file holds the whole crawl: the frontier (so an interrupted
//! run can be resumed against the same database), the link and redirect
//! graph, crawled page records, and the failure log. [`SqliteStore`]
//! implements the frontier and both sink traits against that file.

mod sqlite;

pub use sqlite::SqliteStore;

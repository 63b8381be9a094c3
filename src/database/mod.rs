pub mod connection;

pub use connection::{Database, DatabaseStats, DatabaseTransaction};

pub mod connection;
pub mod connector;
pub mod database;
pub mod memory;
pub mod providers;
pub mod store;

pub use connection::DatabaseHandle;
pub use connector::{ConnectError, DatabaseConnector, UNKNOWN_ERROR};
pub use database::{MongoConnector, MongoSessionStore};
pub use memory::{InMemoryConnector, InMemorySessionStore};
pub use store::SessionStore;

pub mod cache;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod server;
pub mod store;

// Public so integration tests can drive the router without a database
pub mod testing;

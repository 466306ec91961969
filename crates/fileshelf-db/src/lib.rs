//! Fileshelf DB Library
//!
//! Stores behind the service: users, the file metadata tree, sessions and
//! the durable job queue. Every store is a trait with a PostgreSQL
//! implementation and an in-memory one for development and tests.

pub mod db;
pub mod factory;

pub use db::*;
pub use factory::{connect_pool, connect_stores, Stores};

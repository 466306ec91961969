//! Fileshelf API Library
//!
//! HTTP surface of Fileshelf: session authentication, the file tree and
//! content retrieval.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;

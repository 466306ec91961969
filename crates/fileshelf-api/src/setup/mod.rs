pub mod routes;
pub mod server;
pub mod services;

pub use services::{initialize_app, App, BackgroundTasks};

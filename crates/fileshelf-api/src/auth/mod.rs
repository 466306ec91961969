pub mod access;
pub mod credentials;
pub mod middleware;
pub mod models;
pub mod password;

pub use access::AccessController;
pub use credentials::CredentialVerifier;
pub use models::{MaybeUser, UserContext};

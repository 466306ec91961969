mod thumbnail;
mod welcome;

pub use thumbnail::ThumbnailHandler;
pub use welcome::WelcomeHandler;

//! Built-in call applications.
pub mod welcome;
pub use welcome::WelcomeApp;

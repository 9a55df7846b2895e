pub mod handler;
pub mod middleware;
pub use handler::router;

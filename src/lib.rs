pub mod app;
pub mod call;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod preflight;
pub mod response;
pub mod server;
pub mod version;

pub use command::{Command, CommandObject, DialTarget};
pub use error::ServerError;
pub use event::{decode, CallEvent, CallStatus};
pub use response::CommandResponse;
pub use server::{handle, handler_fn, json_handler_fn, CallHandler, RealtimeServer};

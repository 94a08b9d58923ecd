pub mod commands;
pub mod dispatch;

pub use commands::{parse_callback, Action, CallbackPayload, Command};
pub use dispatch::Router;

// Library root
// -----------
// This crate exposes the store client used by the CLI. The binary
// (`main.rs`) wires these modules into an interactive menu.
//
// Module responsibilities:
// - `api`: the store client (signed requests, JSON decoding, file upload
//   to the storage endpoint).
// - `auth`: the authenticated session and credentials handling.
// - `config`: client configuration from the environment or explicit setters.
// - `error`: the single error type surfaced to command handlers.
// - `progress`: byte counting while streaming and the console reporter.
// - `user_agent`: the user agent string sent with every request.
// - `ui`: the terminal menu flows, delegating to `api`.
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod progress;
pub mod ui;
pub mod user_agent;

pub use api::{Client, UploadResult, Whoami};
pub use error::CommandError;
pub use user_agent::build_user_agent;

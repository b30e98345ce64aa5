//! Unix-socket control plane: line-delimited JSON requests, one request
//! per connection, `{"ok": bool, "data"|"error": ...}` responses.

pub mod dispatch;
pub mod runtime;
pub mod server;

pub use server::{client_request, run_daemon};

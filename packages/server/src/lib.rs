// Title Doctor - API Core
//
// Accepts a channel and an email address, then runs a pipeline of stages over
// an in-process topic bus: resolve the channel, fetch its recent videos, ask a
// model for better titles, and email the results.
//
// Stages are organized per-domain in domains/*/actions/ and wired in
// domains/*/effects/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;

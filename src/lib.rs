// Public module for parsing and validating server configuration.
pub mod config;

// Public module exposing logging utilities for server lifecycle events.
pub mod logger;

// The shared collection that client workers append received messages to.
pub mod mailbox;

// The coordinator, the acceptor and the per-client workers.
pub mod server;

// Pull the main items up to the crate root so callers don't have to
// write full paths.
pub use config::{FRAME_SIZE, LoggerConfig, ServerConfig};
pub use logger::{Logger, init_logger};
pub use mailbox::Mailbox;
pub use server::{CollectOutcome, collect_frames, run_server};

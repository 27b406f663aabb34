// serde gives us `Deserialize` so the config can come from a JSON file.
use serde::Deserialize;

// Standard filesystem access for reading the config file.
use std::error::Error;
use std::fs;
use std::path::Path;

// This helper tells us how many CPU cores are available
use num_cpus;

/// Size in bytes of one frame on the wire.
///
/// Senders left-justify their message and pad it with NUL bytes to exactly
/// this length. There is no length prefix or delimiter; framing relies
/// entirely on the fixed size.
pub const FRAME_SIZE: usize = 1024;

/// All the settings the server needs, with defaults matching the reference
/// deployment (loopback, port 8001, 4 clients sending 5 messages each).
///
/// Every field has a default, so a config file only needs to list the keys
/// it wants to change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP or hostname to listen on (e.g. `"127.0.0.1"`)
    pub host: String,

    /// Port number (e.g. `8001`)
    pub port: u16,

    /// Hard cap on concurrently served clients. Connections beyond the cap
    /// are left waiting in the OS accept backlog, never actively rejected.
    pub max_clients: usize,

    /// How many frames each client is expected to deliver
    pub msgs_per_client: usize,

    /// Milliseconds between the coordinator's mailbox progress checks
    pub progress_poll_ms: u64,

    /// Milliseconds to wait for the target count before giving up.
    /// `None` waits forever.
    pub collect_deadline_ms: Option<u64>,

    /// Milliseconds between capacity re-checks while the accept gate is closed
    pub accept_poll_ms: u64,

    /// Milliseconds to sleep after a failed accept
    pub accept_error_backoff_ms: u64,

    /// How many Tokio worker threads to spin up (defaults to cpu-1)
    pub worker_threads: usize,

    /// Logging settings
    pub logger: LoggerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            max_clients: 4,
            msgs_per_client: 5,
            progress_poll_ms: 1_000,
            collect_deadline_ms: Some(60_000),
            accept_poll_ms: 100,
            accept_error_backoff_ms: 100,
            worker_threads: num_cpus::get().saturating_sub(1).max(1),
            logger: LoggerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Total number of messages the coordinator waits for before it shuts
    /// the acceptor down and drains the mailbox.
    pub fn target_count(&self) -> usize {
        self.max_clients * self.msgs_per_client
    }

    /// Load settings from a JSON file. Keys missing from the file keep
    /// their defaults.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }
}

/// Settings for the global logger: where lines go and how they look.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Minimum level to emit ("trace", "debug", "info", "warn", "error")
    pub log_level: String,

    /// Mirror log lines to stdout with ANSI colors
    pub enable_console_log: bool,

    /// Also write log lines to a file
    pub enable_file_log: bool,

    /// Emit file lines as JSON envelopes instead of plain text
    pub enable_json_log: bool,

    /// Directory for the log file; empty means the working directory
    pub log_file_path: String,

    /// chrono format string for timestamps
    pub date_format: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            enable_console_log: true,
            enable_file_log: false,
            enable_json_log: false,
            log_file_path: String::new(),
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8001);
        assert_eq!(config.max_clients, 4);
        assert_eq!(config.msgs_per_client, 5);
        assert_eq!(config.target_count(), 20);
        assert_eq!(config.progress_poll_ms, 1_000);
        assert!(config.worker_threads >= 1);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_keys() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "max_clients": 8}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_clients, 8);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.msgs_per_client, 5);
        assert_eq!(config.target_count(), 40);
    }

    #[test]
    fn from_file_reads_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        fs::write(
            &path,
            r#"{"host": "0.0.0.0", "collect_deadline_ms": null, "logger": {"log_level": "warn"}}"#,
        )
        .unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.collect_deadline_ms, None);
        assert_eq!(config.logger.log_level, "warn");
        assert_eq!(config.port, 8001);
    }

    #[test]
    fn from_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(ServerConfig::from_file(&path).is_err());
    }
}

// Clone-on-write string type: avoids an allocation when a frame renders
// without replacement characters.
use std::borrow::Cow;

// Arc is an atomic reference counter for shared ownership across tasks.
use std::sync::Arc;

// Reference-counted byte buffer holding one received frame.
use bytes::Bytes;

// Tokio's non-blocking TCP listener for incoming connections.
use tokio::net::TcpListener;

// broadcast = one-to-many channel (used here for shutdown signals).
use tokio::sync::broadcast;

// Time tools for the progress poll and the observation deadline.
use tokio::time::{self, Duration, Instant};

// Private modules handling specific server roles.
mod acceptor; // accept loop, capacity gate, worker registry
mod worker; // per-client read loop

use crate::config::ServerConfig;
use crate::logger::Logger;
use crate::mailbox::Mailbox;
use acceptor::run_acceptor;

/// Final verdict of one collection run, mapped to a process exit code by
/// the binary (0 for `Complete`, 1 otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// The target count was reached and every recorded message was
    /// drained. Carries the collected messages in arrival order.
    Complete { messages: Vec<Bytes> },

    /// The observation window lapsed before the target count was reached.
    /// The mailbox is left undrained.
    Shortfall { received: usize, expected: usize },

    /// The drained length disagreed with the recorded count.
    DrainMismatch { drained: usize, recorded: usize },
}

impl CollectOutcome {
    /// True only for a fully successful run.
    pub fn is_complete(&self) -> bool {
        matches!(self, CollectOutcome::Complete { .. })
    }
}

/// This function launches the whole ingestion run:
/// - Binds to the configured host and port (fatal on failure)
/// - Hands the listener to `collect_frames` for the actual run
pub async fn run_server(
    config: ServerConfig,
    logger: Logger,
) -> Result<CollectOutcome, Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", config.host, config.port);

    // Bind a TCP socket to the address; the `?` returns early on error
    let listener = TcpListener::bind(&addr).await?;
    logger.info(&format!("🚀 Ingest server listening on {}", addr));

    Ok(collect_frames(listener, config, logger).await)
}

/// The coordinator: runs the acceptor over an already-bound listener,
/// waits for the target message count, shuts everything down and verifies
/// the collection.
///
/// Taking the listener as an argument keeps bind failures at startup (in
/// `run_server`) and lets tests run against an ephemeral port.
pub async fn collect_frames(
    listener: TcpListener,
    config: ServerConfig,
    logger: Logger,
) -> CollectOutcome {
    // The shared mailbox every worker appends to.
    let mailbox = Arc::new(Mailbox::new());

    // Broadcast channel for shutdown signaling. One send reaches the
    // acceptor and every worker it subscribed at spawn time.
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    // Start the acceptor as an independent concurrent task.
    let acceptor = tokio::spawn(run_acceptor(
        listener,
        Arc::clone(&mailbox),
        shutdown_tx.clone(),
        shutdown_rx,
        config.clone(),
        logger.clone(),
    ));

    let target = config.target_count();
    let deadline = config
        .collect_deadline_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));

    // Poll the mailbox count at a fixed interval until the target is
    // reached or the observation window lapses.
    loop {
        time::sleep(Duration::from_millis(config.progress_poll_ms)).await;

        let count = mailbox.snapshot_count().await;
        logger.debug(&format!("📬 {} of {} messages received.", count, target));

        if count >= target {
            break;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                logger.warn(&format!(
                    "⏰ Observation window lapsed at {} of {} messages.",
                    count, target
                ));
                break;
            }
        }
    }

    // Signal shutdown and wait for the acceptor (and through it, every
    // worker) to finish.
    let _ = shutdown_tx.send(());
    if let Err(e) = acceptor.await {
        logger.error(&format!("Failed to join acceptor: {}", e));
    }

    // With all workers joined, no append can race the final accounting.
    let count = mailbox.snapshot_count().await;
    if count < target {
        logger.error(&format!(
            "❌ Not enough messages were received: {} of {}.",
            count, target
        ));
        return CollectOutcome::Shortfall {
            received: count,
            expected: target,
        };
    }

    // Drain under the same lock discipline as append and report each
    // collected message.
    let messages = mailbox.drain_all().await;
    for msg in &messages {
        logger.info(&format!("📨 Collected: {}", render_frame(msg)));
    }
    logger.info(&format!("Collected {} messages in total.", messages.len()));

    if messages.len() != count {
        logger.error("❌ Not all messages were collected!");
        CollectOutcome::DrainMismatch {
            drained: messages.len(),
            recorded: count,
        }
    } else {
        logger.info("✅ All messages were collected.");
        CollectOutcome::Complete { messages }
    }
}

/// Frames are NUL-padded on the wire; show the text up to the padding.
fn render_frame(msg: &Bytes) -> Cow<'_, str> {
    let end = msg.iter().position(|&b| b == 0).unwrap_or(msg.len());
    String::from_utf8_lossy(&msg[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_frame_trims_nul_padding() {
        let mut raw = vec![0u8; 16];
        raw[..5].copy_from_slice(b"Hello");
        assert_eq!(render_frame(&Bytes::from(raw)), "Hello");
    }

    #[test]
    fn render_frame_keeps_unpadded_content() {
        assert_eq!(render_frame(&Bytes::from_static(b"short")), "short");
    }

    #[test]
    fn only_complete_counts_as_success() {
        assert!(
            CollectOutcome::Complete { messages: vec![] }.is_complete()
        );
        assert!(
            !CollectOutcome::Shortfall {
                received: 15,
                expected: 20
            }
            .is_complete()
        );
        assert!(
            !CollectOutcome::DrainMismatch {
                drained: 19,
                recorded: 20
            }
            .is_complete()
        );
    }
}

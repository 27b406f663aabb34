use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use crate::config::ServerConfig;
use crate::logger::Logger;
use crate::mailbox::Mailbox;
use crate::server::worker::run_worker;

/// This function handles incoming client connections:
/// - Accepts new TCP clients while below the `max_clients` cap
/// - Spawns a worker task per accepted client and registers its handle
/// - Reacts to the coordinator's shutdown signal
/// - On shutdown, joins every worker it spawned, then closes the socket
///
/// While at capacity no accept is attempted; excess connections simply
/// wait in the OS accept backlog until a slot frees up or the run ends.
pub(crate) async fn run_acceptor(
    listener: TcpListener,
    mailbox: Arc<Mailbox>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    config: ServerConfig,
    logger: Logger,
) {
    // Atomic counter for connection tracking. Workers decrement it when
    // they finish, which reopens the accept gate.
    let active = Arc::new(AtomicUsize::new(0));

    // Handles of every worker spawned, joined during the shutdown phase.
    let mut workers: Vec<(SocketAddr, JoinHandle<()>)> =
        Vec::with_capacity(config.max_clients);

    // Wakes the loop periodically so the accept gate is re-evaluated
    // after a worker exits while we are parked at capacity.
    let mut capacity_poll = time::interval(Duration::from_millis(config.accept_poll_ms));

    logger.info("📡 Accepting clients...");

    loop {
        let below_capacity = active.load(Ordering::SeqCst) < config.max_clients;

        tokio::select! {
            // Accept a new client connection, but only below the cap
            accept_result = listener.accept(), if below_capacity => {
                match accept_result {
                    Ok((stream, addr)) => {
                        let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                        logger.info(&format!(
                            "🔌 {} connected. Active clients: {}",
                            addr, current
                        ));

                        // Clone required context into the new task
                        let mailbox = Arc::clone(&mailbox);
                        let worker_shutdown_rx = shutdown_tx.subscribe();
                        let counter = Arc::clone(&active);
                        let worker_logger = logger.clone();

                        // Spawn a new async task for the client session
                        let handle = tokio::spawn(async move {
                            run_worker(stream, addr, mailbox, worker_shutdown_rx, worker_logger)
                                .await;
                            counter.fetch_sub(1, Ordering::SeqCst);
                        });
                        workers.push((addr, handle));
                    }
                    Err(e) => {
                        // The attempted connection is dropped; the server
                        // carries on after a brief pause to avoid CPU
                        // spinning on repeated errors.
                        logger.warn(&format!("⚠️ Failed to accept connection: {}", e));
                        time::sleep(Duration::from_millis(config.accept_error_backoff_ms)).await;
                    }
                }
            }

            // Re-check the capacity gate
            _ = capacity_poll.tick() => {}

            // If a global shutdown signal is received
            _ = shutdown_rx.recv() => {
                logger.info("🧹 Acceptor received shutdown signal.");
                break;
            }
        }
    }

    logger.info("🚫 Not accepting any more clients.");

    // Shutdown phase: the same broadcast that ended our loop also reached
    // every worker, so each is on its way to closing its connection. Wait
    // for all of them before tearing down the socket.
    for (addr, handle) in workers {
        if let Err(e) = handle.await {
            logger.error(&format!("Failed to join worker for {}: {}", addr, e));
        }
    }

    // Dropping the listener closes the listening socket.
    drop(listener);
    logger.info("📪 All client connections closed; listener shut down.");
}

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::FRAME_SIZE;
use crate::logger::Logger;
use crate::mailbox::Mailbox;

/// This function runs the session for a single client:
/// - Reads into a fixed-size frame buffer until the peer closes, a read
///   fails, or the shutdown signal arrives
/// - Appends every successful read to the shared mailbox as one message
/// - Closes the connection exactly once on the way out
///
/// A short read is a partial frame; whatever was read is still forwarded
/// as one message rather than blocking to accumulate a full frame.
/// Read errors terminate this worker only, never the process.
pub(crate) async fn run_worker(
    mut stream: TcpStream,
    addr: SocketAddr,
    mailbox: Arc<Mailbox>,
    mut shutdown_rx: broadcast::Receiver<()>,
    logger: Logger,
) {
    let mut buf = [0u8; FRAME_SIZE];

    loop {
        tokio::select! {
            // Try reading the next frame from the client
            read_result = stream.read(&mut buf) => {
                match read_result {
                    // The client closed the connection cleanly
                    Ok(0) => {
                        logger.info(&format!("⚠️ {} disconnected gracefully.", addr));
                        break;
                    }

                    // Some bytes arrived; hand them to the mailbox
                    Ok(n) => {
                        mailbox.append(Bytes::copy_from_slice(&buf[..n])).await;
                    }

                    // An error occurred while reading input
                    Err(e) => {
                        logger.warn(&format!("❌ Error reading from {}: {}", addr, e));
                        break;
                    }
                }
            }

            // Received a shutdown signal
            _ = shutdown_rx.recv() => {
                logger.info(&format!("🛑 {} disconnected due to shutdown.", addr));
                break;
            }
        }
    }

    // Close our half of the connection. Close errors are reported but do
    // not block shutdown progress.
    if let Err(e) = stream.shutdown().await {
        logger.warn(&format!("⚠️ Error closing connection from {}: {}", addr, e));
    }

    logger.info(&format!("{} connection closed.", addr));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::time::{self, Duration};

    /// Bind an ephemeral listener, connect a peer, accept it and spawn a
    /// worker over the accepted side.
    async fn spawn_worker(
        mailbox: Arc<Mailbox>,
        shutdown_tx: &broadcast::Sender<()>,
    ) -> (TcpStream, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = TcpStream::connect(addr).await.unwrap();
        let (stream, peer_addr) = listener.accept().await.unwrap();

        let worker = tokio::spawn(run_worker(
            stream,
            peer_addr,
            mailbox,
            shutdown_tx.subscribe(),
            Logger::default(),
        ));
        (peer, worker)
    }

    #[tokio::test]
    async fn short_write_is_one_message_and_eof_ends_the_worker() {
        let mailbox = Arc::new(Mailbox::new());
        let (shutdown_tx, _keep) = broadcast::channel::<()>(1);
        let (mut peer, worker) = spawn_worker(Arc::clone(&mailbox), &shutdown_tx).await;

        peer.write_all(b"partial frame").await.unwrap();
        peer.shutdown().await.unwrap();
        drop(peer);

        // EOF must end the loop without any shutdown signal.
        worker.await.unwrap();

        let drained = mailbox.drain_all().await;
        assert_eq!(drained.len(), 1);
        assert_eq!(&drained[0][..], b"partial frame");
    }

    #[tokio::test]
    async fn shutdown_signal_ends_an_idle_worker() {
        let mailbox = Arc::new(Mailbox::new());
        let (shutdown_tx, _keep) = broadcast::channel::<()>(1);
        let (_peer, worker) = spawn_worker(Arc::clone(&mailbox), &shutdown_tx).await;

        // The peer sends nothing; the worker sits in the read branch.
        time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();

        worker.await.unwrap();
        assert_eq!(mailbox.snapshot_count().await, 0);
    }

    #[tokio::test]
    async fn full_frames_arrive_in_send_order() {
        let mailbox = Arc::new(Mailbox::new());
        let (shutdown_tx, _keep) = broadcast::channel::<()>(1);
        let (mut peer, worker) = spawn_worker(Arc::clone(&mailbox), &shutdown_tx).await;

        for i in 0..3u8 {
            let mut frame = [0u8; FRAME_SIZE];
            frame[0] = i;
            peer.write_all(&frame).await.unwrap();
            time::sleep(Duration::from_millis(10)).await;
        }
        peer.shutdown().await.unwrap();
        drop(peer);
        worker.await.unwrap();

        let drained = mailbox.drain_all().await;
        assert_eq!(drained.len(), 3);
        for (i, msg) in drained.iter().enumerate() {
            assert_eq!(msg.len(), FRAME_SIZE);
            assert_eq!(msg[0], i as u8);
        }
    }
}

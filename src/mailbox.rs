// Reference-counted byte buffer: enables zero-copy sharing of message data.
use bytes::Bytes;

// Async-aware lock for exclusive access to the message sequence.
use tokio::sync::Mutex;

/// Shared, append-only collection of received messages.
///
/// Every client worker appends here; insertion order is arrival order
/// across all workers. All mutation happens under one exclusive lock, and
/// the count is bumped in the same critical section as the push, so a
/// reader of the count never sees a message "promised" that is not yet in
/// the sequence.
pub struct Mailbox {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    messages: Vec<Bytes>,
    count: usize,
    drained: bool,
}

impl Mailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Append one message to the end of the sequence and bump the count.
    pub async fn append(&self, msg: Bytes) {
        let mut inner = self.inner.lock().await;
        inner.messages.push(msg);
        inner.count += 1;
    }

    /// Read the current count. Used for progress polling; the value may be
    /// stale by the time the caller acts on it.
    pub async fn snapshot_count(&self) -> usize {
        self.inner.lock().await.count
    }

    /// Move the entire sequence out, leaving the mailbox consumed.
    ///
    /// The count survives the drain so a caller can compare the drained
    /// length against the recorded count afterwards.
    ///
    /// # Panics
    ///
    /// Draining is a once-in-a-lifetime operation in this design (single
    /// coordinator, single drain). A second call is a logic error and
    /// panics rather than silently returning an empty sequence.
    pub async fn drain_all(&self) -> Vec<Bytes> {
        let mut inner = self.inner.lock().await;
        if inner.drained {
            panic!("Mailbox already drained; drain_all supports a single call");
        }
        inner.drained = true;
        std::mem::take(&mut inner.messages)
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn append_bumps_count_and_preserves_order() {
        let mailbox = Mailbox::new();
        assert_eq!(mailbox.snapshot_count().await, 0);

        mailbox.append(Bytes::from_static(b"first")).await;
        mailbox.append(Bytes::from_static(b"second")).await;
        mailbox.append(Bytes::from_static(b"third")).await;
        assert_eq!(mailbox.snapshot_count().await, 3);

        let drained = mailbox.drain_all().await;
        assert_eq!(drained.len(), 3);
        assert_eq!(&drained[0][..], b"first");
        assert_eq!(&drained[1][..], b"second");
        assert_eq!(&drained[2][..], b"third");

        // The recorded count is not reset by the drain.
        assert_eq!(mailbox.snapshot_count().await, 3);
    }

    #[tokio::test]
    #[should_panic(expected = "already drained")]
    async fn draining_twice_is_a_logic_error() {
        let mailbox = Mailbox::new();
        mailbox.append(Bytes::from_static(b"only")).await;
        let _ = mailbox.drain_all().await;
        let _ = mailbox.drain_all().await;
    }

    #[tokio::test]
    async fn concurrent_appends_all_land() {
        let mailbox = Arc::new(Mailbox::new());

        let mut tasks = Vec::new();
        for task in 0..8u8 {
            let mailbox = Arc::clone(&mailbox);
            tasks.push(tokio::spawn(async move {
                for i in 0..25u8 {
                    mailbox.append(Bytes::copy_from_slice(&[task, i])).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(mailbox.snapshot_count().await, 200);
        assert_eq!(mailbox.drain_all().await.len(), 200);
    }
}

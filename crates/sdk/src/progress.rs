use blockstream_types::{ProgressSnapshot, Response};
use tokio::time::Instant;

/// Folds every response of a session into a cumulative [`ProgressSnapshot`].
#[derive(Debug)]
pub struct ProgressTracker {
    started_at: Instant,
    snapshot: ProgressSnapshot,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            snapshot: ProgressSnapshot::default(),
        }
    }

    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    pub fn observe(&mut self, response: &Response) -> ProgressSnapshot {
        let snapshot = &mut self.snapshot;
        snapshot.messages_received += 1;
        snapshot.bytes_received += response.payload_len() as u64;
        snapshot.elapsed_ms = self.started_at.elapsed().as_millis() as u64;

        match response {
            Response::SessionInit(init) => {
                snapshot.trace_id = Some(init.trace_id.clone());
            }
            Response::Progress(progress) => {
                if let Some(bytes) = progress.processed_bytes {
                    snapshot.processed_bytes = bytes;
                }
            }
            Response::BlockScopedData(data) => {
                snapshot.data_messages += 1;
                snapshot.last_block = Some(data.clock.number);
                snapshot.last_cursor = Some(data.cursor.clone());
            }
            Response::BlockUndoSignal(undo) => {
                snapshot.undo_signals += 1;
                snapshot.last_block = Some(undo.last_valid_block.number);
                snapshot.last_cursor = Some(undo.last_valid_cursor.clone());
            }
            Response::FatalError { .. } | Response::Other => {}
        }

        snapshot.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use blockstream_types::Cursor;

    use super::*;
    use crate::testing::{data, progress, session_init, undo};

    #[tokio::test(start_paused = true)]
    async fn test_tracker_accumulates() {
        let mut tracker = ProgressTracker::new();

        let first = tracker.observe(&session_init("trace-1"));
        assert_eq!(first.messages_received, 1);
        assert_eq!(first.trace_id.as_deref(), Some("trace-1"));

        tracker.observe(&progress(2048, 512));
        tokio::time::sleep(Duration::from_millis(250)).await;
        tracker.observe(&data(100_000, "c1", Some(r#"{"a":1}"#)));
        let last = tracker.observe(&undo(99_999, "c0"));

        assert_eq!(last.messages_received, 4);
        assert_eq!(last.data_messages, 1);
        assert_eq!(last.undo_signals, 1);
        assert_eq!(last.bytes_received, 7);
        assert_eq!(last.processed_bytes.total_bytes_read, 2048);
        assert_eq!(last.processed_bytes.total_bytes_written, 512);
        assert_eq!(last.last_block, Some(99_999));
        assert_eq!(last.last_cursor, Some(Cursor::new("c0")));
        assert!(last.elapsed_ms >= 250);
        assert_eq!(tracker.snapshot(), &last);
    }
}

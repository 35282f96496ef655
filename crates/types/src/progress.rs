use serde::Serialize;

use crate::{Cursor, ProcessedBytes};

/// Cumulative, purely observational view of a stream's progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Messages of any kind received so far
    pub messages_received: u64,

    /// `block_scoped_data` messages received so far
    pub data_messages: u64,

    pub undo_signals: u64,

    /// Module output bytes received so far
    pub bytes_received: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_block: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cursor: Option<Cursor>,

    /// Latest server-reported byte counters
    pub processed_bytes: ProcessedBytes,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// Milliseconds since the tracker was created
    pub elapsed_ms: u64,
}

//! Response envelope emitted by a block stream, one per message.
//!
//! ```text
//! {"type": "session_init", "traceId": "4d2c...", "resolvedStartBlock": 100000, ...}
//! {"type": "block_scoped_data", "clock": {...}, "cursor": "c1", "output": {...}}
//! {"type": "block_undo_signal", "lastValidBlock": {...}, "lastValidCursor": "c0"}
//! ```
//!
//! Unknown message kinds deserialize to [`Response::Other`].

use serde::{Deserialize, Serialize};

use crate::Cursor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    SessionInit(SessionInit),
    Progress(StreamProgress),
    BlockScopedData(BlockScopedData),
    BlockUndoSignal(BlockUndoSignal),
    FatalError { reason: String },
    #[serde(other)]
    Other,
}

impl Response {
    /// Short name of the message kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Response::SessionInit(_) => "session_init",
            Response::Progress(_) => "progress",
            Response::BlockScopedData(_) => "block_scoped_data",
            Response::BlockUndoSignal(_) => "block_undo_signal",
            Response::FatalError { .. } => "fatal_error",
            Response::Other => "other",
        }
    }

    /// Size of the module output payload carried by this message, if any
    pub fn payload_len(&self) -> usize {
        match self {
            Response::BlockScopedData(data) => data
                .output
                .as_ref()
                .and_then(|o| o.map_output.as_ref())
                .map(|any| any.value.len())
                .unwrap_or(0),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInit {
    pub trace_id: String,
    #[serde(default)]
    pub resolved_start_block: u64,
    #[serde(default)]
    pub linear_handoff_block: u64,
    #[serde(default)]
    pub max_parallel_workers: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_bytes: Option<ProcessedBytes>,
    #[serde(default)]
    pub running_jobs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedBytes {
    pub total_bytes_read: u64,
    pub total_bytes_written: u64,
}

/// Forward progress: the output of the requested module for one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockScopedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<MapModuleOutput>,
    pub clock: Clock,
    pub cursor: Cursor,
    #[serde(default)]
    pub final_block_height: u64,
}

/// Retraction of blocks after `last_valid_block` (chain reorganization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockUndoSignal {
    pub last_valid_block: BlockRef,
    pub last_valid_cursor: Cursor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clock {
    pub id: String,
    pub number: u64,
    /// RFC 3339 timestamp of the block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockRef {
    pub id: String,
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapModuleOutput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_output: Option<AnyPayload>,
}

/// A type-tagged encoded message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyPayload {
    /// e.g. `type.googleapis.com/sf.substreams.BlockMeta`
    pub type_url: String,
    #[serde(default, with = "base64_bytes")]
    pub value: Vec<u8>,
}

impl AnyPayload {
    /// Message name, without the `type.googleapis.com/` style prefix
    pub fn type_name(&self) -> &str {
        match self.type_url.rsplit_once('/') {
            Some((_, name)) => name,
            None => &self.type_url,
        }
    }
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        use serde::de::Error;

        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block_scoped_data() {
        let json = r#"{
            "type": "block_scoped_data",
            "clock": {"id": "0xabc", "number": 100000},
            "cursor": "c1",
            "finalBlockHeight": 99990,
            "output": {
                "name": "map_block_meta",
                "mapOutput": {"typeUrl": "type.googleapis.com/sf.substreams.BlockMeta", "value": "eyJudW1iZXIiOjF9"}
            }
        }"#;

        let response: Response = serde_json::from_str(json).unwrap();
        let Response::BlockScopedData(data) = &response else {
            panic!("expected block scoped data, got {:?}", response);
        };
        assert_eq!(data.cursor, Cursor::new("c1"));
        assert_eq!(data.clock.number, 100_000);

        let any = data.output.as_ref().unwrap().map_output.as_ref().unwrap();
        assert_eq!(any.value, br#"{"number":1}"#.to_vec());
        assert_eq!(any.type_name(), "sf.substreams.BlockMeta");
        assert_eq!(response.payload_len(), 12);
        assert_eq!(response.kind(), "block_scoped_data");
    }

    #[test]
    fn test_unknown_kind_is_other() {
        let response: Response =
            serde_json::from_str(r#"{"type": "debug_snapshot_data", "foo": 1}"#).unwrap();
        assert_eq!(response, Response::Other);
        assert_eq!(response.payload_len(), 0);
    }

    #[test]
    fn test_parse_undo_signal() {
        let json = r#"{
            "type": "block_undo_signal",
            "lastValidBlock": {"id": "0xdef", "number": 99},
            "lastValidCursor": "c0"
        }"#;
        let response: Response = serde_json::from_str(json).unwrap();
        assert!(matches!(
            response,
            Response::BlockUndoSignal(BlockUndoSignal { ref last_valid_cursor, .. })
                if last_valid_cursor.as_str() == "c0"
        ));
    }

    #[test]
    fn test_type_name_without_prefix() {
        let any = AnyPayload {
            type_url: "sf.substreams.BlockMeta".to_string(),
            value: vec![],
        };
        assert_eq!(any.type_name(), "sf.substreams.BlockMeta");
    }
}

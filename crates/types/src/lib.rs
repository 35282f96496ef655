//! Shared data model for Blockstream.
//!
//! These types describe what travels between the consumer and a block stream
//! endpoint: the package of modules being executed, the position range being
//! requested, the opaque cursor used for resumption, and the response
//! envelope emitted by the server for every block.

pub mod cursor;
pub mod package;
pub mod position;
pub mod progress;
pub mod request;
pub mod response;

pub use cursor::Cursor;
pub use package::{
    FieldDescriptor, FieldKind, Module, ModuleInput, ModuleKind, Package, TypeDescriptor,
};
pub use position::{PositionError, PositionRange, StopPosition};
pub use progress::ProgressSnapshot;
pub use request::Request;
pub use response::{
    AnyPayload, BlockRef, BlockScopedData, BlockUndoSignal, Clock, MapModuleOutput,
    ProcessedBytes, Response, SessionInit, StreamProgress,
};

pub mod defaults {
    /// Default module run by the consumer
    pub const MODULE: &str = "map_block_meta";
    /// Default block stream endpoint
    pub const ENDPOINT: &str = "https://api.streamingfast.io";
    /// First block of the default window
    pub const RANGE_START: u64 = 100_000;
    /// Last block of the default window (inclusive)
    pub const RANGE_STOP: u64 = 100_009;
    /// Number of data blocks consumed between voluntary restarts
    pub const RESTART_EVERY: u64 = 10;
    /// Pause before opening a session that resumes from a cursor
    pub const RESUME_DELAY_MS: u64 = 1500;
}

//! Blockstream SDK
//!
//! This crate consumes a cursor-based block stream: it opens a server-streaming
//! call for a package module, decodes every module output, tracks the last
//! acknowledged cursor and periodically restarts the stream from that cursor
//! with the module parameters moved to a new block window.
//!
//! # Overview
//!
//! The SDK provides these main abstractions:
//!
//! - [`Channel`] - Transport able to open one block stream call per request
//! - [`StreamSession`] - One bounded call with an explicit lifecycle
//! - [`Consumer`] - The restart loop binding windows, resuming from cursors and
//!   dispatching decoded outputs
//! - [`Decoder`] - Turns a module payload into a structured value
//!
//! # Quick Start
//!
//! ```ignore
//! use blockstream_sdk::{
//!     ChannelConfig, Consumer, ConsumerConfig, JsonLinesSink, SseChannel, TypeRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let package = load_package()?;
//!
//!     let channel = SseChannel::new(
//!         ChannelConfig::new("https://api.streamingfast.io").with_api_token("your-token"),
//!     );
//!     let registry = TypeRegistry::from_package(&package);
//!
//!     // Restart every 10 blocks, moving the window by 10 each time
//!     let config = ConsumerConfig::new("map_block_meta").with_restart_every(10);
//!
//!     let mut consumer = Consumer::new(channel, registry, package, config);
//!     let report = consumer.run(&mut JsonLinesSink::stdout()).await?;
//!
//!     println!("Consumed {} blocks", report.block_count);
//!     Ok(())
//! }
//! ```
//!
//! # Response Kinds
//!
//! - `session_init` - Session accepted, carries the trace id
//! - `progress` - Processing progress, never counted as a block
//! - `block_scoped_data` - Module output for one block, carries the cursor
//! - `block_undo_signal` - Chain reorganization notice
//! - `fatal_error` - Server-side failure, ends the session
//!
//! Unknown kinds are ignored.

pub mod channel;
pub mod consumer;
pub mod cursor;
pub mod decode;
pub mod error;
pub mod params;
pub mod progress;
pub mod registry;
pub mod session;
pub mod sink;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use channel::{BlockStream, Channel, SseChannel};
pub use consumer::{Consumer, ConsumerReport, ConsumerState};
pub use decode::{DecodedOutput, Decoder, decode, is_empty_message, unpack_map_output};
pub use error::{
    ConfigurationError, ConsumerError, DecodeError, Result, SinkError, StreamError,
};
pub use params::{apply_params, bind, window_param};
pub use progress::ProgressTracker;
pub use registry::TypeRegistry;
pub use session::{SessionState, StatefulResponse, StreamSession};
pub use sink::{JsonLinesSink, OutputSink};
pub use types::{
    ChannelConfig, ConsumerConfig, Cursor, Package, PositionRange, Request, Response,
    StopPosition, defaults,
};

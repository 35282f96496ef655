//! Scripted [`Channel`] and response builders for unit tests.

use std::{
    collections::VecDeque,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use blockstream_types::{
    AnyPayload, BlockRef, BlockScopedData, BlockUndoSignal, Clock, Cursor, MapModuleOutput,
    ProcessedBytes, Request, Response, SessionInit, StreamProgress,
};
use parking_lot::Mutex;

use crate::{
    channel::{BlockStream, Channel},
    error::StreamError,
};

pub const MODULE: &str = "map_block_meta";
pub const TYPE_URL: &str = "type.googleapis.com/sf.substreams.BlockMeta";

/// What the channel does for one `open_block_stream` call
pub enum Script {
    /// Accept the call and replay these items
    Open(Vec<Result<Response, StreamError>>),
    /// Refuse the call
    Reject(StreamError),
}

impl Script {
    pub fn items(items: Vec<Response>) -> Self {
        Script::Open(items.into_iter().map(Ok).collect())
    }
}

/// Replays one script per opened session and records every request.
///
/// Tracks how many opened streams are still alive so tests can check that a
/// session was released before the next one opened.
pub struct ScriptedChannel {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Request>>,
    live: Arc<AtomicUsize>,
    overlapping_opens: AtomicUsize,
}

impl ScriptedChannel {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
            live: Arc::new(AtomicUsize::new(0)),
            overlapping_opens: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Opened streams not dropped yet
    pub fn live_sessions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Calls opened while a previous stream was still alive
    pub fn overlapping_opens(&self) -> usize {
        self.overlapping_opens.load(Ordering::SeqCst)
    }

    fn open(&self, request: Request) -> Result<BlockStream, StreamError> {
        self.requests.lock().push(request);

        let script = self
            .scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| Script::items(vec![]));

        match script {
            Script::Reject(e) => Err(e),
            Script::Open(items) => {
                if self.live.fetch_add(1, Ordering::SeqCst) > 0 {
                    self.overlapping_opens.fetch_add(1, Ordering::SeqCst);
                }
                let guard = LiveGuard(Arc::clone(&self.live));
                let stream = async_stream::stream! {
                    let _guard = guard;
                    for item in items {
                        yield item;
                    }
                };
                Ok(Box::pin(stream))
            }
        }
    }
}

impl Channel for ScriptedChannel {
    fn open_block_stream(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<BlockStream, StreamError>> + Send {
        std::future::ready(self.open(request))
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A `block_scoped_data` response for [`MODULE`]; `None` carries no output
pub fn data(number: u64, cursor: &str, payload: Option<&str>) -> Response {
    Response::BlockScopedData(BlockScopedData {
        output: payload.map(|payload| MapModuleOutput {
            name: MODULE.to_string(),
            map_output: Some(AnyPayload {
                type_url: TYPE_URL.to_string(),
                value: payload.as_bytes().to_vec(),
            }),
        }),
        clock: Clock {
            id: format!("0x{:x}", number),
            number,
            timestamp: None,
        },
        cursor: Cursor::new(cursor),
        final_block_height: number.saturating_sub(10),
    })
}

/// A `block_scoped_data` response carrying the output of another module
pub fn data_with_output(number: u64, cursor: &str, module: &str, payload: &str) -> Response {
    let mut response = data(number, cursor, Some(payload));
    if let Response::BlockScopedData(ref mut block) = response {
        if let Some(ref mut output) = block.output {
            output.name = module.to_string();
        }
    }
    response
}

pub fn undo(last_valid_block: u64, last_valid_cursor: &str) -> Response {
    Response::BlockUndoSignal(BlockUndoSignal {
        last_valid_block: BlockRef {
            id: format!("0x{:x}", last_valid_block),
            number: last_valid_block,
        },
        last_valid_cursor: Cursor::new(last_valid_cursor),
    })
}

pub fn progress(total_bytes_read: u64, total_bytes_written: u64) -> Response {
    Response::Progress(StreamProgress {
        processed_bytes: Some(ProcessedBytes {
            total_bytes_read,
            total_bytes_written,
        }),
        running_jobs: 1,
    })
}

pub fn session_init(trace_id: &str) -> Response {
    Response::SessionInit(SessionInit {
        trace_id: trace_id.to_string(),
        ..Default::default()
    })
}

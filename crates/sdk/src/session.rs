//! One bounded block stream call.
//!
//! ```text
//! Idle --open--> Opening --accepted--> Streaming --end of stream / close--> Closed
//!                   |                      |
//!                   +------- error --------+--> Failed
//! ```
//!
//! A session never retries on its own and cannot be reopened once it left
//! `Idle`; the consumer opens a fresh session for every attempt.

use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    channel::{BlockStream, Channel},
    error::StreamError,
    progress::ProgressTracker,
    types::{ProgressSnapshot, Request, Response},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not opened yet
    Idle,

    /// Waiting for the remote to accept the call
    Opening,

    /// Receiving responses
    Streaming,

    /// Ended by the server or closed by the caller
    Closed,

    /// Ended by an error
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Opening => write!(f, "opening"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Closed => write!(f, "closed"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// A response together with the session's progress after observing it
#[derive(Debug, Clone)]
pub struct StatefulResponse {
    pub progress: ProgressSnapshot,
    pub response: Response,
}

pub struct StreamSession {
    state: SessionState,
    inner: Option<BlockStream>,
    progress: ProgressTracker,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            inner: None,
            progress: ProgressTracker::new(),
        }
    }

    /// Open a session for `request` over `channel`
    pub async fn connect<C: Channel>(channel: &C, request: Request) -> Result<Self, StreamError> {
        let mut session = Self::new();
        session.open(channel, request).await?;
        Ok(session)
    }

    /// Get the current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn progress(&self) -> &ProgressSnapshot {
        self.progress.snapshot()
    }

    pub async fn open<C: Channel>(
        &mut self,
        channel: &C,
        request: Request,
    ) -> Result<(), StreamError> {
        if self.state != SessionState::Idle {
            return Err(StreamError::InvalidState(self.state));
        }

        self.state = SessionState::Opening;
        match channel.open_block_stream(request).await {
            Ok(stream) => {
                self.inner = Some(stream);
                self.state = SessionState::Streaming;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to open block stream");
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Pull the next response.
    ///
    /// Returns `None` once the session is closed or failed. A server-sent
    /// fatal error is surfaced as [`StreamError::Fatal`].
    pub async fn next(&mut self) -> Option<Result<StatefulResponse, StreamError>> {
        if self.state != SessionState::Streaming {
            return None;
        }
        let next = self.inner.as_mut()?.next().await;

        match next {
            Some(Ok(Response::FatalError { reason })) => {
                self.release(SessionState::Failed);
                Some(Err(StreamError::Fatal(reason)))
            }
            Some(Ok(response)) => {
                let progress = self.progress.observe(&response);
                debug!(
                    kind = response.kind(),
                    messages = progress.messages_received,
                    "Received response"
                );
                Some(Ok(StatefulResponse { progress, response }))
            }
            Some(Err(e)) => {
                self.release(SessionState::Failed);
                Some(Err(e))
            }
            None => {
                info!(
                    messages = self.progress.snapshot().messages_received,
                    "Block stream closed by server"
                );
                self.release(SessionState::Closed);
                None
            }
        }
    }

    /// Stop consuming and release the underlying call
    pub fn close(&mut self) {
        if matches!(self.state, SessionState::Opening | SessionState::Streaming) {
            debug!("Closing block stream");
            self.release(SessionState::Closed);
        }
    }

    fn release(&mut self, state: SessionState) {
        self.inner = None;
        self.state = state;
    }

    /// Adapt the session into a stream of responses
    pub fn into_stream(mut self) -> impl Stream<Item = Result<StatefulResponse, StreamError>> {
        async_stream::stream! {
            while let Some(item) = self.next().await {
                yield item;
            }
        }
    }
}

//! The consumer loop.
//!
//! Each attempt binds the active window into the module parameters, opens a
//! session resuming from the last acknowledged cursor, and feeds every
//! response through the decoder and the cursor tracker. After every
//! `restart_every` data blocks the session is closed and a new one is opened
//! with the window moved forward by `window_shift`. The loop completes when a
//! session ends on its own.
//!
//! ```text
//! Binding -> Opening -> Streaming -+-> Restarting -> Binding
//!               ^                  +-> Reconnecting -> Opening
//!               |                  +-> Completed
//!               +------------------+
//! ```

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::{
    channel::Channel,
    cursor,
    decode::{self, Decoder},
    error::{ConsumerError, Result, StreamError},
    params,
    session::StreamSession,
    sink::OutputSink,
    types::{ConsumerConfig, Cursor, Package, PositionRange, Request, Response},
};

/// State owned by the consumer loop. Nothing else writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerState {
    /// Last acknowledged cursor; `None` until the first data block
    pub cursor: Option<Cursor>,

    /// Window currently bound into the module parameters
    pub window: PositionRange,

    /// Data blocks consumed across every session
    pub block_count: u64,
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumerReport {
    pub final_cursor: Option<Cursor>,
    pub final_window: Option<PositionRange>,
    pub block_count: u64,
    /// Outputs handed to the sink
    pub dispatched: u64,
    pub decode_errors: u64,
    pub undo_signals: u64,
    /// Sessions opened, including failed and reconnected ones
    pub sessions: u64,
}

enum Phase {
    Binding,
    Opening,
    Streaming(StreamSession),
    Restarting,
    Reconnecting(StreamError),
    Completed,
}

pub struct Consumer<C, D> {
    channel: C,
    decoder: D,
    package: Package,
    config: ConsumerConfig,
    state: ConsumerState,
}

impl<C: Channel, D: Decoder> Consumer<C, D> {
    pub fn new(channel: C, decoder: D, package: Package, config: ConsumerConfig) -> Self {
        let state = ConsumerState {
            cursor: None,
            window: config.window,
            block_count: 0,
        };

        Self {
            channel,
            decoder,
            package,
            config,
            state,
        }
    }

    pub fn state(&self) -> &ConsumerState {
        &self.state
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Package as last bound
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Run until a session ends without reaching the restart trigger.
    ///
    /// Configuration and stream errors unwind the loop. Decode errors are
    /// logged and counted; the stream keeps going.
    pub async fn run<S: OutputSink>(&mut self, sink: &mut S) -> Result<ConsumerReport> {
        self.config.validate()?;

        let mut report = ConsumerReport::default();
        let mut reconnect_attempts = 0u32;
        let mut phase = Phase::Binding;

        loop {
            phase = match phase {
                Phase::Binding => {
                    self.bind_window()?;
                    Phase::Opening
                }
                Phase::Opening => {
                    let request = self.build_request();

                    if let Some(ref cursor) = request.start_cursor {
                        info!(
                            cursor = %cursor,
                            delay_ms = self.config.resume_delay_ms,
                            "Resuming from cursor"
                        );
                        tokio::time::sleep(Duration::from_millis(self.config.resume_delay_ms))
                            .await;
                    }

                    report.sessions += 1;
                    let mut session = StreamSession::new();
                    match session.open(&self.channel, request).await {
                        Ok(()) => {
                            info!(
                                window = %self.state.window,
                                session = report.sessions,
                                "Session opened"
                            );
                            Phase::Streaming(session)
                        }
                        Err(e) => Phase::Reconnecting(e),
                    }
                }
                Phase::Streaming(mut session) => {
                    let next = self
                        .consume(&mut session, sink, &mut report, &mut reconnect_attempts)
                        .await?;
                    // Released before any other session can open
                    session.close();
                    next
                }
                Phase::Restarting => {
                    let shifted = self.state.window.shift(self.config.window_shift);
                    info!(
                        block_count = self.state.block_count,
                        from = %self.state.window,
                        to = %shifted,
                        "Stopping each {} blocks",
                        self.config.restart_every
                    );
                    self.state.window = shifted;
                    Phase::Binding
                }
                Phase::Reconnecting(e) => {
                    if !self.config.auto_reconnect || !e.is_retryable() {
                        error!(error = %e, "Block stream failed");
                        return Err(ConsumerError::Stream(e));
                    }

                    reconnect_attempts += 1;
                    if self.config.max_reconnect_attempts > 0
                        && reconnect_attempts > self.config.max_reconnect_attempts
                    {
                        error!(
                            error = %e,
                            attempts = reconnect_attempts - 1,
                            "Max reconnection attempts reached"
                        );
                        return Err(ConsumerError::Stream(e));
                    }

                    warn!(
                        error = %e,
                        attempt = reconnect_attempts,
                        delay_ms = self.config.reconnect_delay_ms,
                        "Scheduling reconnection"
                    );
                    tokio::time::sleep(Duration::from_millis(self.config.reconnect_delay_ms))
                        .await;
                    Phase::Opening
                }
                Phase::Completed => {
                    info!(
                        block_count = self.state.block_count,
                        dispatched = report.dispatched,
                        "Completing"
                    );
                    break;
                }
            };
        }

        report.final_cursor = self.state.cursor.clone();
        report.final_window = Some(self.state.window);
        report.block_count = self.state.block_count;
        Ok(report)
    }

    fn bind_window(&mut self) -> Result<()> {
        let value = (self.config.window_param)(&self.state.window);
        params::bind(&mut self.package, &self.config.module, &value)?;
        Ok(())
    }

    /// Request for the next session.
    ///
    /// Start and stop blocks stay fixed across restarts; only the bound
    /// parameters and the resume cursor change.
    fn build_request(&self) -> Request {
        Request::new(
            self.package.clone(),
            self.config.module.clone(),
            self.config.start_block_num,
            self.config.stop_block_num,
        )
        .with_production_mode(self.config.production_mode)
        .with_start_cursor(self.state.cursor.clone())
    }

    async fn consume<S: OutputSink>(
        &mut self,
        session: &mut StreamSession,
        sink: &mut S,
        report: &mut ConsumerReport,
        reconnect_attempts: &mut u32,
    ) -> Result<Phase> {
        while let Some(item) = session.next().await {
            let response = match item {
                Ok(stateful) => stateful.response,
                Err(e) => return Ok(Phase::Reconnecting(e)),
            };
            *reconnect_attempts = 0;

            match decode::decode(&response, &self.config.module, &self.decoder) {
                Ok(Some(output)) => {
                    sink.emit(output)?;
                    report.dispatched += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        error = %e,
                        block_count = self.state.block_count,
                        "Failed to decode module output"
                    );
                    report.decode_errors += 1;
                }
            }

            if let Response::BlockUndoSignal(ref undo) = response {
                info!(
                    last_valid_block = undo.last_valid_block.number,
                    "Received undo signal"
                );
                report.undo_signals += 1;
            }

            if let Some(cursor) = cursor::observe(&response) {
                debug!(cursor = %cursor, "Advancing cursor");
                self.state.cursor = Some(cursor);
                self.state.block_count += 1;

                if self.state.block_count % self.config.restart_every == 0 {
                    return Ok(Phase::Restarting);
                }
            }
        }

        Ok(Phase::Completed)
    }
}

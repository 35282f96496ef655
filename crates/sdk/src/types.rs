// Re-export shared types from blockstream-types
pub use blockstream_types::{
    AnyPayload, BlockRef, BlockScopedData, BlockUndoSignal, Clock, Cursor, MapModuleOutput,
    Module, ModuleInput, Package, PositionRange, ProgressSnapshot, Request, Response,
    StopPosition, defaults,
};

use crate::{error::ConfigurationError, params::window_param};

/// Configuration for the stream endpoint
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Base URL of the block stream API
    pub endpoint: String,

    /// Bearer token sent with every stream request
    pub api_token: Option<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::ENDPOINT.to_string(),
            api_token: None,
        }
    }
}

impl ChannelConfig {
    /// Create a new configuration with the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the API token used for bearer authentication
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }
}

/// Configuration for the consumer loop
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Module whose output is consumed
    pub module: String,

    /// Initial window bound into the module parameters
    pub window: PositionRange,

    /// Data blocks consumed between voluntary restarts
    pub restart_every: u64,

    /// Blocks the window moves forward on each restart
    pub window_shift: u64,

    /// Start block of every session request
    pub start_block_num: u64,

    /// Stop block of every session request, resolved against `start_block_num`
    pub stop_block_num: StopPosition,

    pub production_mode: bool,

    /// Pause before opening a session that resumes from a cursor (milliseconds)
    pub resume_delay_ms: u64,

    /// Whether to reopen the stream from the last cursor after a transport error
    pub auto_reconnect: bool,

    /// Maximum number of consecutive reconnection attempts (0 = infinite)
    pub max_reconnect_attempts: u32,

    /// Delay between reconnection attempts (milliseconds)
    pub reconnect_delay_ms: u64,

    /// Renders the active window into the module's parameter string
    pub window_param: fn(&PositionRange) -> String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            module: defaults::MODULE.to_string(),
            window: PositionRange::absolute(defaults::RANGE_START, defaults::RANGE_STOP),
            restart_every: defaults::RESTART_EVERY,
            window_shift: defaults::RESTART_EVERY,
            start_block_num: defaults::RANGE_START,
            stop_block_num: StopPosition::Relative(100),
            production_mode: false,
            resume_delay_ms: defaults::RESUME_DELAY_MS,
            auto_reconnect: false,
            max_reconnect_attempts: 0, // infinite
            reconnect_delay_ms: 1000,
            window_param,
        }
    }
}

impl ConsumerConfig {
    /// Create a new configuration consuming the given module
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Default::default()
        }
    }

    /// Set the initial window
    pub fn with_window(mut self, window: PositionRange) -> Self {
        self.window = window;
        self
    }

    /// Set how many data blocks are consumed between restarts
    pub fn with_restart_every(mut self, blocks: u64) -> Self {
        self.restart_every = blocks;
        self
    }

    /// Set how far the window moves on each restart
    pub fn with_window_shift(mut self, blocks: u64) -> Self {
        self.window_shift = blocks;
        self
    }

    /// Set the start and stop blocks of every session request
    pub fn with_blocks(mut self, start: u64, stop: StopPosition) -> Self {
        self.start_block_num = start;
        self.stop_block_num = stop;
        self
    }

    pub fn with_production_mode(mut self, production_mode: bool) -> Self {
        self.production_mode = production_mode;
        self
    }

    /// Set the pause before resuming from a cursor
    pub fn with_resume_delay(mut self, delay_ms: u64) -> Self {
        self.resume_delay_ms = delay_ms;
        self
    }

    /// Enable auto-reconnection on transport errors
    pub fn with_auto_reconnect(mut self) -> Self {
        self.auto_reconnect = true;
        self
    }

    /// Set the reconnection delay
    pub fn with_reconnect_delay(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Set maximum reconnection attempts
    pub fn with_max_reconnect_attempts(mut self, max: u32) -> Self {
        self.max_reconnect_attempts = max;
        self
    }

    /// Set how the window is rendered into the module parameters
    pub fn with_window_param(mut self, render: fn(&PositionRange) -> String) -> Self {
        self.window_param = render;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.module.trim().is_empty() {
            return Err(ConfigurationError::MissingModuleName);
        }
        if self.restart_every == 0 {
            return Err(ConfigurationError::InvalidRestartCadence);
        }
        self.window.validate()?;
        PositionRange::new(self.start_block_num, self.stop_block_num).validate()?;
        Ok(())
    }
}

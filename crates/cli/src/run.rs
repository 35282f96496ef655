use blockstream_sdk::{
    ChannelConfig, Consumer, ConsumerConfig, JsonLinesSink, SseChannel, TypeRegistry,
    apply_params,
};
use blockstream_types::{PositionRange, StopPosition, defaults};
use console::style;
use tracing::info;

use crate::package::load_package;

#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct RunCommand {
    /// Block stream endpoint
    #[arg(long, env = "SUBSTREAMS_ENDPOINT", default_value = defaults::ENDPOINT)]
    pub endpoint: String,

    /// API token sent as a bearer token
    #[arg(long, env = "SUBSTREAMS_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Package file (.json, .yaml) or http(s) URL
    #[arg(
        long,
        env = "SUBSTREAMS_PACKAGE",
        default_value = "./substreams/substreams-head-tracker-v1.0.0.json"
    )]
    pub package: String,

    /// Module whose output is consumed
    #[arg(long, default_value = defaults::MODULE)]
    pub module: String,

    /// First block of the window bound into the module parameters
    #[arg(long, default_value_t = defaults::RANGE_START)]
    pub range_start: u64,

    /// Last block of the window (inclusive)
    #[arg(long, default_value_t = defaults::RANGE_STOP)]
    pub range_stop: u64,

    /// Start block of every session request
    #[arg(long, default_value_t = defaults::RANGE_START)]
    pub start_block: u64,

    /// Stop block of every session request, absolute or relative ("+100")
    #[arg(long, default_value = "+100")]
    pub stop_block: StopPosition,

    /// Data blocks consumed between restarts
    #[arg(long, default_value_t = defaults::RESTART_EVERY)]
    pub restart_every: u64,

    /// Blocks the window moves forward on each restart
    #[arg(long, default_value_t = defaults::RESTART_EVERY)]
    pub window_shift: u64,

    /// Pause before resuming from a cursor (milliseconds)
    #[arg(long, default_value_t = defaults::RESUME_DELAY_MS)]
    pub resume_delay_ms: u64,

    #[arg(long)]
    pub production_mode: bool,

    /// Reopen the stream from the last cursor after a transport error
    #[arg(long)]
    pub auto_reconnect: bool,

    /// Maximum consecutive reconnection attempts (0 = infinite)
    #[arg(long, default_value_t = 0)]
    pub max_reconnect_attempts: u32,

    /// Delay between reconnection attempts (milliseconds)
    #[arg(long, default_value_t = 1000)]
    pub reconnect_delay_ms: u64,

    /// Extra module parameters, as module=value
    #[arg(long = "param")]
    pub params: Vec<String>,

    /// Write block number, id, cursor and module alongside each value
    #[arg(long)]
    pub with_metadata: bool,
}

impl RunCommand {
    pub async fn execute(&self) -> Result<(), String> {
        // Logs go to stderr, stdout only carries decoded outputs
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init();

        let api_token = self
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                "Missing API token: set SUBSTREAMS_API_TOKEN or pass --api-token".to_string()
            })?;

        let config = self.consumer_config();
        config.validate().map_err(|e| e.to_string())?;

        let mut package = load_package(&self.package).await?;
        apply_params(&mut package, self.params.as_slice()).map_err(|e| e.to_string())?;
        info!(
            package = %self.package,
            modules = package.modules.len(),
            "Loaded package"
        );

        eprintln!();
        eprintln!("{}", style("Blockstream").green());
        eprintln!("{} {}", style("Endpoint").dim(), self.endpoint);
        eprintln!("{} {}", style("Module").dim(), config.module);
        eprintln!("{} {}", style("Window").dim(), config.window);
        eprintln!(
            "{} every {} blocks",
            style("Restart").dim(),
            config.restart_every
        );
        eprintln!();

        let channel = SseChannel::new(ChannelConfig::new(&self.endpoint).with_api_token(api_token));
        let registry = TypeRegistry::from_package(&package);

        let mut sink = JsonLinesSink::stdout();
        if self.with_metadata {
            sink = sink.with_metadata();
        }

        let mut consumer = Consumer::new(channel, registry, package, config);
        let report = consumer.run(&mut sink).await.map_err(|e| e.to_string())?;

        eprintln!();
        eprintln!(
            "{}",
            style(format!(
                "✓ {} blocks, {} outputs in {} sessions",
                report.block_count, report.dispatched, report.sessions
            ))
            .green()
        );
        if report.decode_errors > 0 {
            eprintln!(
                "{} {} outputs could not be decoded",
                style("Warning:").yellow(),
                report.decode_errors
            );
        }
        if let Some(cursor) = report.final_cursor {
            eprintln!("{} {}", style("Cursor").dim(), cursor);
        }

        Ok(())
    }

    fn consumer_config(&self) -> ConsumerConfig {
        let mut config = ConsumerConfig::new(&self.module)
            .with_window(PositionRange::absolute(self.range_start, self.range_stop))
            .with_restart_every(self.restart_every)
            .with_window_shift(self.window_shift)
            .with_blocks(self.start_block, self.stop_block)
            .with_production_mode(self.production_mode)
            .with_resume_delay(self.resume_delay_ms)
            .with_reconnect_delay(self.reconnect_delay_ms)
            .with_max_reconnect_attempts(self.max_reconnect_attempts);

        if self.auto_reconnect {
            config = config.with_auto_reconnect();
        }

        config
    }
}

use serde::{Deserialize, Serialize};

use crate::{Cursor, Package, StopPosition};

/// A block stream request, as sent when a session is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Package carrying the (possibly re-parameterized) modules
    pub package: Package,

    /// Module whose output is streamed back
    pub output_module: String,

    pub production_mode: bool,

    pub start_block_num: u64,

    /// Absolute stop block; relative stops are resolved when the request is built
    pub stop_block_num: u64,

    /// Resume point; absent on the very first session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<Cursor>,
}

impl Request {
    pub fn new(
        package: Package,
        output_module: impl Into<String>,
        start_block_num: u64,
        stop_block_num: StopPosition,
    ) -> Self {
        Self {
            package,
            output_module: output_module.into(),
            production_mode: false,
            start_block_num,
            stop_block_num: stop_block_num.resolve(start_block_num),
            start_cursor: None,
        }
    }

    pub fn with_production_mode(mut self, production_mode: bool) -> Self {
        self.production_mode = production_mode;
        self
    }

    pub fn with_start_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.start_cursor = cursor;
        self
    }
}

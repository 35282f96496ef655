//! Destinations for decoded outputs.
//!
//! The consumer hands every non-empty output to an [`OutputSink`], in arrival
//! order. A sink error is fatal to the consumer.

use std::io::Write;

use tokio::sync::mpsc;

use crate::{decode::DecodedOutput, error::SinkError};

pub trait OutputSink {
    fn emit(&mut self, output: DecodedOutput) -> Result<(), SinkError>;
}

impl<F: FnMut(DecodedOutput)> OutputSink for F {
    fn emit(&mut self, output: DecodedOutput) -> Result<(), SinkError> {
        self(output);
        Ok(())
    }
}

impl OutputSink for Vec<DecodedOutput> {
    fn emit(&mut self, output: DecodedOutput) -> Result<(), SinkError> {
        self.push(output);
        Ok(())
    }
}

impl OutputSink for mpsc::UnboundedSender<DecodedOutput> {
    fn emit(&mut self, output: DecodedOutput) -> Result<(), SinkError> {
        self.send(output).map_err(|_| SinkError::Closed)
    }
}

/// Writes one compact JSON document per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
    with_metadata: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            with_metadata: false,
        }
    }

    /// Write the block number, id, cursor and module alongside the value
    pub fn with_metadata(mut self) -> Self {
        self.with_metadata = true;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> OutputSink for JsonLinesSink<W> {
    fn emit(&mut self, output: DecodedOutput) -> Result<(), SinkError> {
        if self.with_metadata {
            serde_json::to_writer(&mut self.writer, &output)?;
        } else {
            serde_json::to_writer(&mut self.writer, &output.value)?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use blockstream_types::Cursor;
    use serde_json::json;

    use super::*;

    fn output(number: u64) -> DecodedOutput {
        DecodedOutput {
            module: "map_block_meta".to_string(),
            block_number: number,
            block_id: format!("0x{:x}", number),
            cursor: Cursor::new(format!("c{}", number)),
            value: json!({"number": number.to_string()}),
        }
    }

    #[test]
    fn test_json_lines_sink() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(output(1)).unwrap();
        sink.emit(output(2)).unwrap();

        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(written, "{\"number\":\"1\"}\n{\"number\":\"2\"}\n");
    }

    #[test]
    fn test_json_lines_sink_with_metadata() {
        let mut sink = JsonLinesSink::new(Vec::new()).with_metadata();
        sink.emit(output(16)).unwrap();

        let written = String::from_utf8(sink.into_inner()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(written.trim_end()).unwrap();
        assert_eq!(doc["module"], "map_block_meta");
        assert_eq!(doc["blockNumber"], 16);
        assert_eq!(doc["blockId"], "0x10");
        assert_eq!(doc["cursor"], "c16");
        assert_eq!(doc["value"]["number"], "16");
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |o: DecodedOutput| seen.push(o.block_number);
            sink.emit(output(1)).unwrap();
            sink.emit(output(2)).unwrap();
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<DecodedOutput>();
        tx.emit(output(7)).unwrap();
        assert_eq!(rx.recv().await.unwrap().block_number, 7);

        drop(rx);
        assert!(matches!(tx.emit(output(8)), Err(SinkError::Closed)));
    }
}

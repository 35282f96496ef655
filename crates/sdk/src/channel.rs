//! Transport seam for block streams.
//!
//! A [`Channel`] opens one server-streaming call per request. [`SseChannel`]
//! is the HTTP implementation: the request is POSTed as JSON and the server
//! answers with a `text/event-stream` where every `message` event carries one
//! JSON encoded [`Response`].

use std::{future::Future, pin::Pin};

use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use reqwest_eventsource::{Error as SseError, Event as SseEvent, EventSource, retry::Never};
use tracing::{debug, info};

use crate::{
    error::StreamError,
    types::{ChannelConfig, Request, Response},
};

/// Lazy sequence of responses for one call. Dropping it releases the call.
pub type BlockStream = Pin<Box<dyn Stream<Item = Result<Response, StreamError>> + Send>>;

/// An already-authenticated transport able to open block streams.
pub trait Channel {
    /// Open a stream call for `request`, resolving once the remote accepted it
    fn open_block_stream(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<BlockStream, StreamError>> + Send;
}

impl<C: Channel + Sync> Channel for &C {
    fn open_block_stream(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<BlockStream, StreamError>> + Send {
        (**self).open_block_stream(request)
    }
}

/// Path of the block stream call, relative to the endpoint
const BLOCKS_PATH: &str = "sf.substreams.rpc.v2.Stream/Blocks";

/// Event name carrying responses; keep-alives and other events are skipped
const MESSAGE_EVENT: &str = "message";

/// Block stream over HTTP server-sent events
#[derive(Debug, Clone)]
pub struct SseChannel {
    config: ChannelConfig,
    http_client: reqwest::Client,
}

impl SseChannel {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured HTTP client (proxy, timeouts, TLS)
    pub fn with_client(config: ChannelConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Build the URL of the block stream call
    fn build_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            BLOCKS_PATH
        )
    }

    fn build_request(&self, request: &Request) -> reqwest::RequestBuilder {
        let mut builder = self
            .http_client
            .post(self.build_url())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request);

        if let Some(ref token) = self.config.api_token {
            builder = builder.bearer_auth(token);
        }

        builder
    }
}

impl Channel for SseChannel {
    fn open_block_stream(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<BlockStream, StreamError>> + Send {
        let url = self.build_url();
        let builder = self.build_request(&request);

        async move {
            info!(
                url = %url,
                start_block = request.start_block_num,
                stop_block = request.stop_block_num,
                resuming = request.start_cursor.is_some(),
                "Opening block stream"
            );

            let mut es = EventSource::new(builder)
                .map_err(|e| StreamError::Connection(e.to_string()))?;
            // Retrying is the consumer's decision, never the transport's
            es.set_retry_policy(Box::new(Never));

            // Wait for the remote to accept the call
            let first = match es.next().await {
                Some(Ok(SseEvent::Open)) => None,
                Some(Ok(SseEvent::Message(msg))) if msg.event != MESSAGE_EVENT => {
                    debug!(event = %msg.event, "Skipping event");
                    None
                }
                Some(Ok(SseEvent::Message(msg))) => Some(parse_message(&msg.data)),
                Some(Err(SseError::StreamEnded)) | None => {
                    es.close();
                    return Ok(Box::pin(futures::stream::empty::<Result<Response, StreamError>>())
                        as BlockStream);
                }
                Some(Err(e)) => {
                    es.close();
                    return Err(map_error(e));
                }
            };
            debug!(url = %url, "Block stream accepted");

            let stream = async_stream::stream! {
                if let Some(item) = first {
                    let failed = item.is_err();
                    yield item;
                    if failed {
                        es.close();
                        return;
                    }
                }

                while let Some(event) = es.next().await {
                    match event {
                        Ok(SseEvent::Open) => {}
                        Ok(SseEvent::Message(msg)) if msg.event != MESSAGE_EVENT => {
                            debug!(event = %msg.event, "Skipping event");
                        }
                        Ok(SseEvent::Message(msg)) => {
                            let item = parse_message(&msg.data);
                            let failed = item.is_err();
                            yield item;
                            if failed {
                                break;
                            }
                        }
                        Err(SseError::StreamEnded) => {
                            debug!("Block stream ended by server");
                            break;
                        }
                        Err(e) => {
                            yield Err(map_error(e));
                            break;
                        }
                    }
                }

                es.close();
            };

            Ok(Box::pin(stream) as BlockStream)
        }
    }
}

fn parse_message(data: &str) -> Result<Response, StreamError> {
    serde_json::from_str(data).map_err(|e| StreamError::Protocol(format!("{}: {}", e, data)))
}

fn map_error(error: SseError) -> StreamError {
    match error {
        SseError::Transport(e) => StreamError::Http(e),
        SseError::InvalidStatusCode(status, _)
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
        {
            StreamError::Authentication(format!("endpoint answered {}", status))
        }
        SseError::InvalidStatusCode(status, _) => {
            StreamError::Transport(format!("endpoint answered {}", status))
        }
        SseError::InvalidContentType(content_type, _) => StreamError::Protocol(format!(
            "unexpected content type {:?}",
            content_type
        )),
        other => StreamError::Protocol(other.to_string()),
    }
}

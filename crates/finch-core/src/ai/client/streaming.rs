//! Streaming chat calls
//!
//! Ollama streams NDJSON. A background task reads the body, parses lines,
//! and forwards `StreamPart`s over a channel. When the receiver goes away
//! the task stops and the response (and its connection) is dropped.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::config::ModelOptions;
use super::core::OllamaClient;
use crate::ai::model::{ModelError, StreamPart};
use crate::ai::parsers::ollama::{build_chat_body, parse_stream_line};
use crate::ai::parsers::NdjsonBuffer;
use crate::ai::types::Conversation;

impl OllamaClient {
    pub async fn call_streaming(
        &self,
        model: &str,
        conversation: &Conversation,
        options: &ModelOptions,
    ) -> Result<mpsc::UnboundedReceiver<StreamPart>, ModelError> {
        let body = build_chat_body(model, conversation, &[], options, true);
        let idle_timeout = self.config().stream_idle_timeout;

        let response = tokio::time::timeout(idle_timeout, self.post_chat(&body))
            .await
            .map_err(|_| ModelError::Timeout(idle_timeout))??;

        let (tx, rx) = mpsc::unbounded_channel();
        spawn_ndjson_stream_task(response.bytes_stream(), tx, idle_timeout);
        Ok(rx)
    }
}

/// Forward parsed chunks until the stream finishes, fails, or the receiver
/// is dropped. Failures are sent as `StreamPart::Error` so the receiver
/// never waits on a silently dead channel.
fn spawn_ndjson_stream_task<S>(
    stream: S,
    tx: mpsc::UnboundedSender<StreamPart>,
    idle_timeout: Duration,
) where
    S: futures::Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::pin!(stream);
        let mut buffer = NdjsonBuffer::new();
        let mut chunk_count: u64 = 0;

        loop {
            let next = match tokio::time::timeout(idle_timeout, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!("Ollama stream idle for {:?}, giving up", idle_timeout);
                    let _ = tx.send(StreamPart::Error {
                        error: format!("no data for {idle_timeout:?}"),
                    });
                    return;
                }
            };

            let exhausted = next.is_none();
            let lines = match next {
                Some(Ok(bytes)) => {
                    chunk_count += 1;
                    buffer.push(&bytes)
                }
                Some(Err(e)) => {
                    warn!("Ollama stream read error at chunk #{}: {}", chunk_count, e);
                    let _ = tx.send(StreamPart::Error {
                        error: format!("read error: {e}"),
                    });
                    return;
                }
                None => buffer.finish().into_iter().collect(),
            };

            for line in lines {
                match parse_stream_line(&line) {
                    Ok(parts) => {
                        for part in parts {
                            let finished = matches!(part, StreamPart::Finish { .. });
                            if tx.send(part).is_err() {
                                debug!("Stream receiver dropped, aborting model stream");
                                return;
                            }
                            if finished {
                                debug!("Ollama stream finished after {} chunks", chunk_count);
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(StreamPart::Error {
                            error: e.to_string(),
                        });
                        return;
                    }
                }
            }

            if exhausted {
                debug!("Ollama stream closed after {} chunks", chunk_count);
                return;
            }
            if tx.is_closed() {
                return;
            }
        }
    });
}

//! Long-lived `statuses/filter` subscription.
//!
//! The connection is read by a background task that splits the body on
//! newlines and forwards each JSON document in arrival order. A dropped
//! connection ends the stream; it is never reopened.

use futures_util::StreamExt;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::TwitterRestClient;
use crate::credentials::Credential;
use crate::error::TwitterResult;
use crate::types::StreamFilter;

const STREAM_CHANNEL_CAPACITY: usize = 256;

/// Handle to an open subscription. Dropping or stopping it closes the
/// connection permanently.
#[derive(Debug)]
pub struct TweetStream {
    events: mpsc::Receiver<Value>,
    reader: Option<JoinHandle<()>>,
}

impl TweetStream {
    /// Wraps an event channel fed by some other producer.
    pub fn from_receiver(events: mpsc::Receiver<Value>) -> Self {
        Self {
            events,
            reader: None,
        }
    }

    /// Waits for the next raw event. Returns `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<Value> {
        self.events.recv().await
    }

    pub fn stop(&mut self) {
        self.events.close();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for TweetStream {
    fn drop(&mut self) {
        self.stop();
    }
}

pub(crate) async fn open_filtered_stream(
    client: &TwitterRestClient,
    credential: &Credential,
    filter: &StreamFilter,
) -> TwitterResult<TweetStream> {
    let url = client.config().stream_url("/1.1/statuses/filter.json");
    info!(track = %filter.track, language = %filter.language, "opening filtered stream");
    let response = client
        .send_signed(
            client.stream_http(),
            Method::POST,
            &url,
            credential,
            &filter.form_params(),
        )
        .await?;

    let (event_tx, event_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    let track = filter.track.clone();
    let reader = tokio::spawn(async move {
        read_stream_body(response, event_tx, &track).await;
    });
    Ok(TweetStream {
        events: event_rx,
        reader: Some(reader),
    })
}

async fn read_stream_body(response: reqwest::Response, event_tx: mpsc::Sender<Value>, track: &str) {
    let mut body = response.bytes_stream();
    let mut lines = LineBuffer::default();
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                warn!(track, error = %error, "filtered stream read failed");
                return;
            }
        };
        for line in lines.push(&chunk) {
            let Some(event) = parse_stream_line(&line) else {
                continue;
            };
            if event_tx.send(event).await.is_err() {
                debug!(track, "stream receiver dropped");
                return;
            }
        }
    }
    if let Some(event) = lines.finish().as_deref().and_then(parse_stream_line) {
        if event_tx.send(event).await.is_err() {
            debug!(track, "stream receiver dropped");
            return;
        }
    }
    info!(track, "filtered stream ended");
}

/// Parses one delimited stream line. Keep-alive blank lines and undecodable
/// payloads yield `None`.
pub(crate) fn parse_stream_line(line: &str) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Some(value),
        Err(error) => {
            debug!(error = %error, "discarding undecodable stream line");
            None
        }
    }
}

/// Accumulates body chunks and yields complete newline-terminated lines.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(position) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line = self.pending.drain(..=position).collect::<Vec<_>>();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Takes the unterminated remainder left when the body ends.
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

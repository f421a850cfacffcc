use futures_util::StreamExt;
use memchr::memchr;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::errors::summarize_api_error;
use crate::api::{ChatMessage, ChatRequest, ChatResponse};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

/// Line protocol spoken by the text-generation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamProtocol {
    /// `0:"text"` fragments, `3:"error"` errors, and a `d:{..}` finish marker.
    #[default]
    DataStream,
    /// OpenAI-compatible server-sent events terminated by `data: [DONE]`.
    Sse,
}

impl StreamProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamProtocol::DataStream => "data-stream",
            StreamProtocol::Sse => "sse",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "data-stream" | "datastream" | "data" => Some(StreamProtocol::DataStream),
            "sse" | "openai" => Some(StreamProtocol::Sse),
            _ => None,
        }
    }
}

type StreamSender = mpsc::UnboundedSender<(StreamMessage, u64)>;

fn send_error_and_end(tx: &StreamSender, stream_id: u64, message: String) {
    let _ = tx.send((StreamMessage::Error(message), stream_id));
    let _ = tx.send((StreamMessage::End, stream_id));
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn handle_sse_payload(payload: &str, tx: &StreamSender, stream_id: u64) -> bool {
    if payload == "[DONE]" {
        let _ = tx.send((StreamMessage::End, stream_id));
        return true;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => {
            if let Some(choice) = response.choices.first() {
                if let Some(content) = &choice.delta.content {
                    let _ = tx.send((StreamMessage::Chunk(content.clone()), stream_id));
                }
            }
            false
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return false;
            }
            send_error_and_end(tx, stream_id, summarize_api_error(payload));
            true
        }
    }
}

fn handle_data_stream_line(line: &str, tx: &StreamSender, stream_id: u64) -> bool {
    let Some((prefix, payload)) = line.split_once(':') else {
        return false;
    };

    match prefix {
        "0" => match serde_json::from_str::<String>(payload) {
            Ok(text) => {
                let _ = tx.send((StreamMessage::Chunk(text), stream_id));
                false
            }
            Err(e) => {
                send_error_and_end(tx, stream_id, format!("Malformed text part: {e}"));
                true
            }
        },
        "3" => {
            let message = serde_json::from_str::<String>(payload)
                .unwrap_or_else(|_| summarize_api_error(payload));
            send_error_and_end(tx, stream_id, message);
            true
        }
        "d" => {
            let _ = tx.send((StreamMessage::End, stream_id));
            true
        }
        other => {
            debug!(prefix = other, "ignoring stream part");
            false
        }
    }
}

/// Route one complete line to the protocol handler. Returns `true` once the
/// stream has ended (normally or with an error) and no further lines matter.
fn process_stream_line(
    line: &str,
    protocol: StreamProtocol,
    tx: &StreamSender,
    stream_id: u64,
) -> bool {
    if line.is_empty() {
        return false;
    }
    match protocol {
        StreamProtocol::Sse => extract_data_payload(line)
            .map(|payload| handle_sse_payload(payload, tx, stream_id))
            .unwrap_or(false),
        StreamProtocol::DataStream => handle_data_stream_line(line, tx, stream_id),
    }
}

/// Split every complete line out of `buffer` and process it.
fn drain_complete_lines(
    buffer: &mut Vec<u8>,
    protocol: StreamProtocol,
    tx: &StreamSender,
    stream_id: u64,
) -> bool {
    while let Some(newline_pos) = memchr(b'\n', buffer) {
        let should_end = match std::str::from_utf8(&buffer[..newline_pos]) {
            Ok(line) => process_stream_line(line.trim(), protocol, tx, stream_id),
            Err(e) => {
                warn!(stream_id, "invalid UTF-8 in stream: {e}");
                false
            }
        };
        buffer.drain(..=newline_pos);
        if should_end {
            return true;
        }
    }
    false
}

#[derive(Debug, Clone)]
pub struct StreamParams {
    pub client: reqwest::Client,
    pub url: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub protocol: StreamProtocol,
    pub api_messages: Vec<ChatMessage>,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: StreamSender,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                url,
                api_key,
                model,
                protocol,
                api_messages,
                cancel_token,
                stream_id,
            } = params;

            let request = ChatRequest {
                model,
                messages: api_messages,
                stream: true,
            };

            tokio::select! {
                _ = run_exchange(client, url, api_key, protocol, request, &tx, stream_id) => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "stream cancelled");
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_exchange(
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    protocol: StreamProtocol,
    request: ChatRequest,
    tx: &StreamSender,
    stream_id: u64,
) {
    debug!(stream_id, %url, protocol = protocol.as_str(), turns = request.messages.len(), "opening stream");

    let mut http_request = client
        .post(url.as_str())
        .header("Content-Type", "application/json");
    if let Some(key) = api_key.as_deref() {
        http_request = http_request.header("Authorization", format!("Bearer {key}"));
    }

    let response = match http_request.json(&request).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(stream_id, "stream request failed: {e}");
            send_error_and_end(tx, stream_id, format!("Request failed: {e}"));
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        warn!(stream_id, %status, "stream endpoint returned an error");
        send_error_and_end(
            tx,
            stream_id,
            format!("{status}: {}", summarize_api_error(&error_text)),
        );
        return;
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(chunk_bytes) => {
                buffer.extend_from_slice(&chunk_bytes);
                if drain_complete_lines(&mut buffer, protocol, tx, stream_id) {
                    return;
                }
            }
            Err(e) => {
                warn!(stream_id, "stream dropped: {e}");
                send_error_and_end(tx, stream_id, format!("Connection dropped: {e}"));
                return;
            }
        }
    }

    // Transport closed; a final line may lack its newline.
    if !buffer.is_empty() {
        buffer.push(b'\n');
        if drain_complete_lines(&mut buffer, protocol, tx, stream_id) {
            return;
        }
    }

    debug!(stream_id, "stream closed by transport");
    let _ = tx.send((StreamMessage::End, stream_id));
}

//! Shared builders for tests: a throwaway HTTP/1.1 server, a scripted media
//! gateway and an `App` wired to neither the network nor a terminal.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::core::app::{App, SessionContext};
use crate::core::chat_stream::StreamProtocol;
use crate::core::gateway::{GatewayError, MediaGateway};
use crate::core::media::{MediaKind, MediaPayload};

/// A response served verbatim to the next connection.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    status: u16,
    reason: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
    declared_length: Option<usize>,
}

impl CannedResponse {
    pub fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self::status(200, "OK", content_type, body)
    }

    pub fn status(
        status: u16,
        reason: &'static str,
        content_type: &'static str,
        body: Vec<u8>,
    ) -> Self {
        Self {
            status,
            reason,
            content_type,
            body,
            declared_length: None,
        }
    }

    /// Advertise a longer `Content-Length` than the body, so the client sees
    /// the connection drop mid-response.
    pub fn cut_short(mut self, declared_length: usize) -> Self {
        self.declared_length = Some(declared_length);
        self
    }

    fn head(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            self.reason,
            self.content_type,
            self.declared_length.unwrap_or(self.body.len())
        )
    }
}

/// What the server saw: the request line plus headers, and the body.
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn path(&self) -> &str {
        self.head.split_whitespace().nth(1).unwrap_or_default()
    }
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let end = loop {
        if let Some(end) = header_end(&buf) {
            break end;
        }
        let read = socket.read(&mut chunk).await.expect("read request");
        if read == 0 {
            return CapturedRequest {
                head: String::from_utf8_lossy(&buf).into_owned(),
                body: Vec::new(),
            };
        }
        buf.extend_from_slice(&chunk[..read]);
    };

    let head = String::from_utf8_lossy(&buf[..end]).into_owned();
    let body_start = end + 4;
    let wanted = body_start + content_length(&head);
    while buf.len() < wanted {
        let read = socket.read(&mut chunk).await.expect("read body");
        if read == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..read]);
    }

    let body = buf[body_start..wanted.min(buf.len())].to_vec();
    CapturedRequest { head, body }
}

async fn respond(socket: &mut TcpStream, response: &CannedResponse) {
    socket
        .write_all(response.head().as_bytes())
        .await
        .expect("write head");
    socket.write_all(&response.body).await.expect("write body");
    let _ = socket.shutdown().await;
}

/// Serve a single response on an ephemeral port. The handle resolves to the
/// captured request once the response has been written.
pub async fn serve_once(response: CannedResponse) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;
        respond(&mut socket, &response).await;
        request
    });

    (format!("http://{addr}"), handle)
}

/// Serve one response per route, matched by request path prefix, until every
/// route has been hit once. Unknown paths get a 404.
pub async fn serve_routes(
    routes: Vec<(&'static str, CannedResponse)>,
) -> (String, JoinHandle<Vec<CapturedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(async move {
        let mut pending = routes;
        let mut captured = Vec::new();
        while !pending.is_empty() {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;
            match pending
                .iter()
                .position(|(prefix, _)| request.path().starts_with(prefix))
            {
                Some(index) => {
                    let (_, response) = pending.remove(index);
                    respond(&mut socket, &response).await;
                }
                None => {
                    let missing = CannedResponse::status(404, "Not Found", "text/plain", b"no route".to_vec());
                    respond(&mut socket, &missing).await;
                }
            }
            captured.push(request);
        }
        captured
    });

    (format!("http://{addr}"), handle)
}

/// A gateway that replays scripted results and records what it was asked.
#[derive(Default)]
pub struct ScriptedGateway {
    images: Mutex<VecDeque<Result<MediaPayload, GatewayError>>>,
    audio: Mutex<VecDeque<Result<MediaPayload, GatewayError>>>,
    calls: Mutex<Vec<(MediaKind, String)>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_image(&self, result: Result<MediaPayload, GatewayError>) {
        self.images.lock().unwrap().push_back(result);
    }

    pub fn push_audio(&self, result: Result<MediaPayload, GatewayError>) {
        self.audio.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<(MediaKind, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, kind: MediaKind, text: &str) -> Result<MediaPayload, GatewayError> {
        self.calls.lock().unwrap().push((kind, text.to_string()));
        let queue = match kind {
            MediaKind::Image => &self.images,
            MediaKind::Audio => &self.audio,
        };
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Decode(format!("no scripted {}", kind.label()))))
    }
}

#[async_trait]
impl MediaGateway for ScriptedGateway {
    async fn generate_image(&self, text: &str) -> Result<MediaPayload, GatewayError> {
        self.next(MediaKind::Image, text)
    }

    async fn generate_audio(&self, text: &str) -> Result<MediaPayload, GatewayError> {
        self.next(MediaKind::Audio, text)
    }
}

pub fn gateway_error(status: u16) -> GatewayError {
    GatewayError::Endpoint {
        status: reqwest::StatusCode::from_u16(status).expect("valid status"),
        body: format!(r#"{{"error":"status {status}"}}"#),
    }
}

pub fn create_test_session() -> SessionContext {
    SessionContext {
        client: reqwest::Client::new(),
        chat_url: "http://127.0.0.1:9/api/chat".to_string(),
        image_url: "http://127.0.0.1:9/api/images".to_string(),
        audio_url: "http://127.0.0.1:9/api/audio".to_string(),
        api_key: None,
        model: None,
        protocol: StreamProtocol::DataStream,
        seed_prompt: "Give me a random recipe".to_string(),
        open_command: None,
    }
}

pub fn create_test_app() -> App {
    App::new(create_test_session())
}

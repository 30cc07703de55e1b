//! WebSocket endpoint for page-by-page streaming.
//!
//! Protocol: the client connects, sends one JSON request message (document
//! as base64, or a follow-up binary frame when `pdf_base64` is absent), then
//! receives one JSON event per state transition until a terminal `completed`
//! or `error` event, after which the server closes the connection.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use crate::models::ParseMethod;
use crate::server::AppState;
use crate::stream::{EventSink, SinkClosed, StreamEvent, StreamPublisher, StreamRequest};

/// First client message on the stream socket.
#[derive(Debug, Deserialize)]
struct WsJobRequest {
    #[serde(default)]
    pdf_base64: Option<String>,
    #[serde(default = "default_filename")]
    filename: String,
    #[serde(default = "default_lang")]
    lang: String,
    #[serde(default)]
    parse_method: Option<String>,
    #[serde(default)]
    include_discarded: bool,
    #[serde(default)]
    start_page_id: usize,
    #[serde(default)]
    end_page_id: Option<usize>,
}

fn default_filename() -> String {
    "document.pdf".to_string()
}

fn default_lang() -> String {
    "ch".to_string()
}

/// `GET /layout_ocr/stream` — upgrade and run one streaming job.
pub async fn layout_ocr_stream(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_stream(state, socket))
}

/// Event sink backed by the websocket; a send failure means the client went
/// away.
struct WsSink {
    socket: WebSocket,
}

#[async_trait]
impl EventSink for WsSink {
    async fn send(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        let text = serde_json::to_string(&event).map_err(|_| SinkClosed)?;
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|_| SinkClosed)
    }
}

async fn handle_stream(state: AppState, mut socket: WebSocket) {
    let request = match receive_request(&mut socket).await {
        Ok(Some(request)) => request,
        Ok(None) => return, // client hung up before sending a request
        Err(message) => {
            let event = StreamEvent::Error { message };
            if let Ok(text) = serde_json::to_string(&event) {
                let _ = socket.send(Message::Text(text)).await;
            }
            return;
        }
    };

    let mut sink = WsSink { socket };
    StreamPublisher::new(state.engine.as_ref(), &state.settings)
        .run(request, &mut sink)
        .await;
    // Dropping the socket closes the connection after the terminal event.
}

/// Outcome of decoding the first text frame: either everything needed to
/// start the job, or a request still waiting for its document bytes in a
/// follow-up binary frame.
#[derive(Debug)]
enum DecodedRequest {
    Complete(StreamRequest),
    AwaitingBinary(WsJobRequest),
}

/// Decode the first client message.
///
/// `Err` carries the message for the terminal `error` event.
fn decode_request(text: &str) -> Result<DecodedRequest, String> {
    let mut parsed: WsJobRequest =
        serde_json::from_str(text).map_err(|e| format!("invalid request: {e}"))?;

    match parsed.pdf_base64.take() {
        Some(encoded) => {
            let bytes = STANDARD
                .decode(&encoded)
                .map_err(|e| format!("invalid pdf_base64: {e}"))?;
            Ok(DecodedRequest::Complete(build_request(parsed, bytes)))
        }
        None => Ok(DecodedRequest::AwaitingBinary(parsed)),
    }
}

fn build_request(parsed: WsJobRequest, bytes: Vec<u8>) -> StreamRequest {
    StreamRequest {
        filename: parsed.filename,
        bytes,
        lang: parsed.lang,
        parse_method: parsed
            .parse_method
            .as_deref()
            .map(|m| m.parse().unwrap_or(ParseMethod::Auto))
            .unwrap_or_default(),
        include_discarded: parsed.include_discarded,
        start_page: parsed.start_page_id,
        end_page: parsed.end_page_id,
    }
}

/// Receive and decode the initial job request.
///
/// `Ok(None)` means the client disconnected before sending anything;
/// `Err` carries a message for the `error` event.
async fn receive_request(socket: &mut WebSocket) -> Result<Option<StreamRequest>, String> {
    let text = loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(_)) => {
                return Err("expected a JSON request as the first message".to_string())
            }
            Some(Err(_)) => return Ok(None),
        }
    };

    match decode_request(&text)? {
        DecodedRequest::Complete(request) => Ok(Some(request)),
        // Alternative upload path: one binary frame follows the request.
        DecodedRequest::AwaitingBinary(parsed) => loop {
            match socket.recv().await {
                Some(Ok(Message::Binary(bytes))) => {
                    break Ok(Some(build_request(parsed, bytes)));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => break Ok(None),
                Some(Ok(_)) => {
                    break Err("expected a binary frame with document content".to_string());
                }
                Some(Err(_)) => break Ok(None),
            }
        },
    }
}

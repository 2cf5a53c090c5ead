//! WebSocket adapters for the scan session's client channel.

use crate::error::{SessionError, SessionResult};
use crate::scanner::{ClientEvents, ClientMessage, ClientSink};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

/// Split an upgraded socket into the session's sink and event halves.
pub fn split(socket: WebSocket) -> (WsSink, WsEvents) {
    let (sender, receiver) = socket.split();
    (WsSink { inner: sender }, WsEvents { inner: receiver })
}

/// Outgoing half: targets and errors as JSON text frames, scanner output as
/// text when it is valid UTF-8 and binary otherwise.
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

/// Frame for one client message.
pub fn to_frame(message: ClientMessage) -> SessionResult<Message> {
    if let Some(json) = message.to_json()? {
        return Ok(Message::Text(json));
    }
    match message {
        ClientMessage::Output(bytes) => Ok(match String::from_utf8(bytes) {
            Ok(text) => Message::Text(text),
            Err(e) => Message::Binary(e.into_bytes()),
        }),
        // Structured messages were handled above.
        ClientMessage::Target(_) | ClientMessage::Error(_) => Err(SessionError::ClientWrite(
            "message has no frame encoding".to_string(),
        )),
    }
}

#[async_trait]
impl ClientSink for WsSink {
    async fn send(&mut self, message: ClientMessage) -> SessionResult<()> {
        let frame = to_frame(message)?;
        self.inner
            .send(frame)
            .await
            .map_err(|e| SessionError::ClientWrite(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.inner.close().await {
            tracing::debug!(error = %e, "websocket already closed");
        }
    }
}

/// Incoming half. Client messages are ignored; only closure matters.
pub struct WsEvents {
    inner: SplitStream<WebSocket>,
}

#[async_trait]
impl ClientEvents for WsEvents {
    async fn closed(&mut self) {
        while let Some(frame) = self.inner.next().await {
            match frame {
                Ok(Message::Close(close)) => {
                    match close {
                        Some(close) => tracing::info!(
                            code = close.code,
                            reason = %close.reason,
                            "client closed connection"
                        ),
                        None => tracing::info!("client closed connection"),
                    }
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "websocket read failed");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TargetRecord;

    #[test]
    fn test_target_frame_is_json_text() {
        let frame = to_frame(ClientMessage::Target(TargetRecord::ip("10.0.0.1"))).unwrap();
        assert_eq!(
            frame,
            Message::Text(r#"{"type":"IP address","value":"10.0.0.1"}"#.to_string())
        );
    }

    #[test]
    fn test_utf8_output_is_text() {
        let frame = to_frame(ClientMessage::Output(b"PORT   STATE\n".to_vec())).unwrap();
        assert_eq!(frame, Message::Text("PORT   STATE\n".to_string()));
    }

    #[test]
    fn test_invalid_utf8_output_is_binary() {
        let bytes = vec![0x66, 0xff, 0xfe];
        let frame = to_frame(ClientMessage::Output(bytes.clone())).unwrap();
        assert_eq!(frame, Message::Binary(bytes));
    }

    #[test]
    fn test_error_frame() {
        let frame = to_frame(ClientMessage::Error("no scanner".to_string())).unwrap();
        match frame {
            Message::Text(text) => assert!(text.contains(r#""type":"error""#)),
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

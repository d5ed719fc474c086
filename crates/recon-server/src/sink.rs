//! WebSocket Event Sink

use async_trait::async_trait;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use tokio::sync::Mutex;

use recon_core::{AgentEvent, EventSink};

use crate::frame::{Frame, frames_for};

/// Forwards controller events to one WebSocket as JSON frames.
///
/// A send failure (client gone) is logged; the session keeps running to
/// completion so its derived files are still released.
pub struct WsEventSink<S> {
    sender: Mutex<S>,
}

impl<S> WsEventSink<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: std::fmt::Display,
{
    pub fn new(sender: S) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }

    /// Send one frame; returns false once the peer is unreachable
    pub async fn send(&self, frame: &Frame) -> bool {
        let mut sender = self.sender.lock().await;
        match sender.send(Message::Text(frame.to_json().into())).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("websocket send failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl<S> EventSink for WsEventSink<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: std::fmt::Display,
{
    async fn emit(&self, event: AgentEvent) {
        for frame in frames_for(&event) {
            if !self.send(&frame).await {
                break;
            }
        }
    }
}

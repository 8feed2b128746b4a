//! Local WebSocket feed for the overlay.
//!
//! The monitor pushes `FeedPacket`s out; overlay clients push `ClientCommand`s
//! back. Each connection gets its own task and talks to the monitor loop only
//! through channels.

use crate::banner::{is_domain_excluded, is_unsuitable_path, Anchor, BannerPreferences};
use crate::dashboard::Dashboard;
use crate::models::FilterSelection;
use crate::ticker::TickerSnapshot;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::Message;

/// Outbound frame, tagged by `msg_type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "msg_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedPacket {
    Ticker(TickerSnapshot),
    Dashboard(Dashboard),
    Preferences(BannerPreferences),
    Alert { rule_id: String, text: String },
}

/// Inbound request from an overlay, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// First message from an overlay; lets the server turn away pages on the denylist.
    Hello {
        hostname: String,
        #[serde(default)]
        path: String,
        /// When present, the reply carries preferences fitted to this viewport.
        #[serde(default)]
        viewport: Option<Viewport>,
    },
    ToggleView,
    SetFilters { filters: FilterSelection },
    ToggleMinimized,
    Move { anchor: Anchor, viewport_height: f64 },
    Resize { width: f64, viewport_width: f64 },
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

pub fn parse_command(text: &str) -> Option<ClientCommand> {
    match serde_json::from_str(text) {
        Ok(cmd) => Some(cmd),
        Err(e) => {
            debug!("Ignoring unrecognized client message: {}", e);
            None
        }
    }
}

/// Whether an overlay on `hostname`/`path` should be served at all.
pub fn should_serve(hostname: &str, path: &str, excluded: &[String]) -> bool {
    !is_domain_excluded(hostname, excluded) && !is_unsuitable_path(path)
}

pub struct TelemetryServer {
    tx: broadcast::Sender<String>,
    enabled: bool,
}

impl TelemetryServer {
    /// Creates the feed and, when enabled, starts listening on 127.0.0.1.
    pub fn new(
        enabled: bool,
        port: u16,
        excluded_domains: Vec<String>,
        commands: mpsc::Sender<ClientCommand>,
    ) -> Self {
        // Ring of 256 frames; slow clients skip ahead instead of blocking the sender.
        let (tx, _rx) = broadcast::channel(256);

        if enabled {
            let tx_clone = tx.clone();
            let excluded = Arc::new(excluded_domains);

            tokio::spawn(async move {
                let addr = format!("127.0.0.1:{}", port);
                match TcpListener::bind(&addr).await {
                    Ok(listener) => {
                        info!("📡 [Feed] Overlay feed running on ws://{}", addr);

                        while let Ok((stream, peer)) = listener.accept().await {
                            debug!("[Feed] Connection from {}", peer);
                            let tx_inner = tx_clone.clone();
                            let commands = commands.clone();
                            let excluded = Arc::clone(&excluded);
                            tokio::spawn(async move {
                                handle_connection(stream, tx_inner, commands, excluded).await;
                            });
                        }
                    }
                    Err(e) => {
                        error!("❌ [Feed] Failed to bind port {}: {}", port, e);
                    }
                }
            });
        } else {
            info!("📡 [Feed] Disabled by config.");
        }

        Self { tx, enabled }
    }

    /// Broadcasts a packet to every connected overlay.
    pub fn send(&self, packet: &FeedPacket) {
        if !self.enabled {
            return;
        }

        // Serialize only when someone is listening.
        if self.tx.receiver_count() > 0 {
            match serde_json::to_string(packet) {
                Ok(msg) => {
                    let _ = self.tx.send(msg);
                }
                Err(e) => warn!("[Feed] Failed to serialize packet: {}", e),
            }
        }
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    tx: broadcast::Sender<String>,
    commands: mpsc::Sender<ClientCommand>,
    excluded: Arc<Vec<String>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut rx = tx.subscribe();

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Ok(msg) => {
                    if ws_sender.send(Message::Text(msg.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("[Feed] Client lagging, skipped {} frames", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            inbound = ws_receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let Some(command) = parse_command(text.as_str()) else {
                        continue;
                    };
                    if let ClientCommand::Hello { hostname, path, .. } = &command {
                        if !should_serve(hostname, path, &excluded) {
                            info!("[Feed] {}{} is excluded, closing overlay connection.", hostname, path);
                            let _ = ws_sender.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    if commands.send(command).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    if ws_sender.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("[Feed] Connection error: {}", e);
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Region, ViewMode};
    use crate::state::Dataset;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn commands_parse_from_json() {
        assert_eq!(parse_command(r#"{"type": "toggle_view"}"#), Some(ClientCommand::ToggleView));
        assert_eq!(
            parse_command(r#"{"type": "resize", "width": 600, "viewport_width": 1280}"#),
            Some(ClientCommand::Resize { width: 600.0, viewport_width: 1280.0 })
        );
        assert_eq!(
            parse_command(r#"{"type": "move", "anchor": {"bottom": 30}, "viewport_height": 800}"#),
            Some(ClientCommand::Move { anchor: Anchor::Bottom(30.0), viewport_height: 800.0 })
        );
        assert_eq!(
            parse_command(r#"{"type": "set_filters", "filters": {"regions": ["RIPE"], "block_sizes": [24]}}"#),
            Some(ClientCommand::SetFilters {
                filters: FilterSelection { block_sizes: vec![24], regions: vec![Region::Ripe], ..Default::default() }
            })
        );
        assert_eq!(
            parse_command(r#"{"type": "hello", "hostname": "example.com"}"#),
            Some(ClientCommand::Hello { hostname: "example.com".to_string(), path: String::new(), viewport: None })
        );
        assert_eq!(
            parse_command(r#"{"type": "hello", "hostname": "a.test", "path": "/x", "viewport": {"width": 1280, "height": 800}}"#),
            Some(ClientCommand::Hello {
                hostname: "a.test".to_string(),
                path: "/x".to_string(),
                viewport: Some(Viewport { width: 1280.0, height: 800.0 }),
            })
        );
        assert_eq!(parse_command("not json"), None);
        assert_eq!(parse_command(r#"{"type": "launch_rockets"}"#), None);
    }

    #[test]
    fn hello_screening() {
        let excluded = vec!["bank.example".to_string()];
        assert!(should_serve("news.example", "/today", &excluded));
        assert!(!should_serve("login.bank.example", "/", &excluded));
        assert!(!should_serve("news.example", "/favicon.ico", &excluded));
    }

    #[test]
    fn packets_are_tagged() {
        let ticker = TickerSnapshot::build(ViewMode::PriorSales, &Dataset::default());
        let value = serde_json::to_value(FeedPacket::Ticker(ticker)).unwrap();
        assert_eq!(value["msg_type"], json!("TICKER"));
        assert_eq!(value["title"], json!("Prior Sales:"));

        let alert = FeedPacket::Alert { rule_id: "r1".to_string(), text: "hi".to_string() };
        assert_eq!(serde_json::to_value(alert).unwrap(), json!({"msg_type": "ALERT", "rule_id": "r1", "text": "hi"}));
    }

    #[tokio::test]
    async fn disabled_server_drops_packets() {
        let (cmd_tx, _cmd_rx) = mpsc::channel(4);
        let server = TelemetryServer::new(false, 0, vec![], cmd_tx);
        server.send(&FeedPacket::Alert { rule_id: "r".to_string(), text: "t".to_string() });
        assert_eq!(server.client_count(), 0);
    }
}

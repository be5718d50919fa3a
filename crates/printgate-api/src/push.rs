//! Push channel with auto-reconnect.
//!
//! The device-control service streams progress over Socket.IO (protocol
//! v4) on a WebSocket transport. This module speaks just enough of that
//! framing to receive named events: it answers the namespace handshake
//! and heartbeats, decodes `42["name", {...}]` packets into typed
//! [`PushEvent`]s, and republishes them together with connection
//! lifecycle notices through a [`tokio::sync::broadcast`] channel.
//! Reconnection uses exponential backoff with jitter and a bounded
//! number of consecutive failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use printgate_api::push::{PushHandle, PushMessage, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let base = Url::parse("http://localhost:3000")?;
//! let handle = PushHandle::spawn(&base, ReconnectConfig::default(), CancellationToken::new())?;
//! let mut rx = handle.subscribe();
//!
//! while let Ok(msg) = rx.recv().await {
//!     if let PushMessage::Event(event) = msg {
//!         println!("{}", event.name());
//!     }
//! }
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::{
    CaptureResult, EnrollmentStep, IdentificationResult, IdentificationStep, LivePreview,
};

// ── Broadcast channel capacity ───────────────────────────────────────

const PUSH_CHANNEL_CAPACITY: usize = 1024;

// ── Messages ─────────────────────────────────────────────────────────

/// A typed push notification from the device-control service.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    LivePreview(LivePreview),
    EnrollmentStep(EnrollmentStep),
    CaptureResult(CaptureResult),
    IdentificationStep(IdentificationStep),
    IdentificationResult(IdentificationResult),
}

impl PushEvent {
    /// Decode a named Socket.IO event.
    ///
    /// Returns `Ok(None)` for event names this client does not handle.
    pub fn from_named(name: &str, payload: serde_json::Value) -> Result<Option<Self>, Error> {
        let event = match name {
            "live_preview" => Self::LivePreview(decode(name, payload)?),
            "enrollment_step" => Self::EnrollmentStep(decode(name, payload)?),
            "capture_result" => Self::CaptureResult(decode(name, payload)?),
            "identification_step" => Self::IdentificationStep(decode(name, payload)?),
            "identification_result" => Self::IdentificationResult(decode(name, payload)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LivePreview(_) => "live_preview",
            Self::EnrollmentStep(_) => "enrollment_step",
            Self::CaptureResult(_) => "capture_result",
            Self::IdentificationStep(_) => "identification_step",
            Self::IdentificationResult(_) => "identification_result",
        }
    }
}

fn decode<T: DeserializeOwned>(name: &str, payload: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(payload.clone()).map_err(|e| Error::Deserialization {
        message: format!("{name}: {e}"),
        body: payload.to_string(),
    })
}

/// Push connection lifecycle. Never fatal -- surfaced as status only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    Error(String),
    /// The reconnection budget is spent; the channel has stopped.
    GaveUp { attempts: u32 },
}

/// Everything the push channel publishes, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    Event(PushEvent),
    Connection(ConnectionEvent),
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for push reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Consecutive failed attempts before giving up. Default: 5.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: Some(5),
        }
    }
}

// ── PushHandle ───────────────────────────────────────────────────────

/// Handle to a running push channel.
///
/// Dropping the handle (or calling [`shutdown`](Self::shutdown)) cancels
/// the background task and closes the connection.
pub struct PushHandle {
    tx: broadcast::Sender<PushMessage>,
    cancel: CancellationToken,
}

impl PushHandle {
    /// Spawn the connection loop against the service at `base_url`.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Must be called from within a Tokio runtime.
    pub fn spawn(
        base_url: &Url,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        let ws_url = socket_io_url(base_url)?;
        let (tx, _) = broadcast::channel(PUSH_CHANNEL_CAPACITY);

        let task_tx = tx.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            push_loop(ws_url, task_tx, reconnect, task_cancel).await;
        });

        Ok(Self { tx, cancel })
    }

    /// Get a new receiver for the message stream.
    ///
    /// Only messages published after this call are delivered. A consumer
    /// that falls behind receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<PushMessage> {
        self.tx.subscribe()
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PushHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Derive the Socket.IO WebSocket endpoint from the service base URL.
///
/// `http://host:3000` becomes `ws://host:3000/socket.io/?EIO=4&transport=websocket`.
pub fn socket_io_url(base_url: &Url) -> Result<Url, Error> {
    let scheme = match base_url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::WebSocketConnect(format!(
                "unsupported push URL scheme '{other}'"
            )));
        }
    };
    let host = base_url
        .host_str()
        .ok_or_else(|| Error::WebSocketConnect(format!("push URL has no host: {base_url}")))?;
    let prefix = base_url.path().trim_end_matches('/');
    let full = match base_url.port() {
        Some(port) => {
            format!("{scheme}://{host}:{port}{prefix}/socket.io/?EIO=4&transport=websocket")
        }
        None => format!("{scheme}://{host}{prefix}/socket.io/?EIO=4&transport=websocket"),
    };
    Ok(Url::parse(&full)?)
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read → on error, backoff → reconnect.
async fn push_loop(
    ws_url: Url,
    tx: broadcast::Sender<PushMessage>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &tx, &cancel) => {
                match result {
                    // Session was established and later ended cleanly.
                    // Reset the failure counter but still wait the initial
                    // delay, so a server that closes right after the
                    // handshake cannot spin this loop.
                    Ok(()) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        attempt = 0;
                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "push channel disconnected cleanly, reconnecting"
                        );
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "push channel error");
                        publish(&tx, PushMessage::Connection(ConnectionEvent::Error(e.to_string())));

                        if let Some(max) = reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "push reconnection limit reached, giving up"
                                );
                                publish(
                                    &tx,
                                    PushMessage::Connection(ConnectionEvent::GaveUp {
                                        attempts: max,
                                    }),
                                );
                                break;
                            }
                        }

                        let delay = calculate_backoff(attempt, &reconnect);
                        tracing::info!(
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            () = tokio::time::sleep(delay) => {}
                        }

                        attempt += 1;
                    }
                }
            }
        }
    }

    tracing::debug!("push loop exiting");
}

fn publish(tx: &broadcast::Sender<PushMessage>, msg: PushMessage) {
    // Send errors just mean nobody is subscribed right now.
    let _ = tx.send(msg);
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one WebSocket connection and read frames until it drops.
///
/// Returns `Ok(())` only if the Socket.IO session was established; a
/// connection that closes before the namespace handshake is an error so
/// the caller backs off instead of spinning.
async fn connect_and_read(
    url: &Url,
    tx: &broadcast::Sender<PushMessage>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to push channel");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();
    let mut connected = false;

    let outcome = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        match parse_frame(&text) {
                            Frame::Open => {
                                if let Err(e) = write.send(tungstenite::Message::Text("40".into())).await {
                                    break Err(Error::WebSocketConnect(e.to_string()));
                                }
                            }
                            Frame::Ping => {
                                if let Err(e) = write.send(tungstenite::Message::Text("3".into())).await {
                                    break Err(Error::WebSocketConnect(e.to_string()));
                                }
                            }
                            Frame::Connected => {
                                tracing::info!("push channel connected");
                                connected = true;
                                publish(tx, PushMessage::Connection(ConnectionEvent::Connected));
                            }
                            Frame::ConnectError(reason) => {
                                break Err(Error::Protocol(format!("namespace refused: {reason}")));
                            }
                            Frame::Close => {
                                tracing::info!("push service closed the session");
                                break Ok(());
                            }
                            Frame::Event(event) => {
                                tracing::trace!(event = event.name(), "push event");
                                publish(tx, PushMessage::Event(event));
                            }
                            Frame::Ignored => {}
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "WebSocket close frame received"
                            );
                        } else {
                            tracing::info!("WebSocket close frame received (no payload)");
                        }
                        break Ok(());
                    }
                    Some(Err(e)) => break Err(Error::WebSocketConnect(e.to_string())),
                    None => {
                        tracing::info!("WebSocket stream ended");
                        break Ok(());
                    }
                    // Binary, Ping, Pong, Frame -- tungstenite answers pings itself
                    Some(Ok(_)) => {}
                }
            }
        }
    };

    if connected {
        publish(tx, PushMessage::Connection(ConnectionEvent::Disconnected));
    }

    match outcome {
        Ok(()) if !connected && !cancel.is_cancelled() => Err(Error::Protocol(
            "connection closed before the Socket.IO handshake completed".into(),
        )),
        other => other,
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// What a single text frame means to this client.
#[derive(Debug, PartialEq)]
enum Frame {
    /// Engine.IO open -- answer with a namespace connect.
    Open,
    /// Engine.IO heartbeat -- answer with a pong.
    Ping,
    /// Engine.IO close or Socket.IO disconnect.
    Close,
    /// Socket.IO namespace connect acknowledged.
    Connected,
    /// Socket.IO namespace connect refused.
    ConnectError(String),
    Event(PushEvent),
    Ignored,
}

/// Decode one Engine.IO text frame.
///
/// Malformed frames and unknown events are logged and ignored; the
/// channel never tears down over a bad payload.
fn parse_frame(text: &str) -> Frame {
    let mut chars = text.chars();
    match chars.next() {
        Some('0') => Frame::Open,
        Some('1') => Frame::Close,
        Some('2') => Frame::Ping,
        Some('4') => parse_socket_packet(chars.as_str()),
        _ => Frame::Ignored,
    }
}

/// Decode the Socket.IO packet carried inside an Engine.IO message.
fn parse_socket_packet(packet: &str) -> Frame {
    let mut chars = packet.chars();
    let kind = chars.next();
    let body = strip_namespace(chars.as_str());

    match kind {
        Some('0') => Frame::Connected,
        Some('1') => Frame::Close,
        Some('4') => Frame::ConnectError(body.to_owned()),
        Some('2') => {
            // Optional ack id precedes the JSON array.
            let json = body.trim_start_matches(|c: char| c.is_ascii_digit());
            parse_event(json)
        }
        _ => Frame::Ignored,
    }
}

/// Drop a leading `/namespace,` if present.
fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

fn parse_event(json: &str) -> Frame {
    let parts: Vec<serde_json::Value> = match serde_json::from_str(json) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse push event array");
            return Frame::Ignored;
        }
    };

    let mut parts = parts.into_iter();
    let Some(name) = parts.next().and_then(|v| v.as_str().map(String::from)) else {
        tracing::debug!("push event without a name");
        return Frame::Ignored;
    };
    let payload = parts.next().unwrap_or(serde_json::Value::Null);

    match PushEvent::from_named(&name, payload) {
        Ok(Some(event)) => Frame::Event(event),
        Ok(None) => {
            tracing::debug!(event = %name, "ignoring unknown push event");
            Frame::Ignored
        }
        Err(e) => {
            tracing::debug!(error = %e, "could not decode push payload");
            Frame::Ignored
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.max_retries, Some(5));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(
            d10 <= Duration::from_secs(13),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn socket_io_url_from_http_base() {
        let base = Url::parse("http://localhost:3000").unwrap();
        assert_eq!(
            socket_io_url(&base).unwrap().as_str(),
            "ws://localhost:3000/socket.io/?EIO=4&transport=websocket"
        );

        let secure = Url::parse("https://scanner.lab/agent/").unwrap();
        assert_eq!(
            socket_io_url(&secure).unwrap().as_str(),
            "wss://scanner.lab/agent/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn socket_io_url_rejects_other_schemes() {
        let base = Url::parse("ftp://localhost").unwrap();
        assert!(matches!(socket_io_url(&base), Err(Error::WebSocketConnect(_))));
    }

    #[test]
    fn engine_io_control_frames() {
        assert_eq!(
            parse_frame(r#"0{"sid":"abc","pingInterval":25000,"pingTimeout":20000}"#),
            Frame::Open
        );
        assert_eq!(parse_frame("2"), Frame::Ping);
        assert_eq!(parse_frame("1"), Frame::Close);
        assert_eq!(parse_frame("3"), Frame::Ignored);
        assert_eq!(parse_frame(""), Frame::Ignored);
    }

    #[test]
    fn socket_io_connect_and_disconnect() {
        assert_eq!(parse_frame(r#"40{"sid":"xyz"}"#), Frame::Connected);
        assert_eq!(parse_frame("41"), Frame::Close);
        assert_eq!(
            parse_frame(r#"44{"message":"unauthorized"}"#),
            Frame::ConnectError(r#"{"message":"unauthorized"}"#.into())
        );
    }

    #[test]
    fn decodes_enrollment_step() {
        let frame =
            parse_frame(r#"42["enrollment_step",{"step":"capture_left","message":"Place left hand"}]"#);
        assert_eq!(
            frame,
            Frame::Event(PushEvent::EnrollmentStep(EnrollmentStep {
                step: "capture_left".into(),
                message: "Place left hand".into(),
            }))
        );
    }

    #[test]
    fn decodes_capture_result_with_namespace_and_ack_id() {
        let frame = parse_frame(
            r#"42/agent,17["capture_result",{"success":true,"message":"ok","template_no":1}]"#,
        );
        assert_eq!(
            frame,
            Frame::Event(PushEvent::CaptureResult(CaptureResult {
                success: true,
                message: Some("ok".into()),
                template_no: Some(1),
            }))
        );
    }

    #[test]
    fn decodes_identification_result() {
        let frame = parse_frame(
            r#"42["identification_result",{"success":true,"found":true,"name":"Alice","id_number":"123","score":87}]"#,
        );
        let Frame::Event(PushEvent::IdentificationResult(result)) = frame else {
            panic!("expected identification_result, got {frame:?}");
        };
        assert!(result.found);
        assert_eq!(result.name.as_deref(), Some("Alice"));
        assert_eq!(result.score, Some(87.0));
    }

    #[test]
    fn unknown_events_and_bad_payloads_are_ignored() {
        assert_eq!(parse_frame(r#"42["battery_low",{"level":3}]"#), Frame::Ignored);
        assert_eq!(parse_frame(r#"42["live_preview",{"wrong":1}]"#), Frame::Ignored);
        assert_eq!(parse_frame("42not json at all"), Frame::Ignored);
        assert_eq!(parse_frame("42[]"), Frame::Ignored);
    }

    #[test]
    fn event_names_round_trip() {
        let event = PushEvent::IdentificationStep(IdentificationStep {
            message: "Scanning".into(),
        });
        assert_eq!(event.name(), "identification_step");
        let decoded = PushEvent::from_named(
            event.name(),
            serde_json::json!({ "message": "Scanning" }),
        )
        .unwrap();
        assert_eq!(decoded, Some(event));
    }
}

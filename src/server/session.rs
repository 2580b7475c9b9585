//! WebSocket session
//!
//! One session per connected phone. The lifecycle is:
//!
//! ```text
//! upgrade ─> first frame ─┬─ text + `auth` + matching key ─> authenticated
//!                         └─ anything else ────────────────> Close, Rejected
//!
//! authenticated:
//!   reader loop ── text frame ─> envelope ─> (skip auth) ─> decode ─> controller
//!        │
//!        └─ every frame re-arms ─> liveness task ── 25s idle ─> {"type":"keep_alive"}
//! ```
//!
//! Decode and dispatch failures are logged and the frame is dropped; only
//! transport errors and peer close end an authenticated session.
//!
//! [`run_session`] is generic over the frame stream and sink so tests can
//! drive it with in-memory channels instead of sockets.

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::controller::{ControllerError, PacketController};
use crate::protocol::{CodecError, Packet, PacketCodec, PacketType};
use crate::security::AuthKey;

/// Shared inputs every session needs
pub struct SessionContext {
    /// Controller all sessions dispatch into
    pub controller: Arc<PacketController>,
    /// Key the first frame must present
    pub auth_key: AuthKey,
    /// Frame codec
    pub codec: Arc<dyn PacketCodec>,
    /// Idle time before a keep-alive is sent
    pub keep_alive: Duration,
}

/// Why the handshake failed
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Peer went away before sending anything
    Disconnected,
    /// First frame was not a text frame
    NotText,
    /// First frame could not be decoded
    Codec(CodecError),
    /// First frame decoded to another packet type
    NotAuth(PacketType),
    /// Key did not match
    BadKey,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Disconnected => write!(f, "disconnected before auth"),
            RejectReason::NotText => write!(f, "first frame is not text"),
            RejectReason::Codec(e) => write!(f, "first frame invalid: {}", e),
            RejectReason::NotAuth(ty) => write!(f, "first packet is {}, expected auth", ty),
            RejectReason::BadKey => write!(f, "invalid auth key"),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Handshake failed; the connection was closed
    Rejected(RejectReason),
    /// Peer closed after authenticating
    Closed,
    /// Reading from the socket failed
    TransportError(String),
}

/// Drive one connection to completion
pub async fn run_session<St, Si, E>(mut stream: St, mut sink: Si, ctx: &SessionContext) -> SessionOutcome
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    Si: Sink<Message> + Unpin + Send + 'static,
    Si::Error: Display,
    E: Display,
{
    match authenticate(&mut stream, ctx).await {
        Ok(()) => info!("Client authenticated"),
        Err(AuthFailure::Transport(e)) => {
            warn!("Connection error before auth: {}", e);
            return SessionOutcome::TransportError(e);
        }
        Err(AuthFailure::Rejected(reason)) => {
            warn!("Authentication failed: {}", reason);
            // Best effort, the peer may already be gone
            if let Err(e) = sink.send(Message::Close(None)).await {
                debug!("Failed to send close frame: {}", e);
            }
            return SessionOutcome::Rejected(reason);
        }
    }

    let (activity_tx, activity_rx) = mpsc::channel(1);
    let liveness = match keep_alive_frame(ctx.codec.as_ref()) {
        Ok(frame) => Some(tokio::spawn(keep_alive_loop(
            sink,
            activity_rx,
            ctx.keep_alive,
            frame,
        ))),
        Err(e) => {
            warn!("Keep-alive disabled, cannot encode frame: {}", e);
            None
        }
    };

    let outcome = read_loop(&mut stream, ctx, &activity_tx).await;

    drop(activity_tx);
    if let Some(handle) = liveness {
        handle.abort();
        let _ = handle.await;
    }

    outcome
}

enum AuthFailure {
    Rejected(RejectReason),
    Transport(String),
}

async fn authenticate<St, E>(stream: &mut St, ctx: &SessionContext) -> Result<(), AuthFailure>
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let text = match stream.next().await {
        None => return Err(AuthFailure::Rejected(RejectReason::Disconnected)),
        Some(Err(e)) => return Err(AuthFailure::Transport(e.to_string())),
        Some(Ok(Message::Text(text))) => text,
        Some(Ok(_)) => return Err(AuthFailure::Rejected(RejectReason::NotText)),
    };
    let data = text.as_str().as_bytes();

    let packet_type = ctx
        .codec
        .envelope_type(data)
        .map_err(|e| AuthFailure::Rejected(RejectReason::Codec(e)))?;
    if packet_type != PacketType::Auth {
        return Err(AuthFailure::Rejected(RejectReason::NotAuth(packet_type)));
    }

    match ctx.codec.decode(data, packet_type) {
        Ok(Packet::Auth { key }) if ctx.auth_key.verify(&key) => Ok(()),
        Ok(_) => Err(AuthFailure::Rejected(RejectReason::BadKey)),
        Err(e) => Err(AuthFailure::Rejected(RejectReason::Codec(e))),
    }
}

async fn read_loop<St, E>(
    stream: &mut St,
    ctx: &SessionContext,
    activity: &mpsc::Sender<()>,
) -> SessionOutcome
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    loop {
        let message = match stream.next().await {
            None => return SessionOutcome::Closed,
            Some(Err(e)) => {
                warn!("Read error: {}", e);
                return SessionOutcome::TransportError(e.to_string());
            }
            Some(Ok(message)) => message,
        };

        // Full means a re-arm is already pending
        let _ = activity.try_send(());

        match message {
            Message::Text(text) => handle_frame(text.as_str().as_bytes(), ctx),
            Message::Binary(data) => debug!("Ignoring binary frame ({} bytes)", data.len()),
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(frame) => {
                debug!("Peer closed: {:?}", frame);
                return SessionOutcome::Closed;
            }
        }
    }
}

fn handle_frame(data: &[u8], ctx: &SessionContext) {
    let packet_type = match ctx.codec.envelope_type(data) {
        Ok(ty) => ty,
        Err(e) => {
            warn!("Dropping frame: {}", e);
            return;
        }
    };

    if packet_type == PacketType::Auth {
        debug!("Ignoring repeated auth packet");
        return;
    }

    let packet = match ctx.codec.decode(data, packet_type) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("Dropping {} frame: {}", packet_type, e);
            return;
        }
    };

    trace!("Packet: {:?}", packet);
    match ctx.controller.dispatch(&packet) {
        Ok(()) => {}
        Err(ControllerError::Closed) => debug!("Controller closed, dropping {}", packet_type),
        Err(e) => warn!("Failed to process {}: {}", packet_type, e),
    }
}

fn keep_alive_frame(codec: &dyn PacketCodec) -> Result<Message, CodecError> {
    let bytes = codec.encode(&Packet::KeepAlive)?;
    let text = String::from_utf8(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;
    Ok(Message::Text(text.into()))
}

async fn keep_alive_loop<Si>(
    mut sink: Si,
    mut activity: mpsc::Receiver<()>,
    interval: Duration,
    frame: Message,
) where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    loop {
        tokio::select! {
            signal = activity.recv() => {
                if signal.is_none() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {
                trace!("Sending keep-alive");
                if let Err(e) = sink.send(frame.clone()).await {
                    debug!("Keep-alive send failed: {}", e);
                    break;
                }
            }
        }
    }
}

//! Session auth gate and keep-alive over in-memory channels

mod common;

use axum::extract::ws::Message;
use futures::channel::mpsc;
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use common::{PointerCall, RecordingPointer};
use quick_mouse::controller::{PacketController, PhysicsConfig};
use quick_mouse::protocol::JsonCodec;
use quick_mouse::security::AuthKey;
use quick_mouse::server::{run_session, RejectReason, SessionContext, SessionOutcome};

const KEEP_ALIVE: Duration = Duration::from_secs(25);

fn context(pointer: Arc<RecordingPointer>, key: &AuthKey) -> Arc<SessionContext> {
    Arc::new(SessionContext {
        controller: PacketController::manual(pointer, PhysicsConfig::default()),
        auth_key: key.clone(),
        codec: Arc::new(JsonCodec),
        keep_alive: KEEP_ALIVE,
    })
}

fn text(s: impl Into<String>) -> Result<Message, Infallible> {
    Ok(Message::Text(s.into().into()))
}

fn auth(key: &str) -> String {
    format!(r#"{{"type":"auth","key":"{}"}}"#, key)
}

#[tokio::test]
async fn test_non_auth_first_frame_is_rejected() {
    let pointer = RecordingPointer::new();
    let key = AuthKey::generate();
    let ctx = context(pointer.clone(), &key);
    let (out_tx, mut out_rx) = mpsc::unbounded();

    let frames = futures::stream::iter(vec![
        text(r#"{"type":"left_click_down"}"#),
        text(auth(key.as_str())),
    ]);
    let outcome = run_session(frames, out_tx, &ctx).await;

    assert!(matches!(
        outcome,
        SessionOutcome::Rejected(RejectReason::NotAuth(_))
    ));
    assert_eq!(out_rx.next().await, Some(Message::Close(None)));
    assert!(pointer.calls().is_empty());
}

#[tokio::test]
async fn test_wrong_key_is_rejected() {
    let pointer = RecordingPointer::new();
    let key = AuthKey::generate();
    let ctx = context(pointer.clone(), &key);
    let (out_tx, _out_rx) = mpsc::unbounded();

    let frames = futures::stream::iter(vec![
        text(auth("00000000000000000000000000000000")),
        text(r#"{"type":"left_click_down"}"#),
    ]);
    let outcome = run_session(frames, out_tx, &ctx).await;

    assert_eq!(outcome, SessionOutcome::Rejected(RejectReason::BadKey));
    assert!(pointer.calls().is_empty());
}

#[tokio::test]
async fn test_correct_key_opens_session() {
    let pointer = RecordingPointer::new();
    let key = AuthKey::generate();
    let ctx = context(pointer.clone(), &key);
    let (out_tx, _out_rx) = mpsc::unbounded();

    let frames = futures::stream::iter(vec![
        text(auth(key.as_str())),
        text(r#"{"type":"mouse_move","x":3,"y":4,"pointerSensitivity":25}"#),
        text("not json"),
        text(r#"{"type":"teleport"}"#),
        text(r#"{"type":"right_click_down"}"#),
    ]);
    let outcome = run_session(frames, out_tx, &ctx).await;

    // Bad frames after auth are dropped without ending the session
    assert_eq!(outcome, SessionOutcome::Closed);
    assert_eq!(
        pointer.calls(),
        vec![
            PointerCall::Move(3, 4),
            PointerCall::Press(quick_mouse::MouseButton::Right),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_keep_alive_after_idle_interval() {
    let pointer = RecordingPointer::new();
    let key = AuthKey::generate();
    let ctx = context(pointer.clone(), &key);

    let (in_tx, in_rx) = mpsc::unbounded::<Result<Message, Infallible>>();
    let (out_tx, mut out_rx) = mpsc::unbounded();
    in_tx.unbounded_send(text(auth(key.as_str()))).unwrap();

    let session = tokio::spawn({
        let ctx = Arc::clone(&ctx);
        async move { run_session(in_rx, out_tx, &ctx).await }
    });

    tokio::time::sleep(KEEP_ALIVE - Duration::from_secs(1)).await;
    assert!(out_rx.try_next().is_err(), "no keep-alive before the interval");

    let frame = out_rx.next().await;
    assert_eq!(frame, Some(Message::Text(r#"{"type":"keep_alive"}"#.into())));

    drop(in_tx);
    assert_eq!(session.await.unwrap(), SessionOutcome::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_inbound_frames_rearm_keep_alive() {
    let pointer = RecordingPointer::new();
    let key = AuthKey::generate();
    let ctx = context(pointer.clone(), &key);

    let (in_tx, in_rx) = mpsc::unbounded::<Result<Message, Infallible>>();
    let (out_tx, mut out_rx) = mpsc::unbounded();
    in_tx.unbounded_send(text(auth(key.as_str()))).unwrap();

    let session = tokio::spawn({
        let ctx = Arc::clone(&ctx);
        async move { run_session(in_rx, out_tx, &ctx).await }
    });

    tokio::time::sleep(Duration::from_secs(20)).await;
    in_tx
        .unbounded_send(text(r#"{"type":"left_click_down"}"#))
        .unwrap();

    // 40 s since auth but only 20 s since the last frame
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(out_rx.try_next().is_err());

    let frame = out_rx.next().await;
    assert_eq!(frame, Some(Message::Text(r#"{"type":"keep_alive"}"#.into())));
    assert_eq!(
        pointer.calls(),
        vec![PointerCall::Press(quick_mouse::MouseButton::Left)]
    );

    drop(in_tx);
    assert_eq!(session.await.unwrap(), SessionOutcome::Closed);
}

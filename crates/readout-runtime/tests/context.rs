//! End-to-end tests through the composed runtime.
//!
//! Messages go in as JSON through the dispatcher, exactly as a host would
//! send them; assertions read responses, the fakes and storage.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeCounterpart, FakeMenu};
use readout_core::ports::menu::ids;
use readout_core::preferences::VOLUME_STORAGE_KEY;
use readout_core::protocol::message_types;
use readout_core::{
    AppEvent, ErrorKind, Message, NoopNotifier, ReadoutConfig, Response, SessionId, SessionState,
    SourceContext, StopReason, TabId,
};
use readout_runtime::menu::{PAUSE_LABEL, RESUME_LABEL};
use readout_runtime::{AppContext, HostPorts, MemoryStorage};
use serde_json::{Value, json};

struct Fixture {
    ctx: AppContext,
    counterpart: Arc<FakeCounterpart>,
    menu: Arc<FakeMenu>,
    storage: Arc<MemoryStorage>,
}

async fn fixture() -> Fixture {
    let counterpart = FakeCounterpart::new();
    let menu = FakeMenu::new();
    let storage = Arc::new(MemoryStorage::new());
    let ctx = AppContext::build(
        ReadoutConfig::default(),
        HostPorts {
            counterpart: counterpart.clone(),
            storage: storage.clone(),
            menu: menu.clone(),
            notifier: Arc::new(NoopNotifier),
        },
    )
    .await
    .expect("default config is valid");
    Fixture {
        ctx,
        counterpart,
        menu,
        storage,
    }
}

async fn send(ctx: &AppContext, raw: Value, source: SourceContext) -> Response {
    let message: Message = serde_json::from_value(raw).unwrap();
    ctx.dispatch(message, source).await
}

fn data(response: Response) -> Value {
    assert!(response.success, "unexpected failure: {response:?}");
    response.data.unwrap()
}

/// Wait for background tasks (menu sync) to catch up.
async fn eventually(check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

fn page(tab: i64) -> SourceContext {
    SourceContext::counterpart(TabId(tab), Some("https://news.example/story".into()))
}

#[tokio::test]
async fn test_selection_then_speak_through_dispatcher() {
    let f = fixture().await;
    eventually(|| f.menu.enabled(ids::SPEAK_SELECTION) == Some(false)).await;

    let response = send(
        &f.ctx,
        json!({ "type": "selection-changed", "payload": { "text": "Read me aloud" } }),
        page(5),
    )
    .await;
    assert!(response.success);
    eventually(|| f.menu.enabled(ids::SPEAK_SELECTION) == Some(true)).await;

    let started = data(send(&f.ctx, json!({ "type": "start-session" }), SourceContext::control(None)).await);
    assert_eq!(started["sessionId"], 1);
    assert_eq!(started["tabId"], 5);
    assert_eq!(f.counterpart.sent_names(), vec!["begin-speech"]);

    eventually(|| {
        f.menu.enabled(ids::STOP_READING) == Some(true)
            && f.menu.enabled(ids::SPEAK_SELECTION) == Some(false)
    })
    .await;

    let status = data(send(&f.ctx, json!({ "type": "get-status" }), SourceContext::control(None)).await);
    assert_eq!(status["isPlaying"], true);
    assert_eq!(status["session"]["state"], "speaking");
    assert_eq!(status["selectionPresent"], true);
}

#[tokio::test]
async fn test_pause_label_follows_session() {
    let f = fixture().await;
    let control = SourceContext::control(Some(TabId(2)));
    data(
        send(
            &f.ctx,
            json!({ "type": "start-session", "payload": { "text": "Some text" } }),
            control.clone(),
        )
        .await,
    );

    let paused = data(send(&f.ctx, json!({ "type": "toggle-pause" }), control.clone()).await);
    assert_eq!(paused["isPaused"], true);
    eventually(|| f.menu.title(ids::PAUSE_RESUME).as_deref() == Some(RESUME_LABEL)).await;

    let resumed = data(send(&f.ctx, json!({ "type": "resume" }), control.clone()).await);
    assert_eq!(resumed["isPaused"], false);
    eventually(|| f.menu.title(ids::PAUSE_RESUME).as_deref() == Some(PAUSE_LABEL)).await;

    let stopped = data(send(&f.ctx, json!({ "type": "stop-session" }), control).await);
    assert_eq!(stopped["acknowledged"], true);
    eventually(|| f.menu.enabled(ids::STOP_READING) == Some(false)).await;
}

#[tokio::test]
async fn test_counterpart_report_ends_session() {
    let f = fixture().await;
    data(
        send(
            &f.ctx,
            json!({ "type": "start-session", "payload": { "text": "Short", "tabId": 3 } }),
            SourceContext::control(None),
        )
        .await,
    );
    let response = send(
        &f.ctx,
        json!({ "type": "session-state-changed", "payload": { "state": "finished", "sessionId": 1 } }),
        page(3),
    )
    .await;
    assert!(response.success);
    assert_eq!(f.ctx.orchestrator().phase(), SessionState::Idle);
}

#[tokio::test]
async fn test_volume_mute_scenario() {
    let f = fixture().await;
    let control = SourceContext::control(None);

    let set = data(
        send(&f.ctx, json!({ "type": "set-volume", "payload": { "value": 70 } }), control.clone()).await,
    );
    assert_eq!(set["effectiveVolume"], 70);

    let muted = data(send(&f.ctx, json!({ "type": "mute" }), control.clone()).await);
    assert_eq!(muted["effectiveVolume"], 0);
    assert_eq!(muted["isMuted"], true);

    let unmuted = data(send(&f.ctx, json!({ "type": "unmute" }), control.clone()).await);
    assert_eq!(unmuted["effectiveVolume"], 70);
    assert_eq!(unmuted["isMuted"], false);

    let preset = data(
        send(
            &f.ctx,
            json!({ "type": "apply-volume-preset", "payload": { "name": "Quiet" } }),
            control,
        )
        .await,
    );
    assert_eq!(preset["effectiveVolume"], 30);
}

#[tokio::test]
async fn test_site_speed_uses_sender_origin() {
    let f = fixture().await;
    let set = data(
        send(&f.ctx, json!({ "type": "set-site-speed", "payload": { "value": 1.5 } }), page(1)).await,
    );
    assert_eq!(set["changed"], true);
    assert!((f.ctx.speed().effective_for(Some("https://news.example")) - 1.5).abs() < 1e-6);

    let missing = send(
        &f.ctx,
        json!({ "type": "set-site-speed", "payload": { "value": 1.5 } }),
        SourceContext::control(None),
    )
    .await;
    assert_eq!(missing.error.unwrap().kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_bad_messages_get_error_responses() {
    let f = fixture().await;
    let unknown = send(&f.ctx, json!({ "type": "self-destruct" }), SourceContext::control(None)).await;
    assert_eq!(unknown.error.unwrap().kind, ErrorKind::NoHandler);

    let malformed = send(
        &f.ctx,
        json!({ "type": "set-speed", "payload": { "value": "fast" } }),
        SourceContext::control(None),
    )
    .await;
    assert_eq!(malformed.error.unwrap().kind, ErrorKind::InvalidInput);

    let orphan = send(
        &f.ctx,
        json!({ "type": "speech-boundary", "payload": { "charIndex": 4 } }),
        SourceContext::control(None),
    )
    .await;
    assert_eq!(orphan.error.unwrap().kind, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_counterpart_messages_register_the_tab() {
    let f = fixture().await;
    send(&f.ctx, json!({ "type": "ping" }), page(9)).await;
    assert_eq!(f.ctx.recovery().tracked_tabs(), vec![TabId(9)]);

    send(
        &f.ctx,
        json!({ "type": "tab-removed", "payload": { "tabId": 9 } }),
        SourceContext::host(None),
    )
    .await;
    assert!(f.ctx.recovery().tracked_tabs().is_empty());
}

#[tokio::test]
async fn test_navigation_clears_selection_and_session() {
    let f = fixture().await;
    send(
        &f.ctx,
        json!({ "type": "selection-changed", "payload": { "text": "Paragraph" } }),
        page(4),
    )
    .await;
    data(send(&f.ctx, json!({ "type": "start-session" }), SourceContext::control(None)).await);

    send(&f.ctx, json!({ "type": "tab-navigating" }), SourceContext::host(Some(TabId(4)))).await;
    assert!(!f.ctx.selection().has_selection());
    assert!(!f.ctx.orchestrator().is_active());
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_session_tab_ends_session() {
    let f = fixture().await;
    let mut events = f.ctx.subscribe();
    send(&f.ctx, json!({ "type": "counterpart-ready" }), page(3)).await;
    data(
        send(
            &f.ctx,
            json!({ "type": "start-session", "payload": { "text": "Long article", "tabId": 3 } }),
            SourceContext::control(None),
        )
        .await,
    );

    f.counterpart.set_unreachable(true);
    tokio::time::sleep(Duration::from_secs(200)).await;

    assert!(f.ctx.recovery().tracked_tabs().is_empty());
    assert!(!f.ctx.orchestrator().is_active());

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert!(received.iter().any(|e| matches!(
        e,
        AppEvent::SessionTransition {
            to: SessionState::Idle,
            reason: Some(StopReason::Unreachable),
            ..
        }
    )));
    assert!(received.iter().any(|e| matches!(
        e,
        AppEvent::ErrorReported {
            session_id: Some(SessionId(1)),
            ..
        }
    )));
}

#[tokio::test]
async fn test_shutdown_flushes_pending_volume() {
    let f = fixture().await;
    data(
        send(
            &f.ctx,
            json!({ "type": "set-volume", "payload": { "value": 55 } }),
            SourceContext::control(None),
        )
        .await,
    );
    assert!(f.storage.get(VOLUME_STORAGE_KEY).is_none());

    f.ctx.shutdown().await.unwrap();
    let saved = f.storage.get(VOLUME_STORAGE_KEY).unwrap();
    assert_eq!(saved["globalVolume"], 55);

    let late = send(&f.ctx, json!({ "type": "get-status" }), SourceContext::control(None)).await;
    assert_eq!(late.error.unwrap().kind, ErrorKind::Internal);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = ReadoutConfig {
        queue_capacity: 0,
        ..ReadoutConfig::default()
    };
    let result = AppContext::build(
        config,
        HostPorts {
            counterpart: FakeCounterpart::new(),
            storage: Arc::new(MemoryStorage::new()),
            menu: FakeMenu::new(),
            notifier: Arc::new(NoopNotifier),
        },
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_every_message_type_has_a_handler() {
    let f = fixture().await;
    for kind in [
        message_types::START_SESSION,
        message_types::SET_SITE_VOLUME,
        message_types::COUNTERPART_READY,
        message_types::TAB_ACTIVATED,
    ] {
        let response = send(&f.ctx, json!({ "type": kind }), SourceContext::control(None)).await;
        if let Some(error) = response.error {
            assert_ne!(error.kind, ErrorKind::NoHandler, "{kind} has no handler");
        }
    }
}

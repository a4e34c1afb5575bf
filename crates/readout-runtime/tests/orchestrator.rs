//! Integration tests for the session orchestrator.
//!
//! The orchestrator is driven directly against a recording counterpart; time
//! is paused wherever restart grace, fades or auto-stop are involved.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockNotifier, drain, harness, harness_with, orchestrator_config};
use readout_core::protocol::RemoteErrorPayload;
use readout_core::{
    AppEvent, BoundaryEvent, ChannelError, ErrorKind, Instruction, ReadoutError, RemoteState,
    Selection, SessionId, SessionState, Severity, StopReason, TabId,
};
use readout_runtime::StartRequest;
use tokio_test::{assert_err, assert_ok};

fn select(h: &common::Harness, text: &str, tab: i64) {
    h.selection.update(Selection::new(
        text,
        Some("https://example.com/article".into()),
        None,
        TabId(tab),
    ));
}

fn speak(text: &str, tab: i64) -> StartRequest {
    StartRequest {
        text: Some(text.into()),
        tab_id: Some(TabId(tab)),
        ..StartRequest::default()
    }
}

fn transitions(events: &[AppEvent]) -> Vec<(SessionState, SessionState)> {
    events
        .iter()
        .filter_map(|e| match e {
            AppEvent::SessionTransition { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

fn stop_reason(events: &[AppEvent]) -> Option<StopReason> {
    events.iter().rev().find_map(|e| match e {
        AppEvent::SessionTransition {
            to: SessionState::Idle,
            reason,
            ..
        } => *reason,
        _ => None,
    })
}

// ── Start ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_start_speaks_current_selection() {
    let mut h = harness();
    select(&h, "  Hello world  ", 1);

    let snapshot = assert_ok!(h.orchestrator.start(StartRequest::default()).await);
    assert_eq!(snapshot.state, SessionState::Speaking);
    assert_eq!(snapshot.session_id, Some(SessionId(1)));
    assert_eq!(snapshot.current_tab_id, Some(TabId(1)));
    assert!(h.orchestrator.is_playing());

    match h.counterpart.last_sent() {
        Some(Instruction::BeginSpeech {
            session_id,
            text,
            rate,
            volume,
            ..
        }) => {
            assert_eq!(session_id, SessionId(1));
            assert_eq!(text, "Hello world");
            assert!((rate - 1.0).abs() < f32::EPSILON);
            assert_eq!(volume, 100);
        }
        other => panic!("expected begin-speech, got {other:?}"),
    }

    let events = drain(&mut h.events);
    assert_eq!(
        transitions(&events),
        vec![
            (SessionState::Idle, SessionState::Starting),
            (SessionState::Starting, SessionState::Speaking),
        ]
    );
}

#[tokio::test]
async fn test_start_rejects_missing_or_blank_text() {
    let h = harness();
    let err = assert_err!(h.orchestrator.start(StartRequest::default()).await);
    assert_eq!(err.kind(), ErrorKind::NoSelection);

    let err = assert_err!(h.orchestrator.start(speak("   ", 1)).await);
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = assert_err!(h.orchestrator.start(speak(&"a".repeat(1_001), 1)).await);
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_eq!(h.orchestrator.phase(), SessionState::Idle);
    assert!(h.counterpart.sent().is_empty());
}

#[tokio::test]
async fn test_start_uses_site_speed_override() {
    let h = harness();
    h.orchestrator
        .update_speed(|s| Ok(s.set_for_origin("https://example.com", 1.5)))
        .await
        .unwrap();
    select(&h, "Per-site speed", 1);

    h.orchestrator.start(StartRequest::default()).await.unwrap();
    match h.counterpart.last_sent() {
        Some(Instruction::BeginSpeech { rate, .. }) => assert!((rate - 1.5).abs() < 1e-6),
        other => panic!("expected begin-speech, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_start_returns_to_idle_and_reports() {
    let mut h = harness();
    h.counterpart
        .fail("begin-speech", ChannelError::Rejected("no voices".into()));

    let err = assert_err!(h.orchestrator.start(speak("Hello", 1)).await);
    assert_eq!(err.kind(), ErrorKind::EngineFailure);
    assert_eq!(h.orchestrator.phase(), SessionState::Idle);

    let events = drain(&mut h.events);
    assert_eq!(stop_reason(&events), Some(StopReason::EngineFailure));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, AppEvent::ErrorReported { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_new_start_replaces_active_session() {
    let h = harness();
    h.orchestrator.start(speak("first", 1)).await.unwrap();
    let second = h.orchestrator.start(speak("second", 2)).await.unwrap();

    assert_eq!(second.session_id, Some(SessionId(2)));
    assert_eq!(second.current_tab_id, Some(TabId(2)));
    assert_eq!(
        h.counterpart.sent_names(),
        vec!["begin-speech", "end-speech", "begin-speech"]
    );
    let sent = h.counterpart.sent();
    assert_eq!(sent[1].0, TabId(1));
    assert_eq!(sent[2].0, TabId(2));
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_start_still_auto_stops() {
    let mut h = harness();
    h.counterpart.set_hanging(true);
    let orchestrator = h.orchestrator.clone();
    let start = tokio::spawn(async move { orchestrator.start(speak("Hello", 1)).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    start.abort();
    assert!(start.await.unwrap_err().is_cancelled());
    assert_eq!(h.orchestrator.phase(), SessionState::Starting);

    h.counterpart.set_hanging(false);
    tokio::time::sleep(Duration::from_secs(61)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!h.orchestrator.is_active());
    assert_eq!(stop_reason(&drain(&mut h.events)), Some(StopReason::Timeout));
    assert_eq!(h.counterpart.sent_names(), vec!["end-speech"]);
}

// ── Stop ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_is_idempotent() {
    let mut h = harness();
    assert!(h.orchestrator.stop(StopReason::User).await);

    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    assert!(h.orchestrator.stop(StopReason::User).await);
    assert!(h.orchestrator.stop(StopReason::User).await);

    assert_eq!(h.counterpart.sent_names(), vec!["begin-speech", "end-speech"]);
    assert_eq!(h.orchestrator.snapshot().state, SessionState::Idle);
    assert!(h.progress.snapshot().is_none());

    let events = drain(&mut h.events);
    assert_eq!(
        transitions(&events)[2..].to_vec(),
        vec![
            (SessionState::Speaking, SessionState::Stopping),
            (SessionState::Stopping, SessionState::Idle),
        ]
    );
    assert_eq!(stop_reason(&events), Some(StopReason::User));
}

#[tokio::test]
async fn test_unacknowledged_stop_still_cleans_up() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.counterpart
        .fail("end-speech", ChannelError::Unreachable("gone".into()));

    assert!(!h.orchestrator.stop(StopReason::User).await);
    assert!(!h.orchestrator.is_active());
    assert!(!h.orchestrator.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_stop_on_hanging_counterpart_times_out_locally() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.counterpart.set_hanging(true);

    assert!(!h.orchestrator.stop(StopReason::User).await);
    assert_eq!(h.orchestrator.phase(), SessionState::Idle);
}

#[tokio::test]
async fn test_force_cleanup_skips_the_counterpart() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.orchestrator.force_cleanup(StopReason::User).await;
    assert_eq!(h.counterpart.sent_names(), vec!["begin-speech"]);
    assert_eq!(h.orchestrator.phase(), SessionState::Idle);
}

// ── Force stop ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_force_stop_counter_is_bounded() {
    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .withf(|n| n.severity == Severity::Error)
        .times(1)
        .return_const(());
    let h = harness_with(Arc::new(notifier), orchestrator_config());
    h.counterpart
        .fail("force-stop", ChannelError::Unreachable("stuck".into()));

    for expected in 1..=3 {
        let outcome = h.orchestrator.force_stop(Some(TabId(1))).await;
        assert!(!outcome.acknowledged);
        assert_eq!(outcome.attempts, expected);
        assert_eq!(h.orchestrator.snapshot().force_stop_attempts, expected);
    }

    let outcome = h.orchestrator.force_stop(Some(TabId(1))).await;
    assert_eq!(outcome.attempts, 4);
    assert_eq!(h.orchestrator.snapshot().force_stop_attempts, 0);
    assert_eq!(h.orchestrator.phase(), SessionState::Idle);
}

#[tokio::test]
async fn test_acknowledged_force_stop_resets_counter() {
    let h = harness();
    h.counterpart
        .fail("force-stop", ChannelError::Unreachable("stuck".into()));
    h.orchestrator.force_stop(Some(TabId(1))).await;
    h.orchestrator.force_stop(Some(TabId(1))).await;
    assert_eq!(h.orchestrator.snapshot().force_stop_attempts, 2);

    h.counterpart.heal("force-stop");
    let outcome = h.orchestrator.force_stop(Some(TabId(1))).await;
    assert!(outcome.acknowledged);
    assert_eq!(outcome.attempts, 0);
}

// ── Pause / resume ─────────────────────────────────────────────────

#[tokio::test]
async fn test_pause_resume_and_toggle() {
    let h = harness();
    assert!(!h.orchestrator.pause().await.unwrap());

    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    assert!(h.orchestrator.pause().await.unwrap());
    assert_eq!(h.orchestrator.phase(), SessionState::Paused);
    assert!(!h.orchestrator.is_playing());
    assert!(h.progress.is_paused());

    // Already paused: no second instruction.
    assert!(h.orchestrator.pause().await.unwrap());
    assert_eq!(
        h.counterpart.sent_names(),
        vec!["begin-speech", "pause-speech"]
    );

    assert!(!h.orchestrator.toggle_pause().await.unwrap());
    assert_eq!(h.orchestrator.phase(), SessionState::Speaking);
    assert!(h.orchestrator.is_playing());
    assert!(h.orchestrator.toggle_pause().await.unwrap());
    assert!(!h.orchestrator.resume().await.unwrap());
}

#[tokio::test]
async fn test_unreachable_pause_keeps_session() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.counterpart
        .fail("pause-speech", ChannelError::Unreachable("no answer".into()));

    let err = h.orchestrator.pause().await.unwrap_err();
    assert!(err.is_communication());
    assert_eq!(h.orchestrator.phase(), SessionState::Speaking);
}

#[tokio::test]
async fn test_rejected_pause_ends_session() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.counterpart
        .fail("pause-speech", ChannelError::Rejected("engine crashed".into()));

    let err = h.orchestrator.pause().await.unwrap_err();
    assert!(matches!(err, ReadoutError::EngineFailure(_)));
    assert_eq!(h.orchestrator.phase(), SessionState::Idle);
    assert_eq!(h.counterpart.sent_names().last(), Some(&"force-stop"));
}

// ── Live parameters ────────────────────────────────────────────────

#[tokio::test]
async fn test_speed_change_is_forwarded_live() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();

    let update = h
        .orchestrator
        .update_speed(|s| Ok(s.increment()))
        .await
        .unwrap();
    assert!(update.changed);
    match h.counterpart.last_sent() {
        Some(Instruction::SetRate { rate }) => assert!((rate - 1.1).abs() < 1e-6),
        other => panic!("expected set-rate, got {other:?}"),
    }
}

#[tokio::test]
async fn test_speed_change_is_forwarded_when_persist_fails() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.storage.set_failing(true);

    let update = assert_ok!(h.orchestrator.update_speed(|s| Ok(s.increment())).await);
    assert!(update.changed);
    assert!((h.orchestrator.status().speed - 1.1).abs() < 1e-6);
    assert_eq!(h.counterpart.sent_names(), vec!["begin-speech", "set-rate"]);
}

#[tokio::test]
async fn test_speed_change_without_session_is_stored_only() {
    let h = harness();
    let update = h.orchestrator.apply_speed(2.0).await.unwrap();
    assert!(update.changed);
    assert!(h.counterpart.sent().is_empty());
    assert!((h.speed.current() - 2.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_unreachable_forward_keeps_new_preference() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.counterpart
        .fail("set-volume", ChannelError::Unreachable("gone".into()));

    let update = h.orchestrator.apply_volume(40).await.unwrap();
    assert!(update.changed);
    assert_eq!(h.volume.effective_volume(), 40);
    assert!(h.orchestrator.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_mute_and_unmute_fade_during_session() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.orchestrator.apply_volume(70).await.unwrap();
    assert_eq!(h.counterpart.volumes_sent(), vec![70]);
    h.counterpart.clear_sent();

    let muted = h
        .orchestrator
        .update_volume(|v| Ok(v.mute()), true)
        .await
        .unwrap();
    assert_eq!(muted.after, 0);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let ramp = h.counterpart.volumes_sent();
    assert_eq!(ramp.len(), 10);
    assert_eq!(ramp.first(), Some(&63));
    assert_eq!(ramp.last(), Some(&0));
    h.counterpart.clear_sent();

    let unmuted = h
        .orchestrator
        .update_volume(|v| Ok(v.unmute()), true)
        .await
        .unwrap();
    assert_eq!(unmuted.after, 70);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.counterpart.volumes_sent().last(), Some(&70));
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_running_fade() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.orchestrator
        .update_volume(|v| Ok(v.mute()), true)
        .await
        .unwrap();
    h.orchestrator.stop(StopReason::User).await;
    h.counterpart.clear_sent();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.counterpart.volumes_sent().is_empty());
}

// ── Counterpart reports ────────────────────────────────────────────

#[tokio::test]
async fn test_remote_end_finishes_session() {
    let mut h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.orchestrator
        .on_remote_state_changed(RemoteState::Ended, TabId(1), Some(SessionId(1)))
        .await;
    assert_eq!(h.orchestrator.phase(), SessionState::Idle);
    assert_eq!(stop_reason(&drain(&mut h.events)), Some(StopReason::Finished));
}

#[tokio::test]
async fn test_stale_reports_are_ignored() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();

    h.orchestrator
        .on_remote_state_changed(RemoteState::Ended, TabId(1), Some(SessionId(99)))
        .await;
    h.orchestrator
        .on_remote_state_changed(RemoteState::Ended, TabId(2), None)
        .await;
    assert_eq!(h.orchestrator.phase(), SessionState::Speaking);
}

#[tokio::test]
async fn test_remote_pause_report_updates_state() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.orchestrator
        .on_remote_state_changed(RemoteState::Paused, TabId(1), None)
        .await;
    assert!(h.orchestrator.snapshot().is_paused);
    h.orchestrator
        .on_remote_state_changed(RemoteState::Speaking, TabId(1), None)
        .await;
    assert!(h.orchestrator.is_playing());
}

#[tokio::test]
async fn test_interruption_errors_are_not_failures() {
    let h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();
    h.orchestrator
        .on_remote_error(
            RemoteErrorPayload {
                error: "interrupted".into(),
                ..RemoteErrorPayload::default()
            },
            TabId(1),
        )
        .await;
    assert!(h.orchestrator.is_active());

    h.orchestrator
        .on_remote_error(
            RemoteErrorPayload {
                error: "synthesis-failed".into(),
                message: Some("voice unavailable".into()),
                session_id: Some(SessionId(1)),
            },
            TabId(1),
        )
        .await;
    assert_eq!(h.orchestrator.phase(), SessionState::Idle);
    assert_eq!(h.counterpart.sent_names().last(), Some(&"force-stop"));
}

#[tokio::test]
async fn test_boundary_updates_progress() {
    let mut h = harness();
    h.orchestrator.start(speak(&"a".repeat(100), 1)).await.unwrap();
    drain(&mut h.events);

    h.orchestrator
        .on_boundary(BoundaryEvent::word(50), TabId(1), Some(SessionId(1)));
    let progress = h.orchestrator.status().progress.unwrap();
    assert_eq!(progress.current_position, 50);
    assert!(
        drain(&mut h.events)
            .iter()
            .any(|e| matches!(e, AppEvent::ProgressUpdated { .. }))
    );
}

// ── Tabs and timers ────────────────────────────────────────────────

#[tokio::test]
async fn test_closing_session_tab_ends_session() {
    let mut h = harness();
    h.orchestrator.start(speak("Hello", 3)).await.unwrap();
    h.orchestrator.on_tab_removed(TabId(4)).await;
    assert!(h.orchestrator.is_active());

    h.orchestrator.on_tab_removed(TabId(3)).await;
    assert!(!h.orchestrator.is_active());
    assert_eq!(stop_reason(&drain(&mut h.events)), Some(StopReason::TabClosed));
    // The tab is gone; nothing is sent to it.
    assert_eq!(h.counterpart.sent_names(), vec!["begin-speech"]);
}

#[tokio::test(start_paused = true)]
async fn test_session_auto_stops_at_duration_limit() {
    let mut h = harness();
    h.orchestrator.start(speak("Hello", 1)).await.unwrap();

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(h.orchestrator.is_active());

    tokio::time::sleep(Duration::from_secs(2)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!h.orchestrator.is_active());
    assert_eq!(stop_reason(&drain(&mut h.events)), Some(StopReason::Timeout));
}

#[tokio::test(start_paused = true)]
async fn test_auto_stop_does_not_hit_replacement_session() {
    let h = harness();
    h.orchestrator.start(speak("first", 1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    h.orchestrator.start(speak("second", 1)).await.unwrap();

    // The first session's deadline passes.
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert!(h.orchestrator.is_active());
    assert_eq!(h.orchestrator.snapshot().session_id, Some(SessionId(2)));
}

//! End-to-end: capture a session, build an inference request, apply the
//! returned instruction and read the profile back.

use chrono::{TimeZone, Utc};
use genui_telemetry::exchange::{apply_instruction, InferenceRequest, InferenceResponse};
use genui_telemetry::profile::{to_api_format, ProfileCategory, ProfileMerger, ProfileStore};
use genui_telemetry::tracker::types::{InteractionKind, PageLocation, Signal, TargetDescriptor};
use genui_telemetry::{
    BehaviorAggregator, ChatMessage, Clock, ConversationStore, ManualClock, MessageRole, QuickInsight,
    SqliteStorage, TrackerConfig,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn click(x: f64, y: f64) -> Signal {
    Signal::Click {
        x,
        y,
        viewport_width: 100.0,
        viewport_height: 100.0,
        target: TargetDescriptor::tag("button").with_id("cta"),
    }
}

#[test]
fn session_to_profile_round_trip() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(SqliteStorage::open(&dir.path().join("genui.db")).unwrap());

    // Capture
    let mut tracker =
        BehaviorAggregator::with_clock("user-1", TrackerConfig::default(), clock.clone())
            .unwrap()
            .with_session_id("sess-1");
    tracker.start(PageLocation::new("/", "Home"));
    tracker.record(click(10.0, 10.0));
    clock.advance_ms(1_000);
    tracker.record(Signal::Scroll {
        scroll_y: 1_000.0,
        viewport_height: 800.0,
        document_height: 1_800.0,
    });
    clock.advance_ms(200);
    tracker.navigate(PageLocation::new("/docs", "Docs"));
    tracker.track_interaction("faq-1", "accordion", InteractionKind::Click, None);
    clock.advance_ms(800);
    tracker.record(click(90.0, 90.0));
    tracker.stop();

    let summary = tracker.compact_summary();
    assert_eq!(summary.click_count, 2);
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.max_scroll_depth, 100.0);
    assert_eq!(summary.navigation_path, vec!["/".to_string(), "/docs".to_string()]);
    assert_eq!(summary.duration, 2_000);

    // Request
    let conversations = ConversationStore::with_clock(Arc::clone(&storage), clock.clone());
    conversations.append(
        "sess-1",
        ChatMessage::at(MessageRole::User, "I live in Berlin", clock.now()),
    );
    let store = ProfileStore::with_clock(Arc::clone(&storage), clock.clone());
    let profile = store.get("user-1");
    let request = InferenceRequest::build(
        "show me nearby events",
        Some(&summary),
        &to_api_format(&profile),
        &conversations.get("sess-1"),
    );
    let body = serde_json::to_value(&request).unwrap();
    assert_eq!(body["behavior_data"]["pagesVisited"], 2);
    assert_eq!(body["conversation_history"][0]["content"], "I live in Berlin");

    // Response
    let response = InferenceResponse::from_json(
        &json!({
            "text": "Here are some events",
            "profile_updates": {
                "should_update": true,
                "updates": [
                    {"field": "demographic.city", "value": "Berlin", "confidence": 0.9},
                    {"field": "interests.events", "value": "local", "confidence": 0.6},
                    {"field": "nonsense", "value": 1, "confidence": 1.0}
                ]
            }
        })
        .to_string(),
    )
    .unwrap();

    let merger = ProfileMerger::with_store(store);
    let report = apply_instruction(&merger, "user-1", &response.profile_updates).unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(report.malformed, 1);

    // Offline insight flows through the same gate
    let insight = QuickInsight::analyze(&summary);
    let updates = insight.to_updates(0.5, clock.now());
    let report = merger.apply_updates("user-1", &updates);
    assert_eq!(report.applied, 3);

    // Read back from a fresh store on the same file
    let reopened = ProfileStore::new(SqliteStorage::open(&dir.path().join("genui.db")).unwrap());
    let stored = reopened.get("user-1");
    assert_eq!(
        stored.entry(ProfileCategory::Demographic, "city").unwrap().value,
        json!("Berlin")
    );
    assert!(stored.entry(ProfileCategory::Behavior, "user_type").is_some());

    let api = to_api_format(&stored);
    assert_eq!(api.history_summary, "Interested in events: local");
}

#[test]
fn low_confidence_never_downgrades() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
    let storage = SqliteStorage::open_in_memory().unwrap();
    let merger = ProfileMerger::with_store(ProfileStore::with_clock(storage, clock.clone()));

    let high = InferenceResponse::from_json(
        r#"{"profile_updates": {"should_update": true, "updates": [
            {"field": "demographic.region", "value": "eu", "confidence": 0.5}]}}"#,
    )
    .unwrap();
    apply_instruction(&merger, "u", &high.profile_updates).unwrap();

    for confidence in [0.1, 0.3, 0.5] {
        clock.advance_ms(1_000);
        let low = InferenceResponse::from_json(
            &json!({"profile_updates": {"should_update": true, "updates": [
                {"field": "demographic.region", "value": "us", "confidence": confidence}]}})
            .to_string(),
        )
        .unwrap();
        let report = apply_instruction(&merger, "u", &low.profile_updates).unwrap();
        assert_eq!(report.rejected, 1);
    }

    let entry = merger.store().get("u");
    let region = entry.entry(ProfileCategory::Demographic, "region").unwrap();
    assert_eq!(region.value, json!("eu"));
    assert_eq!(region.confidence, 0.5);
}

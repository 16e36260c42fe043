//! End-to-end scenarios through the full engine: event channel in,
//! derived views out, with the in-memory backends standing in for the
//! remote store.

use chrono::{TimeZone, Utc};
use cobuild_sync::matches::PRESENTATION_GAP;
use cobuild_sync::store::memory::{MemoryFacade, MemoryKv};
use cobuild_sync::types::Profile;
use cobuild_sync::types::rows::{MessageRow, RoomRow};
use cobuild_sync::{ChangeEvent, EngineConfig, SyncEngine, Table};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

fn ts(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn group_room(id: &str, created: i64, joined: i64) -> RoomRow {
    RoomRow {
        id: id.to_string(),
        is_group: true,
        owner_id: "owner".to_string(),
        partner_id: None,
        created_at: ts(created),
        joined_at: ts(joined),
    }
}

fn profile(id: &str) -> Profile {
    Profile {
        user_id: id.to_string(),
        display_name: format!("User {id}"),
        avatar_url: None,
        bio: None,
    }
}

fn room_message_event(id: &str, room: &str, sender: &str, at: i64) -> ChangeEvent {
    ChangeEvent::insert(
        Table::Message,
        json!({
            "id": id,
            "sender_id": sender,
            "room_id": room,
            "content": "hi",
            "created_at": ts(at),
        }),
    )
}

fn like_event(from: &str, to: &str) -> ChangeEvent {
    ChangeEvent::insert(
        Table::Like,
        json!({
            "id": format!("like-{from}-{to}"),
            "sender_id": from,
            "receiver_id": to,
            "created_at": ts(1000),
        }),
    )
}

async fn settle(window: Duration) {
    // Under the paused clock this auto-advances through every timer armed
    // within the window, letting the fired tasks run to completion.
    sleep(window + Duration::from_millis(10)).await;
}

/// Scenario A: events for rooms the user is not in, and not addressed to
/// the user, are rejected with zero cache writes and zero fetches.
#[tokio::test(start_paused = true)]
async fn scenario_a_foreign_events_leave_no_trace() {
    init_logging();
    let facade = Arc::new(MemoryFacade::new());
    facade.set_rooms("me", vec![group_room("mine", 100, 100)]).await;
    let engine = SyncEngine::new(EngineConfig::new("me"), facade.clone(), Arc::new(MemoryKv::new()));
    engine.start().await;

    let fetches_before = facade.profile_fetch_count();
    let unread_before = engine.unread_watch().borrow().clone();

    for i in 0..20 {
        engine
            .handle_event(room_message_event(
                &format!("m{i}"),
                "foreign-room",
                "stranger",
                2000 + i,
            ))
            .await;
    }
    settle(Duration::from_millis(250)).await;

    assert_eq!(facade.profile_fetch_count(), fetches_before);
    assert_eq!(engine.cache().identity_count(), 0);
    assert_eq!(*engine.unread_watch().borrow(), unread_before);
}

/// Scenario B: two mutual matches arriving 10ms apart are both captured,
/// but the second is only presented after the first is dismissed.
#[tokio::test(start_paused = true)]
async fn scenario_b_matches_present_one_at_a_time() {
    init_logging();
    let facade = Arc::new(MemoryFacade::new());
    facade.insert_profile(profile("alice")).await;
    facade.insert_profile(profile("bob")).await;
    facade.add_like("me", "alice").await;
    facade.add_like("me", "bob").await;
    let engine = SyncEngine::new(EngineConfig::new("me"), facade, Arc::new(MemoryKv::new()));
    engine.start().await;

    engine.handle_event(like_event("alice", "me")).await;
    sleep(Duration::from_millis(10)).await;
    engine.handle_event(like_event("bob", "me")).await;

    let presentation = engine.matches().presentation_watch();
    assert_eq!(presentation.borrow().as_ref().unwrap().user_id, "alice");
    assert_eq!(engine.matches().queue_len().await, 1);

    engine.matches().dismiss_current().await;
    assert!(presentation.borrow().is_none());
    settle(PRESENTATION_GAP).await;
    assert_eq!(presentation.borrow().as_ref().unwrap().user_id, "bob");
}

/// Scenario C: a batched unread query failing mid-session leaves the
/// previously displayed count untouched, and the next event retries.
#[tokio::test(start_paused = true)]
async fn scenario_c_fetch_failure_keeps_previous_count() {
    init_logging();
    let window = Duration::from_millis(250);
    let facade = Arc::new(MemoryFacade::new());
    facade.set_rooms("me", vec![group_room("r1", 100, 100)]).await;
    facade
        .push_message(MessageRow {
            id: "m1".to_string(),
            sender_id: "u1".to_string(),
            receiver_id: None,
            room_id: Some("r1".to_string()),
            content: String::new(),
            created_at: ts(200),
            is_read: false,
        })
        .await;

    let engine = SyncEngine::new(
        EngineConfig::new("me").with_debounce_window(window),
        facade.clone(),
        Arc::new(MemoryKv::new()),
    );
    engine.start().await;
    assert_eq!(*engine.unread_watch().borrow(), 1);

    facade.set_failing(true);
    facade
        .push_message(MessageRow {
            id: "m2".to_string(),
            sender_id: "u1".to_string(),
            receiver_id: None,
            room_id: Some("r1".to_string()),
            content: String::new(),
            created_at: ts(300),
            is_read: false,
        })
        .await;
    engine.handle_event(room_message_event("m2", "r1", "u1", 300)).await;
    settle(window).await;
    assert_eq!(*engine.unread_watch().borrow(), 1);

    facade.set_failing(false);
    facade
        .push_message(MessageRow {
            id: "m3".to_string(),
            sender_id: "u1".to_string(),
            receiver_id: None,
            room_id: Some("r1".to_string()),
            content: String::new(),
            created_at: ts(400),
            is_read: false,
        })
        .await;
    engine.handle_event(room_message_event("m3", "r1", "u1", 400)).await;
    settle(window).await;
    assert_eq!(*engine.unread_watch().borrow(), 3);
}

/// A burst of messages through the live channel coalesces into a single
/// recomputation and a single pair of batched lookups.
#[tokio::test(start_paused = true)]
async fn burst_of_messages_coalesces_batches() {
    init_logging();
    let window = Duration::from_millis(250);
    let facade = Arc::new(MemoryFacade::new());
    facade.set_rooms("me", vec![group_room("r1", 100, 100)]).await;
    let engine = SyncEngine::new(
        EngineConfig::new("me").with_debounce_window(window),
        facade.clone(),
        Arc::new(MemoryKv::new()),
    );
    engine.refresh_rooms().await;

    let status_batches_before = facade.status_batch_count();
    for i in 0..15 {
        let at = 200 + i;
        facade
            .push_message(MessageRow {
                id: format!("m{i}"),
                sender_id: "u1".to_string(),
                receiver_id: None,
                room_id: Some("r1".to_string()),
                content: String::new(),
                created_at: ts(at),
                is_read: false,
            })
            .await;
        engine
            .handle_event(room_message_event(&format!("m{i}"), "r1", "u1", at))
            .await;
    }
    settle(window).await;

    assert_eq!(*engine.unread_watch().borrow(), 15);
    // 15 events, one recomputation, one batched status lookup.
    assert_eq!(facade.status_batch_count() - status_batches_before, 1);
}

/// Live message events patch an already-cached conversation exactly once,
/// and identity resolution for the burst costs one profile fetch.
#[tokio::test(start_paused = true)]
async fn live_messages_patch_cache_and_dedup_identity() {
    init_logging();
    let facade = Arc::new(MemoryFacade::new());
    facade.insert_profile(profile("u1")).await;
    facade
        .set_rooms(
            "me",
            vec![group_room("r1", 100, 100), group_room("r2", 100, 100)],
        )
        .await;
    let engine = SyncEngine::new(EngineConfig::new("me"), facade.clone(), Arc::new(MemoryKv::new()));
    engine.start().await;

    // The rendering layer already fetched this room once.
    engine.cache().put_message_pages("r1", vec![vec![]]);

    // At-least-once delivery: the same insert arrives twice.
    engine.handle_event(room_message_event("m1", "r1", "u1", 200)).await;
    engine.handle_event(room_message_event("m1", "r1", "u1", 200)).await;
    engine.handle_event(room_message_event("m2", "r1", "u1", 201)).await;

    let pages = engine.cache().message_pages("r1").unwrap();
    assert_eq!(
        pages[0].iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
        ["m2", "m1"]
    );
    // One identity fetch for the whole burst, visible to the UI cache.
    assert_eq!(facade.profile_fetch_count(), 1);
    assert!(engine.cache().identity("u1").is_some());

    // A member room nobody opened yet stays uncached; the patch is a no-op.
    engine.handle_event(room_message_event("m3", "r2", "u1", 202)).await;
    assert!(!engine.cache().has_message_pages("r2"));
}

/// The full run loop: events pushed through the channel drive the derived
/// views; shutdown stops the loop.
#[tokio::test(start_paused = true)]
async fn run_loop_processes_channel_events() -> anyhow::Result<()> {
    init_logging();
    let window = Duration::from_millis(250);
    let facade = Arc::new(MemoryFacade::new());
    facade.insert_profile(profile("alice")).await;
    facade.add_like("me", "alice").await;
    facade.set_rooms("me", vec![group_room("r1", 100, 100)]).await;

    let engine = SyncEngine::new(
        EngineConfig::new("me").with_debounce_window(window),
        facade.clone(),
        Arc::new(MemoryKv::new()),
    );
    engine.start().await;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let run = tokio::spawn(engine.clone().run(rx));

    facade
        .push_message(MessageRow {
            id: "m1".to_string(),
            sender_id: "u1".to_string(),
            receiver_id: None,
            room_id: Some("r1".to_string()),
            content: String::new(),
            created_at: ts(200),
            is_read: false,
        })
        .await;
    tx.send(room_message_event("m1", "r1", "u1", 200)).unwrap();
    tx.send(like_event("alice", "me")).unwrap();
    // Malformed payload in the middle of the stream must not break it.
    tx.send(ChangeEvent::insert(Table::Message, json!({ "sender_id": "me" })))
        .unwrap();

    settle(window).await;
    assert_eq!(*engine.unread_watch().borrow(), 1);
    assert_eq!(
        engine
            .matches()
            .presentation_watch()
            .borrow()
            .as_ref()
            .unwrap()
            .user_id,
        "alice"
    );

    engine.shutdown();
    run.await?;
    Ok(())
}

/// Viewed-set monotonicity across engine restarts: a dismissed match is
/// never presented again by a later session's reconciliation.
#[tokio::test(start_paused = true)]
async fn dismissed_match_stays_dismissed_across_sessions() {
    init_logging();
    let facade = Arc::new(MemoryFacade::new());
    facade.insert_profile(profile("alice")).await;
    facade.add_like("me", "alice").await;
    facade.add_like("alice", "me").await;
    let kv = Arc::new(MemoryKv::new());

    let engine = SyncEngine::new(EngineConfig::new("me"), facade.clone(), kv.clone());
    engine.start().await;
    assert_eq!(
        engine.matches().presentation_watch().borrow().as_ref().unwrap().user_id,
        "alice"
    );
    engine.matches().dismiss_current().await;
    settle(PRESENTATION_GAP).await;

    // Fresh session, same device store.
    let second = SyncEngine::new(EngineConfig::new("me"), facade, kv);
    second.start().await;
    assert!(second.matches().presentation_watch().borrow().is_none());
    assert_eq!(second.matches().queue_len().await, 0);
}

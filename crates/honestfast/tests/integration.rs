//! Integration tests for honestfast
//!
//! These tests drive the engine end to end with real stores and the
//! in-process peer link.

use chrono::{DateTime, Local, TimeZone};
use honestfast_api::{DeviceRole, FastState, FastingPlan, SyncPayload, keys};
use honestfast_config::parse_config;
use honestfast_core::{
    CoreEvent, EndDecision, FastStats, FastingEngine, StartDecision, SyncRelay, export_history,
};
use honestfast_host_api::{
    DisconnectedPeer, LoopbackPeer, MemorySharedStore, MockNotifier, PeerLink, SharedStore,
};
use honestfast_store::{FastStore, FileSharedStore, SqliteStore};
use std::sync::Arc;
use std::time::Duration;

fn t0() -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 6, 12, 20, 0, 0).unwrap()
}

fn hours(h: i64) -> chrono::Duration {
    chrono::Duration::hours(h)
}

fn make_engine(store: Arc<SqliteStore>, peer: Arc<dyn PeerLink>, role: DeviceRole) -> FastingEngine {
    let relay = SyncRelay::new(role, Arc::new(MemorySharedStore::new()), peer);
    FastingEngine::new(store, Arc::new(MockNotifier::new()), relay)
}

#[test]
fn test_sixteen_hour_fast_completes_and_dismisses() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = make_engine(store.clone(), Arc::new(DisconnectedPeer::new()), DeviceRole::Phone);
    engine.restore(t0());

    let plan = FastingPlan::find_builtin("16:8").unwrap();
    assert!(matches!(engine.start_plan(&plan, t0()), StartDecision::Started(_)));

    // Tick every hour up to the target
    let mut completed = false;
    for h in 1..=16 {
        let events = engine.tick(t0() + hours(h));
        if events.iter().any(|e| matches!(e, CoreEvent::FastCompleted { .. })) {
            assert_eq!(h, 16);
            completed = true;
        }
    }
    assert!(completed);
    assert_eq!(engine.state(), FastState::Complete);

    let record = &store.all_fasts().unwrap()[0];
    assert!(record.completed());
    assert_eq!(record.end_time(), Some(t0() + hours(16)));

    engine.dismiss();
    assert_eq!(engine.state(), FastState::Idle);
}

#[test]
fn test_eighteen_hour_fast_ended_early() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = make_engine(store.clone(), Arc::new(DisconnectedPeer::new()), DeviceRole::Phone);
    engine.restore(t0());

    let plan = FastingPlan::find_builtin("18:6").unwrap();
    engine.start_plan(&plan, t0());

    match engine.end_fast(t0() + hours(10)) {
        EndDecision::Ended(result) => {
            assert!(!result.completed);
            assert_eq!(result.duration, Duration::from_secs(10 * 3600));
        }
        other => panic!("unexpected decision: {other:?}"),
    }

    let record = &store.all_fasts().unwrap()[0];
    assert_eq!(record.end_time(), Some(t0() + hours(10)));
    assert!(!record.completed());
    assert_eq!(engine.state(), FastState::Idle);
}

#[test]
fn test_active_fast_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("honestfast.db");

    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut engine = make_engine(store, Arc::new(DisconnectedPeer::new()), DeviceRole::Phone);
        engine.restore(t0());
        engine.start_fast("20:4", 20.0, t0());
    }

    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let mut engine = make_engine(store, Arc::new(DisconnectedPeer::new()), DeviceRole::Phone);
    engine.restore(t0() + hours(5));

    assert_eq!(engine.state(), FastState::Active);
    let reading = engine.snapshot(t0() + hours(5)).reading.unwrap();
    assert_eq!(reading.progress, 0.25);
}

#[tokio::test]
async fn test_phone_start_reaches_watch() {
    let (phone_link, watch_link) = LoopbackPeer::pair(16);
    let phone_link = Arc::new(phone_link);
    let watch_link = Arc::new(watch_link);

    let mut phone = make_engine(
        Arc::new(SqliteStore::in_memory().unwrap()),
        phone_link.clone(),
        DeviceRole::Phone,
    );
    let mut watch = make_engine(
        Arc::new(SqliteStore::in_memory().unwrap()),
        watch_link.clone(),
        DeviceRole::Watch,
    );
    let mut watch_inbox = watch.relay().subscribe().unwrap();
    let mut phone_inbox = phone.relay().subscribe().unwrap();

    // Both sides come up idle, a minute apart
    watch.load(t0() - hours(1));
    phone.load(t0() - hours(1));

    phone.start_fast("16:8", 16.0, t0());

    // Context and message both arrive; the second is a no-op
    let mut applied = Vec::new();
    for _ in 0..2 {
        let event = watch_inbox.recv().await.unwrap();
        applied.extend(watch.apply_remote(event.payload(), t0() + chrono::Duration::seconds(1)));
    }
    assert_eq!(applied.len(), 1);
    assert!(matches!(
        applied[0],
        CoreEvent::RemoteStarted {
            origin: DeviceRole::Phone,
            ..
        }
    ));
    assert_eq!(watch.state(), FastState::Active);
    assert_eq!(watch.active_fast().unwrap().start_time(), t0());

    // The watch ends it; the phone follows
    watch.end_fast(t0() + hours(3));
    let mut phone_events = Vec::new();
    for _ in 0..2 {
        let event = phone_inbox.recv().await.unwrap();
        phone_events.extend(phone.apply_remote(event.payload(), t0() + hours(3)));
    }
    assert!(matches!(
        phone_events.as_slice(),
        [CoreEvent::RemoteEnded {
            origin: DeviceRole::Watch,
            completed: false,
            ..
        }]
    ));
    assert_eq!(phone.state(), FastState::Idle);

    // Remote-driven transitions do not echo back
    assert!(watch_inbox.try_recv().is_err());
}

#[tokio::test]
async fn test_stop_made_while_phone_was_away_survives_relaunch() {
    let (phone_link, watch_link) = LoopbackPeer::pair(16);
    let phone_link = Arc::new(phone_link);
    let watch_link = Arc::new(watch_link);

    let phone_store = Arc::new(SqliteStore::in_memory().unwrap());
    let phone_shared = Arc::new(MemorySharedStore::new());
    let open_phone = || {
        FastingEngine::new(
            phone_store.clone(),
            Arc::new(MockNotifier::new()),
            SyncRelay::new(DeviceRole::Phone, phone_shared.clone(), phone_link.clone()),
        )
    };

    let mut phone = open_phone();
    let mut watch = make_engine(
        Arc::new(SqliteStore::in_memory().unwrap()),
        watch_link.clone(),
        DeviceRole::Watch,
    );
    // The inbox outlives the first phone process
    let mut phone_inbox = phone_link.subscribe().unwrap();
    let mut watch_inbox = watch.relay().subscribe().unwrap();

    watch.load(t0() - hours(1));
    phone.load(t0() - hours(1));
    phone.start_fast("16:8", 16.0, t0());
    while let Ok(event) = watch_inbox.try_recv() {
        watch.apply_remote(event.payload(), t0() + chrono::Duration::seconds(1));
    }
    assert_eq!(watch.state(), FastState::Active);

    // The phone goes away; the watch ends the fast meanwhile
    phone_link.set_active(false);
    drop(phone);
    watch.end_fast(t0() + hours(3));
    assert!(phone_inbox.try_recv().is_err());

    // Relaunch: the restored phone republishes before it hears the stop
    let mut phone = open_phone();
    phone.restore(t0() + hours(4));
    assert_eq!(phone.state(), FastState::Active);
    phone_link.set_active(true);

    let event = phone_inbox.recv().await.unwrap();
    let events = phone.apply_remote(event.payload(), t0() + hours(4));
    assert!(matches!(
        events.as_slice(),
        [CoreEvent::RemoteEnded {
            origin: DeviceRole::Watch,
            completed: false,
            ..
        }]
    ));
    assert_eq!(phone.state(), FastState::Idle);
    assert!(phone_store.active_fast().unwrap().is_none());

    // The watch drops the phone's relaunch snapshot as older than its stop
    let mut relaunch_events = 0;
    while let Ok(event) = watch_inbox.try_recv() {
        relaunch_events += 1;
        assert!(watch.apply_remote(event.payload(), t0() + hours(4)).is_empty());
    }
    assert_eq!(relaunch_events, 2);
    assert_eq!(watch.state(), FastState::Idle);
}

#[tokio::test]
async fn test_extreme_remote_start_is_bounded() {
    let (phone_link, watch_link) = LoopbackPeer::pair(16);
    let watch_link = Arc::new(watch_link);
    let mut watch = make_engine(
        Arc::new(SqliteStore::in_memory().unwrap()),
        watch_link.clone(),
        DeviceRole::Watch,
    );
    let mut watch_inbox = watch.relay().subscribe().unwrap();
    watch.load(t0());

    let mut payload = SyncPayload::new();
    payload.insert(keys::IS_FASTING, true);
    payload.insert(keys::FAST_START_TIME, 8_210_298_400_000.0);
    payload.insert(keys::FAST_DURATION_HOURS, 1e10);
    payload.insert(keys::LAST_SYNC_TIMESTAMP, 1_900_000_000.0);
    phone_link.send_message(payload.clone()).unwrap();

    let event = watch_inbox.recv().await.unwrap();
    assert!(watch.apply_remote(event.payload(), t0()).is_empty());
    assert_eq!(watch.state(), FastState::Idle);

    // A sane start with an absurd target falls back to 16 hours
    payload.insert(keys::FAST_START_TIME, 1_900_000_100.0);
    payload.insert(keys::LAST_SYNC_TIMESTAMP, 1_900_000_100.0);
    phone_link.send_message(payload).unwrap();

    let event = watch_inbox.recv().await.unwrap();
    let events = watch.apply_remote(event.payload(), t0());
    assert_eq!(events.len(), 1);
    assert_eq!(watch.active_fast().unwrap().target_hours(), 16.0);
    assert!(watch.tick(t0() + hours(1)).is_empty());
}

#[test]
fn test_sync_through_shared_file() {
    let dir = tempfile::tempdir().unwrap();
    let blob = dir.path().join("shared.json");

    let phone_shared = Arc::new(FileSharedStore::new(&blob));
    let mut phone = FastingEngine::new(
        Arc::new(SqliteStore::in_memory().unwrap()),
        Arc::new(MockNotifier::new()),
        SyncRelay::new(
            DeviceRole::Phone,
            phone_shared.clone(),
            Arc::new(DisconnectedPeer::new()),
        ),
    );
    phone.restore(t0());
    phone.start_fast("18:6", 18.0, t0());

    let snapshot = phone_shared.read().unwrap();
    assert!(snapshot.is_fasting);

    let mut watch = make_engine(
        Arc::new(SqliteStore::in_memory().unwrap()),
        Arc::new(DisconnectedPeer::new()),
        DeviceRole::Watch,
    );
    watch.load(t0());
    let events = watch.apply_remote(&snapshot.to_payload(), t0() + hours(1));
    assert_eq!(events.len(), 1);
    assert_eq!(watch.active_fast().unwrap().target_hours(), 18.0);
}

#[test]
fn test_configured_plan_and_stats() {
    let config = parse_config(
        r#"
        config_version = 1

        [notifications]
        milestone_hours = [6]

        [[plans]]
        id = "14:10"
        fast_hours = 14
        eat_hours = 10
        "#,
    )
    .unwrap();

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let notifier = Arc::new(MockNotifier::new());
    let relay = SyncRelay::new(
        DeviceRole::Phone,
        Arc::new(MemorySharedStore::new()),
        Arc::new(DisconnectedPeer::new()),
    );
    let mut engine = FastingEngine::new(store, notifier.clone(), relay)
        .with_milestone_hours(config.milestone_hours.clone());
    engine.restore(t0());

    let plan = config.get_plan("14:10").unwrap().clone();
    engine.start_plan(&plan, t0());
    assert_eq!(notifier.pending_ids().len(), 2);
    assert!(notifier.get("milestone-6h").is_some());

    engine.tick(t0() + hours(14));
    assert_eq!(engine.state(), FastState::Complete);

    let stats: FastStats = engine.stats(t0() + hours(14));
    assert_eq!(stats.total_completed, 1);
    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.longest_hours, 14.0);

    let csv = export_history(&engine.history(), t0() + hours(15));
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("14:10,2025-06-12 20:00:00,2025-06-13 10:00:00,14.00,true"));
}

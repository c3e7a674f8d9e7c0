use std::sync::Arc;

use approx::assert_abs_diff_eq;
use covidmap::galileo_types::cartesian::CartesianPoint2d;
use covidmap::geolocation::{AccuracyGeometry, GeolocationFix, TrackingOptions};
use covidmap::session::VIEW_ANIMATION_DURATION;
use covidmap::storage::LAST_POSITION_KEY;
use covidmap::symbol::UserPositionSymbol;
use covidmap::{
    projection, DrawState, HeadlessEngine, InsertionCancel, KeyValueStore, MapConfig, MapError,
    MapPosition, MapSession, MarkerData, MemoryStore,
};
use parking_lot::Mutex;

struct Fixture {
    session: MapSession,
    engine: HeadlessEngine,
    store: Arc<MemoryStore>,
}

fn fixture() -> Fixture {
    covidmap::logging::init_logger();

    let engine = HeadlessEngine::new();
    let store = Arc::new(MemoryStore::new());
    let session = MapSession::new(engine.clone(), store.clone(), MapConfig::default());
    Fixture {
        session,
        engine,
        store,
    }
}

fn initialized() -> Fixture {
    let fixture = fixture();
    fixture.session.initialize("map", 0.0, 0.0);
    fixture
}

fn shown_markers(engine: &HeadlessEngine) -> Vec<Vec<MarkerData>> {
    engine
        .cluster_layers()
        .iter()
        .map(|(_, layer)| layer.markers().to_vec())
        .collect()
}

#[test]
fn initialize_binds_view_and_starts_tracking() {
    let Fixture {
        session, engine, ..
    } = fixture();
    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();
    session.on_initialized(move || *counter.lock() += 1);

    session.initialize("map", 38.7223, -9.1393);

    assert!(session.is_initialized());
    assert_eq!(*calls.lock(), 1);
    assert_eq!(engine.surface().as_deref(), Some("map"));
    assert_eq!(engine.tracking(), Some(TrackingOptions::HIGH_ACCURACY));
    assert_eq!(engine.tile_layers(), vec![covidmap::config::OSM_TILE_URL]);

    let view = session.view().expect("no view");
    let expected = projection::from_lon_lat(-9.1393, 38.7223);
    assert_abs_diff_eq!(view.center.x(), expected.x());
    assert_abs_diff_eq!(view.center.y(), expected.y());
    assert_abs_diff_eq!(view.zoom, 6.0);

    session.initialize("other", 0.0, 0.0);
    assert_eq!(*calls.lock(), 1);
    assert_eq!(engine.surface().as_deref(), Some("map"));
}

#[test]
fn only_last_init_callback_is_called() {
    let Fixture { session, .. } = fixture();
    let calls = Arc::new(Mutex::new(vec![]));

    let first = calls.clone();
    session.on_initialized(move || first.lock().push("first"));
    let second = calls.clone();
    session.on_initialized(move || second.lock().push("second"));
    session.initialize("map", 0.0, 0.0);

    assert_eq!(*calls.lock(), vec!["second"]);
}

#[test]
fn init_callback_may_use_the_session() {
    let Fixture { session, engine, .. } = fixture();
    let handle = session.clone();
    session.on_initialized(move || {
        handle
            .set_markers(vec![MarkerData::new(1.0, 1.0)])
            .expect("set markers failed");
    });

    session.initialize("map", 0.0, 0.0);
    assert_eq!(shown_markers(&engine), vec![vec![MarkerData::new(1.0, 1.0)]]);
}

#[test]
fn init_callback_registered_late_is_released() {
    let Fixture { session, .. } = initialized();
    let token = Arc::new(());
    let captured = token.clone();
    let handle = session.clone();
    session.on_initialized(move || {
        let _ = (&captured, &handle);
        panic!("late callback called");
    });

    assert_eq!(Arc::strong_count(&token), 1);
    session.initialize("map", 0.0, 0.0);
}

#[test]
fn unbindable_surface_leaves_session_uninitialized() {
    let engine = HeadlessEngine::unbindable();
    let session = MapSession::new(
        engine.clone(),
        Arc::new(MemoryStore::new()),
        MapConfig::default(),
    );
    let called = Arc::new(Mutex::new(false));
    let flag = called.clone();
    session.on_initialized(move || *flag.lock() = true);

    session.initialize("missing", 0.0, 0.0);

    assert!(!session.is_initialized());
    assert!(!*called.lock());
    assert!(engine.tracking().is_none());
    assert!(engine.tile_layers().is_empty());
}

#[test]
fn operations_before_initialization() {
    let Fixture {
        session,
        engine,
        store,
    } = fixture();

    session.update_position(1.0, 2.0).expect("update failed");
    assert!(store.get(LAST_POSITION_KEY).expect("get failed").is_none());
    assert!(engine.user_position().is_none());

    assert!(matches!(
        session.set_markers(vec![]),
        Err(MapError::NotInitialized)
    ));
    assert!(matches!(
        session.enable_free_draw(|_| {}),
        Err(MapError::NotInitialized)
    ));
    assert!(matches!(
        session.enable_marker_insertion(|_, _| {}),
        Err(MapError::NotInitialized)
    ));
    session.disable_marker_insertion();
    assert!(!session.handle_click(MapPosition::new(0.0, 0.0)));
}

#[test]
fn update_position_persists_raw_and_centers_corrected() {
    let Fixture {
        session,
        engine,
        store,
    } = initialized();

    session.update_position(1.0, 2.0).expect("update failed");

    let stored = store
        .get(LAST_POSITION_KEY)
        .expect("get failed")
        .expect("position not stored");
    insta::assert_snapshot!(stored, @r#"{"latitude":1.0,"longitude":2.0}"#);

    let expected = projection::from_lon_lat(2.0 - 0.0038, 1.0 + 0.0007);
    let target = engine.target_view().expect("no view");
    assert_abs_diff_eq!(target.center.x(), expected.x());
    assert_abs_diff_eq!(target.center.y(), expected.y());
    assert_abs_diff_eq!(target.zoom, 17.0);
    assert_eq!(
        engine.animation().expect("no animation").duration,
        VIEW_ANIMATION_DURATION
    );

    let user = engine.user_position().expect("no user position");
    assert_abs_diff_eq!(user.x(), expected.x());
    assert_eq!(
        engine.user_position_symbol(),
        Some(UserPositionSymbol::default())
    );
    assert_eq!(engine.accuracy(), Some(AccuracyGeometry::Point(user)));
}

#[test]
fn update_position_with_explicit_zoom() {
    let Fixture {
        session, engine, ..
    } = initialized();

    session
        .update_position_with_zoom(10.0, 20.0, 12.0)
        .expect("update failed");
    assert_abs_diff_eq!(engine.target_view().expect("no view").zoom, 12.0);
}

#[test]
fn non_finite_position_is_rejected() {
    let Fixture {
        session,
        engine,
        store,
    } = initialized();
    session.update_position(1.0, 2.0).expect("update failed");
    let view = engine.target_view();

    for (latitude, longitude) in [(f64::NAN, 2.0), (1.0, f64::INFINITY)] {
        assert!(matches!(
            session.update_position(latitude, longitude),
            Err(MapError::InvalidPosition { .. })
        ));
    }

    assert_eq!(engine.target_view(), view);
    assert_eq!(
        store.get(LAST_POSITION_KEY).expect("get failed").as_deref(),
        Some(r#"{"latitude":1.0,"longitude":2.0}"#)
    );
    assert_eq!(
        session.last_known_position().expect("read failed"),
        Some(MapPosition::new(1.0, 2.0))
    );
}

#[test]
fn last_known_position_round_trip() {
    let Fixture { session, .. } = initialized();
    assert_eq!(session.last_known_position().expect("read failed"), None);

    session.update_position(1.0, 2.0).expect("update failed");
    session.update_position(-33.9, 18.4).expect("update failed");

    assert_eq!(
        session.last_known_position().expect("read failed"),
        Some(MapPosition::new(-33.9, 18.4))
    );
}

#[test]
fn last_known_position_survives_new_session() {
    let store = Arc::new(MemoryStore::new());
    let first = MapSession::new(HeadlessEngine::new(), store.clone(), MapConfig::default());
    first.initialize("map", 0.0, 0.0);
    first.update_position(52.52, 13.405).expect("update failed");
    drop(first);

    let second = MapSession::new(HeadlessEngine::new(), store, MapConfig::default());
    assert_eq!(
        second.last_known_position().expect("read failed"),
        Some(MapPosition::new(52.52, 13.405))
    );
}

#[test]
fn malformed_persisted_position_is_decode_error() {
    let Fixture { session, store, .. } = fixture();
    store.set(LAST_POSITION_KEY, "{latitude").expect("set failed");

    assert!(matches!(
        session.last_known_position(),
        Err(MapError::Decode(_))
    ));
}

#[test]
fn geolocation_fix_updates_accuracy_circle() {
    let Fixture {
        session, engine, ..
    } = initialized();

    session.handle_geolocation(GeolocationFix {
        position: MapPosition::new(0.0, 0.0),
        accuracy_m: 15.0,
    });

    let Some(AccuracyGeometry::Circle { radius, .. }) = engine.accuracy() else {
        panic!("expected accuracy circle");
    };
    assert_abs_diff_eq!(radius, 15.0);
}

#[test]
fn set_markers_replaces_previous_layer() {
    let Fixture {
        session, engine, ..
    } = initialized();
    let m1 = MarkerData::new(1.0, 1.0);
    let m2 = MarkerData::new(2.0, 2.0);

    session.set_markers(vec![]).expect("set markers failed");
    let (empty_id, _) = engine.cluster_layers()[0].clone();

    session.set_markers(vec![m1, m2]).expect("set markers failed");

    let layers = engine.cluster_layers();
    assert_eq!(layers.len(), 1);
    assert_ne!(layers[0].0, empty_id);
    assert_eq!(layers[0].1.markers(), &[m1, m2]);
    assert_eq!(session.markers(), vec![m1, m2]);
}

#[test]
fn shown_layer_clusters_close_markers() {
    let Fixture {
        session, engine, ..
    } = initialized();
    session
        .set_markers(vec![
            MarkerData::new(38.7223, -9.1393),
            MarkerData::new(38.7224, -9.1394),
            MarkerData::new(41.1579, -8.6291),
        ])
        .expect("set markers failed");

    let (_, layer) = engine.cluster_layers()[0].clone();
    let resolution = session.view().expect("no view").resolution();
    let clusters = layer.clusters(resolution);

    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].size(), 2);
    assert_eq!(layer.symbol(clusters[0].size()).label, "2");
}

#[test]
fn marker_insertion_and_cancel() {
    let Fixture {
        session, engine, ..
    } = initialized();
    let m1 = MarkerData::new(1.0, 1.0);
    session.set_markers(vec![m1]).expect("set markers failed");

    let received: Arc<Mutex<Option<(MapPosition, InsertionCancel)>>> = Arc::new(Mutex::new(None));
    let slot = received.clone();
    session
        .enable_marker_insertion(move |position, cancel| {
            *slot.lock() = Some((position, cancel));
        })
        .expect("arming failed");
    assert_eq!(session.draw_state(), DrawState::InsertArmed);

    let clicked = MapPosition::new(20.0, 10.0);
    assert!(session.handle_click(clicked));

    assert_eq!(session.draw_state(), DrawState::Idle);
    assert_eq!(session.markers(), vec![m1, MarkerData::from(clicked)]);
    assert_eq!(shown_markers(&engine), vec![vec![m1, clicked.into()]]);

    let (position, cancel) = received.lock().take().expect("callback not called");
    assert_eq!(position, clicked);
    assert_eq!(cancel.marker(), Some(clicked.into()));

    cancel.cancel().expect("cancel failed");
    assert_eq!(session.markers(), vec![m1]);
    assert_eq!(shown_markers(&engine), vec![vec![m1]]);

    assert!(!session.handle_click(MapPosition::new(5.0, 5.0)));
    assert_eq!(session.markers(), vec![m1]);
}

#[test]
fn cancel_restores_markers_from_before_insertion() {
    let Fixture {
        session, engine, ..
    } = initialized();
    let m1 = MarkerData::new(1.0, 1.0);
    let m2 = MarkerData::new(2.0, 2.0);
    let m3 = MarkerData::new(3.0, 3.0);
    session.set_markers(vec![m1, m2]).expect("set markers failed");

    let received = Arc::new(Mutex::new(None));
    let slot = received.clone();
    session
        .enable_marker_insertion(move |_, cancel| *slot.lock() = Some(cancel))
        .expect("arming failed");
    session.handle_click(MapPosition::new(20.0, 10.0));
    session.set_markers(vec![m3]).expect("set markers failed");

    let cancel = received.lock().take().expect("callback not called");
    cancel.cancel().expect("cancel failed");

    assert_eq!(session.markers(), vec![m1, m2]);
    assert_eq!(shown_markers(&engine), vec![vec![m1, m2]]);
}

#[test]
fn cancel_from_inside_the_callback() {
    let Fixture { session, .. } = initialized();
    session
        .enable_marker_insertion(|_, cancel| cancel.cancel().expect("cancel failed"))
        .expect("arming failed");

    assert!(session.handle_click(MapPosition::new(1.0, 1.0)));
    assert!(session.markers().is_empty());
}

#[test]
fn cancel_after_session_is_dropped() {
    let Fixture { session, engine, .. } = initialized();
    let received = Arc::new(Mutex::new(None));
    let slot = received.clone();
    session
        .enable_marker_insertion(move |_, cancel| *slot.lock() = Some(cancel))
        .expect("arming failed");
    session.handle_click(MapPosition::new(1.0, 1.0));
    drop(session);
    drop(engine);

    let cancel = received.lock().take().expect("callback not called");
    assert!(matches!(cancel.cancel(), Err(MapError::SessionClosed)));
}

#[test]
fn rearming_insertion_replaces_callback() {
    let Fixture { session, .. } = initialized();
    let calls = Arc::new(Mutex::new(vec![]));

    let first = calls.clone();
    session
        .enable_marker_insertion(move |_, _| first.lock().push("first"))
        .expect("arming failed");
    let second = calls.clone();
    session
        .enable_marker_insertion(move |_, _| second.lock().push("second"))
        .expect("arming failed");

    session.handle_click(MapPosition::new(1.0, 1.0));
    assert_eq!(*calls.lock(), vec!["second"]);
    assert_eq!(session.markers().len(), 1);
}

#[test]
fn disable_marker_insertion() {
    let Fixture { session, .. } = initialized();

    session.disable_marker_insertion();
    assert_eq!(session.draw_state(), DrawState::Idle);

    session
        .enable_marker_insertion(|_, _| panic!("disarmed callback called"))
        .expect("arming failed");
    session.disable_marker_insertion();

    assert_eq!(session.draw_state(), DrawState::Idle);
    assert!(!session.handle_click(MapPosition::new(1.0, 1.0)));
    assert!(session.markers().is_empty());
}

#[test]
fn free_draw_is_single_shot() {
    let Fixture {
        session, engine, ..
    } = initialized();
    let drawn = Arc::new(Mutex::new(vec![]));
    let slot = drawn.clone();
    session
        .enable_free_draw(move |position| slot.lock().push(position))
        .expect("arming failed");

    assert_eq!(session.draw_state(), DrawState::FreeDrawArmed);
    assert_eq!(engine.interactions().len(), 1);

    let clicked = MapPosition::new(3.0, 4.0);
    assert!(session.handle_click(clicked));
    assert!(!session.handle_click(MapPosition::new(5.0, 6.0)));

    assert_eq!(*drawn.lock(), vec![clicked]);
    assert_eq!(engine.drawn_points(), vec![projection::project(&clicked)]);
    assert_eq!(session.draw_state(), DrawState::Idle);
    assert!(engine.interactions().is_empty());
    assert!(session.markers().is_empty());
}

#[test]
fn rearming_free_draw_keeps_only_second_callback() {
    let Fixture {
        session, engine, ..
    } = initialized();
    let calls = Arc::new(Mutex::new(vec![]));

    let first = calls.clone();
    session
        .enable_free_draw(move |_| first.lock().push("first"))
        .expect("arming failed");
    let second = calls.clone();
    session
        .enable_free_draw(move |_| second.lock().push("second"))
        .expect("arming failed");
    assert_eq!(engine.interactions().len(), 1);

    session.handle_click(MapPosition::new(1.0, 1.0));
    assert_eq!(*calls.lock(), vec!["second"]);
    assert!(engine.interactions().is_empty());
}

#[test]
fn disable_free_draw_removes_interaction() {
    let Fixture {
        session, engine, ..
    } = initialized();
    session.disable_free_draw();

    session
        .enable_free_draw(|_| panic!("disarmed callback called"))
        .expect("arming failed");
    session.disable_free_draw();

    assert_eq!(session.draw_state(), DrawState::Idle);
    assert!(engine.interactions().is_empty());
    assert!(!session.handle_click(MapPosition::new(1.0, 1.0)));
}

#[test]
fn draw_modes_are_exclusive() {
    let Fixture {
        session, engine, ..
    } = initialized();

    session.enable_free_draw(|_| {}).expect("arming failed");
    assert!(matches!(
        session.enable_marker_insertion(|_, _| {}),
        Err(MapError::DrawModeBusy {
            active: DrawState::FreeDrawArmed
        })
    ));
    session.disable_marker_insertion();
    assert_eq!(session.draw_state(), DrawState::FreeDrawArmed);

    session.handle_click(MapPosition::new(1.0, 1.0));
    session.enable_marker_insertion(|_, _| {}).expect("arming failed");
    assert!(matches!(
        session.enable_free_draw(|_| {}),
        Err(MapError::DrawModeBusy {
            active: DrawState::InsertArmed
        })
    ));
    session.disable_free_draw();
    assert_eq!(session.draw_state(), DrawState::InsertArmed);
    assert!(engine.interactions().is_empty());
}

#[test]
fn session_with_file_store() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let config = MapConfig {
        storage_path: Some(dir.path().join("state.json")),
        ..Default::default()
    };

    let session =
        MapSession::with_config_store(HeadlessEngine::new(), config.clone()).expect("open failed");
    session.initialize("map", 0.0, 0.0);
    session.update_position(1.5, 2.5).expect("update failed");
    drop(session);

    let restored =
        MapSession::with_config_store(HeadlessEngine::new(), config).expect("open failed");
    assert_eq!(
        restored.last_known_position().expect("read failed"),
        Some(MapPosition::new(1.5, 2.5))
    );
}

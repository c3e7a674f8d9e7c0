//! The map session.

use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::cluster::ClusterLayer;
use crate::config::MapConfig;
use crate::draw::{DrawCallback, DrawMode, DrawState, InsertCallback};
use crate::engine::{LayerId, MapEngine, ViewState};
use crate::error::{MapError, StorageError};
use crate::geolocation::{AccuracyGeometry, GeolocationFix, TrackingOptions};
use crate::position::{MapPosition, MarkerData};
use crate::projection;
use crate::storage::{KeyValueStore, LAST_POSITION_KEY};
use crate::symbol::UserPositionSymbol;

/// Length of the view transition to a new device position.
pub const VIEW_ANIMATION_DURATION: Duration = Duration::from_millis(2000);

type InitCallback = Box<dyn FnOnce() + Send>;

struct SessionState {
    engine: Box<dyn MapEngine + Send>,
    config: MapConfig,
    initialized: bool,
    on_initialized: Option<InitCallback>,
    markers: Vec<MarkerData>,
    cluster_layer: Option<LayerId>,
    draw_mode: DrawMode,
}

impl SessionState {
    fn ensure_initialized(&self) -> Result<(), MapError> {
        if self.initialized {
            Ok(())
        } else {
            Err(MapError::NotInitialized)
        }
    }

    /// Swaps the shown marker set for `markers`, disposing of the previous layer.
    fn replace_markers(&mut self, markers: Vec<MarkerData>) {
        if let Some(previous) = self.cluster_layer.take() {
            self.engine.remove_layer(previous);
        }

        debug!("Showing {} markers", markers.len());
        let layer = Arc::new(ClusterLayer::new(markers.clone()));
        self.cluster_layer = Some(self.engine.add_cluster_layer(layer));
        self.markers = markers;
    }
}

/// A single map view and everything shown on it.
///
/// The session is a cheap handle: clones refer to the same map. Callbacks
/// passed to the session are never called while its state is locked, so they
/// may use the session again.
#[derive(Clone)]
pub struct MapSession {
    state: Arc<Mutex<SessionState>>,
    store: Arc<dyn KeyValueStore + Send + Sync>,
}

impl MapSession {
    /// Creates a session drawing through `engine` and persisting into `store`.
    ///
    /// Nothing is shown until [`MapSession::initialize`] is called.
    pub fn new(
        engine: impl MapEngine + Send + 'static,
        store: Arc<dyn KeyValueStore + Send + Sync>,
        config: MapConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                engine: Box::new(engine),
                config,
                initialized: false,
                on_initialized: None,
                markers: vec![],
                cluster_layer: None,
                draw_mode: DrawMode::Idle,
            })),
            store,
        }
    }

    /// Creates a session with the store configured in `config`.
    pub fn with_config_store(
        engine: impl MapEngine + Send + 'static,
        config: MapConfig,
    ) -> Result<Self, StorageError> {
        let store = config.open_store()?;
        Ok(Self::new(engine, store, config))
    }

    /// Binds the map to a surface, centers it on the given coordinates and
    /// starts following the device position.
    ///
    /// The callback registered with [`MapSession::on_initialized`] is called
    /// once this succeeds. If the engine cannot bind the surface, the call is
    /// logged and ignored. Calls on an initialized session are ignored.
    pub fn initialize(&self, surface_id: &str, latitude: f64, longitude: f64) {
        let callback = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.initialized {
                warn!("Map session is already initialized. Second initialization call is ignored.");
                return;
            }

            let view = ViewState::new(
                projection::from_lon_lat(longitude, latitude),
                state.config.initial_zoom,
            );
            if let Err(err) = state.engine.bind_surface(surface_id, view) {
                warn!("Map session is not initialized: {err}");
                return;
            }

            state.engine.add_tile_layer(&state.config.tile_url);
            state.engine.start_tracking(TrackingOptions::HIGH_ACCURACY);
            state.initialized = true;

            info!("Map session bound to surface '{surface_id}' at ({latitude}, {longitude})");
            state.on_initialized.take()
        };

        if let Some(callback) = callback {
            callback();
        }
    }

    /// Registers the callback called once [`MapSession::initialize`] succeeds.
    ///
    /// Only the last registered callback is called. A callback registered after
    /// initialization is dropped without being called.
    pub fn on_initialized(&self, callback: impl FnOnce() + Send + 'static) {
        let mut state = self.state.lock();
        if state.initialized {
            debug!("Map session is already initialized, the callback is dropped");
            return;
        }

        state.on_initialized = Some(Box::new(callback));
    }

    /// Returns true after a successful [`MapSession::initialize`].
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Current view of the map.
    pub fn view(&self) -> Option<ViewState> {
        self.state.lock().engine.view()
    }

    /// Moves the device position to the given coordinates at the configured zoom.
    ///
    /// See [`MapSession::update_position_with_zoom`].
    pub fn update_position(&self, latitude: f64, longitude: f64) -> Result<(), MapError> {
        let zoom = self.state.lock().config.position_zoom;
        self.update_position_with_zoom(latitude, longitude, zoom)
    }

    /// Moves the device position marker and the view to the given coordinates
    /// and stores them as the last known position.
    ///
    /// The view and the marker use the coordinates shifted by
    /// [`projection::corrected_center`]; the stored position is the raw one.
    /// Does nothing before the session is initialized. Non-finite coordinates
    /// are rejected with [`MapError::InvalidPosition`].
    pub fn update_position_with_zoom(
        &self,
        latitude: f64,
        longitude: f64,
        zoom: f64,
    ) -> Result<(), MapError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(MapError::InvalidPosition {
                latitude,
                longitude,
            });
        }

        {
            let mut state = self.state.lock();
            if !state.initialized {
                debug!("Position update before initialization is ignored");
                return Ok(());
            }

            let center = projection::corrected_center(latitude, longitude);
            state.engine.set_accuracy(Some(AccuracyGeometry::Point(center)));
            state
                .engine
                .set_user_position(Some(center), UserPositionSymbol::default());
            state
                .engine
                .animate_view(ViewState::new(center, zoom), VIEW_ANIMATION_DURATION);
        }

        let value = serde_json::to_string(&MapPosition::new(latitude, longitude))?;
        self.store.set(LAST_POSITION_KEY, &value)?;
        Ok(())
    }

    /// Updates the accuracy indicator from a tracking fix.
    pub fn handle_geolocation(&self, fix: GeolocationFix) {
        let mut state = self.state.lock();
        if !state.initialized {
            return;
        }

        state.engine.set_accuracy(Some(AccuracyGeometry::from_fix(&fix)));
    }

    /// Position stored by the last [`MapSession::update_position`], in this or a
    /// previous run.
    pub fn last_known_position(&self) -> Result<Option<MapPosition>, MapError> {
        match self.store.get(LAST_POSITION_KEY)? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    /// Replaces the shown markers.
    ///
    /// The previous cluster layer is removed and a new one is built from
    /// scratch.
    pub fn set_markers(&self, markers: Vec<MarkerData>) -> Result<(), MapError> {
        let mut state = self.state.lock();
        state.ensure_initialized()?;
        state.replace_markers(markers);
        Ok(())
    }

    /// Markers currently shown.
    pub fn markers(&self) -> Vec<MarkerData> {
        self.state.lock().markers.clone()
    }

    /// Which draw mode is armed.
    pub fn draw_state(&self) -> DrawState {
        self.state.lock().draw_mode.state()
    }

    /// Arms free drawing: the next click places a point and calls `callback`
    /// with its position.
    ///
    /// Arming again before a click replaces the callback. Fails if marker
    /// insertion is armed.
    pub fn enable_free_draw(
        &self,
        callback: impl FnOnce(MapPosition) + Send + 'static,
    ) -> Result<(), MapError> {
        let _replaced = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            state.ensure_initialized()?;
            state.draw_mode.check_arm(DrawState::FreeDrawArmed)?;

            let replaced = state.draw_mode.take();
            if let DrawMode::FreeDraw { interaction, .. } = &replaced {
                debug!("Free draw re-armed, previous callback dropped");
                state.engine.remove_interaction(*interaction);
            }

            let on_draw: DrawCallback = Box::new(callback);
            state.draw_mode = DrawMode::FreeDraw {
                interaction: state.engine.add_draw_interaction(),
                on_draw,
            };
            replaced
        };

        Ok(())
    }

    /// Disarms free drawing. Does nothing if it is not armed.
    pub fn disable_free_draw(&self) {
        let _disarmed = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.draw_mode.state() != DrawState::FreeDrawArmed {
                return;
            }

            let disarmed = state.draw_mode.take();
            if let DrawMode::FreeDraw { interaction, .. } = &disarmed {
                state.engine.remove_interaction(*interaction);
            }
            disarmed
        };
    }

    /// Arms marker insertion: the next click appends a marker, shows the new
    /// marker set and calls `callback` with the position and a handle that
    /// takes the marker back.
    ///
    /// Arming again before a click replaces the callback. Fails if free
    /// drawing is armed.
    pub fn enable_marker_insertion(
        &self,
        callback: impl FnOnce(MapPosition, InsertionCancel) + Send + 'static,
    ) -> Result<(), MapError> {
        let _replaced = {
            let mut state = self.state.lock();
            state.ensure_initialized()?;
            state.draw_mode.check_arm(DrawState::InsertArmed)?;

            let on_insert: InsertCallback = Box::new(callback);
            std::mem::replace(&mut state.draw_mode, DrawMode::Insert { on_insert })
        };

        Ok(())
    }

    /// Disarms marker insertion. Does nothing if it is not armed.
    pub fn disable_marker_insertion(&self) {
        let _disarmed = {
            let mut state = self.state.lock();
            if state.draw_mode.state() != DrawState::InsertArmed {
                return;
            }

            state.draw_mode.take()
        };
    }

    /// Passes a map click to the armed draw mode.
    ///
    /// Returns true if the click was consumed. The mode is disarmed before its
    /// callback runs.
    pub fn handle_click(&self, position: MapPosition) -> bool {
        let action = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            match state.draw_mode.take() {
                DrawMode::Idle => return false,
                DrawMode::FreeDraw {
                    interaction,
                    on_draw,
                } => {
                    state.engine.remove_interaction(interaction);
                    state.engine.add_drawn_point(projection::project(&position));
                    ClickAction::Draw(on_draw)
                }
                DrawMode::Insert { on_insert } => {
                    let mut markers = state.markers.clone();
                    markers.push(position.into());
                    state.replace_markers(markers.clone());

                    let cancel = InsertionCancel {
                        state: Arc::downgrade(&self.state),
                        markers,
                    };
                    ClickAction::Insert(on_insert, cancel)
                }
            }
        };

        match action {
            ClickAction::Draw(on_draw) => on_draw(position),
            ClickAction::Insert(on_insert, cancel) => on_insert(position, cancel),
        }

        true
    }
}

impl std::fmt::Debug for MapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MapSession")
            .field("initialized", &state.initialized)
            .field("markers", &state.markers.len())
            .field("draw_mode", &state.draw_mode)
            .finish_non_exhaustive()
    }
}

enum ClickAction {
    Draw(DrawCallback),
    Insert(InsertCallback, InsertionCancel),
}

/// Takes back a marker added by marker insertion.
pub struct InsertionCancel {
    state: Weak<Mutex<SessionState>>,
    markers: Vec<MarkerData>,
}

impl InsertionCancel {
    /// Marker this handle takes back.
    pub fn marker(&self) -> Option<MarkerData> {
        self.markers.last().copied()
    }

    /// Shows the marker set as it was before the insertion.
    ///
    /// Markers set on the session after the insertion are replaced as well.
    pub fn cancel(mut self) -> Result<(), MapError> {
        let state = self.state.upgrade().ok_or(MapError::SessionClosed)?;
        self.markers.pop();
        state.lock().replace_markers(self.markers);
        Ok(())
    }
}

impl std::fmt::Debug for InsertionCancel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsertionCancel")
            .field("marker", &self.marker())
            .finish_non_exhaustive()
    }
}

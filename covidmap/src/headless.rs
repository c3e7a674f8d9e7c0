//! In-memory map engine.
//!
//! [`HeadlessEngine`] keeps the whole map state (view, layers, interactions,
//! device position) without drawing anything. It is used by hosts that render
//! the state themselves and by the test suite. Clones share the same state, so
//! a host can hand one clone to the session and keep another to read from.

use std::sync::Arc;
use std::time::Duration;

use galileo_types::cartesian::{CartesianPoint2d, Point2};
use parking_lot::Mutex;

use crate::cluster::ClusterLayer;
use crate::engine::{BindError, InteractionId, LayerId, MapEngine, ViewState};
use crate::geolocation::{AccuracyGeometry, TrackingOptions};
use crate::symbol::UserPositionSymbol;

/// View transition in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewAnimation {
    /// View when the animation started.
    pub from: ViewState,
    /// View at the end of the animation.
    pub to: ViewState,
    /// Total length of the animation.
    pub duration: Duration,
    started_at: web_time::Instant,
}

impl ViewAnimation {
    fn new(from: ViewState, to: ViewState, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            started_at: web_time::Instant::now(),
        }
    }

    /// Fraction of the animation that has elapsed, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let duration = self.duration.as_secs_f64();
        if duration <= 0.001 {
            return 1.0;
        }

        (self.started_at.elapsed().as_secs_f64() / duration).min(1.0)
    }

    /// Returns true if the target view has been reached.
    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }

    /// View at the current point of the animation.
    pub fn current(&self) -> ViewState {
        let k = self.progress();
        let lerp = |a: f64, b: f64| a + (b - a) * k;
        ViewState::new(
            Point2::new(
                lerp(self.from.center.x(), self.to.center.x()),
                lerp(self.from.center.y(), self.to.center.y()),
            ),
            lerp(self.from.zoom, self.to.zoom),
        )
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    surface: Option<String>,
    view: Option<ViewState>,
    animation: Option<ViewAnimation>,
    tile_layers: Vec<(LayerId, String)>,
    cluster_layers: Vec<(LayerId, Arc<ClusterLayer>)>,
    interactions: Vec<InteractionId>,
    drawn_points: Vec<Point2>,
    user_position: Option<(Point2, UserPositionSymbol)>,
    accuracy: Option<AccuracyGeometry>,
    tracking: Option<TrackingOptions>,
    next_id: u64,
    refuse_binding: bool,
}

impl HeadlessState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn current_view(&self) -> Option<ViewState> {
        match &self.animation {
            Some(animation) => Some(animation.current()),
            None => self.view,
        }
    }
}

/// Map engine that keeps its state in memory.
#[derive(Debug, Clone, Default)]
pub struct HeadlessEngine {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessEngine {
    /// Creates an engine that binds to any surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine that refuses every surface, like a host page without
    /// the target element.
    pub fn unbindable() -> Self {
        let engine = Self::default();
        engine.state.lock().refuse_binding = true;
        engine
    }

    /// Id of the bound surface.
    pub fn surface(&self) -> Option<String> {
        self.state.lock().surface.clone()
    }

    /// View the current animation leads to, or the current view.
    pub fn target_view(&self) -> Option<ViewState> {
        let state = self.state.lock();
        match &state.animation {
            Some(animation) => Some(animation.to),
            None => state.view,
        }
    }

    /// Animation in progress, if any.
    pub fn animation(&self) -> Option<ViewAnimation> {
        self.state.lock().animation
    }

    /// Advances the view animation. Returns true if the view is still moving
    /// and the host should draw another frame.
    pub fn animate(&self) -> bool {
        let mut state = self.state.lock();
        let Some(animation) = state.animation else {
            return false;
        };

        if animation.is_finished() {
            state.view = Some(animation.to);
            state.animation = None;
            false
        } else {
            state.view = Some(animation.current());
            true
        }
    }

    /// URL templates of the tile layers.
    pub fn tile_layers(&self) -> Vec<String> {
        self.state
            .lock()
            .tile_layers
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }

    /// Cluster layers currently on the map, in insertion order.
    pub fn cluster_layers(&self) -> Vec<(LayerId, Arc<ClusterLayer>)> {
        self.state.lock().cluster_layers.clone()
    }

    /// Active interactions.
    pub fn interactions(&self) -> Vec<InteractionId> {
        self.state.lock().interactions.clone()
    }

    /// Points drawn by the user, in drawing order.
    pub fn drawn_points(&self) -> Vec<Point2> {
        self.state.lock().drawn_points.clone()
    }

    /// Position of the device dot.
    pub fn user_position(&self) -> Option<Point2> {
        self.state.lock().user_position.map(|(position, _)| position)
    }

    /// Symbol the device dot is drawn with.
    pub fn user_position_symbol(&self) -> Option<UserPositionSymbol> {
        self.state.lock().user_position.map(|(_, symbol)| symbol)
    }

    /// Accuracy indicator around the device dot.
    pub fn accuracy(&self) -> Option<AccuracyGeometry> {
        self.state.lock().accuracy
    }

    /// Tracking options, `None` if tracking was not started.
    pub fn tracking(&self) -> Option<TrackingOptions> {
        self.state.lock().tracking
    }
}

impl MapEngine for HeadlessEngine {
    fn bind_surface(&mut self, surface_id: &str, view: ViewState) -> Result<(), BindError> {
        let mut state = self.state.lock();
        if state.refuse_binding {
            return Err(BindError {
                surface_id: surface_id.to_string(),
                reason: "surface does not exist".to_string(),
            });
        }

        state.surface = Some(surface_id.to_string());
        state.view = Some(view);
        state.animation = None;
        Ok(())
    }

    fn add_tile_layer(&mut self, url_template: &str) -> LayerId {
        let mut state = self.state.lock();
        let id = LayerId(state.next_id());
        state.tile_layers.push((id, url_template.to_string()));
        id
    }

    fn view(&self) -> Option<ViewState> {
        self.state.lock().current_view()
    }

    fn animate_view(&mut self, target: ViewState, duration: Duration) {
        let mut state = self.state.lock();
        let Some(from) = state.current_view() else {
            log::warn!("View animation requested before the surface is bound");
            return;
        };

        state.view = Some(from);
        state.animation = Some(ViewAnimation::new(from, target, duration));
    }

    fn set_user_position(&mut self, position: Option<Point2>, symbol: UserPositionSymbol) {
        self.state.lock().user_position = position.map(|position| (position, symbol));
    }

    fn set_accuracy(&mut self, geometry: Option<AccuracyGeometry>) {
        self.state.lock().accuracy = geometry;
    }

    fn add_cluster_layer(&mut self, layer: Arc<ClusterLayer>) -> LayerId {
        let mut state = self.state.lock();
        let id = LayerId(state.next_id());
        state.cluster_layers.push((id, layer));
        id
    }

    fn remove_layer(&mut self, id: LayerId) {
        let mut state = self.state.lock();
        state.cluster_layers.retain(|(layer_id, _)| *layer_id != id);
        state.tile_layers.retain(|(layer_id, _)| *layer_id != id);
    }

    fn add_draw_interaction(&mut self) -> InteractionId {
        let mut state = self.state.lock();
        let id = InteractionId(state.next_id());
        state.interactions.push(id);
        id
    }

    fn add_drawn_point(&mut self, point: Point2) {
        self.state.lock().drawn_points.push(point);
    }

    fn remove_interaction(&mut self, id: InteractionId) {
        self.state
            .lock()
            .interactions
            .retain(|interaction| *interaction != id);
    }

    fn start_tracking(&mut self, options: TrackingOptions) {
        self.state.lock().tracking = Some(options);
    }
}

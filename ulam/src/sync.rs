//! Keeping the primary and antipodal views mirrored.
//!
//! The two maps are symmetric: moving either one moves the other to the
//! antipodal center with the same zoom, pitch and bearing. Applying the
//! mirrored state to the second map makes that map report a move of its own,
//! which must not be mirrored back. [`ViewSynchronizer`] remembers the state
//! it last pushed to each view and swallows exactly that echo.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Tolerance used when matching a reported view against a pushed one.
const ECHO_TOLERANCE: f64 = 1e-9;

/// Default popup position on the primary map.
pub const DEFAULT_POPUP: GeoPoint = GeoPoint::new(50.0, -80.0);

/// One of the two paired views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewId {
    Primary,
    Antipodal,
}

impl ViewId {
    /// The view paired with this one.
    pub fn other(self) -> Self {
        match self {
            ViewId::Primary => ViewId::Antipodal,
            ViewId::Antipodal => ViewId::Primary,
        }
    }
}

/// Camera state of one map view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: GeoPoint,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

impl ViewState {
    /// The state the paired view should show: antipodal center, same camera.
    pub fn mirrored(&self) -> Self {
        Self {
            center: self.center.antipode(),
            ..*self
        }
    }

    fn matches(&self, other: &ViewState) -> bool {
        let mut dlng = (self.center.lng - other.center.lng).abs() % 360.0;
        if dlng > 180.0 {
            dlng = 360.0 - dlng;
        }
        (self.center.lat - other.center.lat).abs() <= ECHO_TOLERANCE
            && dlng <= ECHO_TOLERANCE
            && (self.zoom - other.zoom).abs() <= ECHO_TOLERANCE
            && (self.pitch - other.pitch).abs() <= ECHO_TOLERANCE
            && (self.bearing - other.bearing).abs() <= ECHO_TOLERANCE
    }
}

/// An instruction to move `target` to `state`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirrorCommand {
    pub target: ViewId,
    pub state: ViewState,
}

/// A map view that can be driven by the synchronizer.
pub trait MapView {
    fn set_view_state(&mut self, state: ViewState);
}

/// One-way mirroring between the two views with echo suppression.
#[derive(Debug, Clone, Default)]
pub struct ViewSynchronizer {
    pending_echo: Option<MirrorCommand>,
}

impl ViewSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a move reported by `source`.
    ///
    /// Returns the command to apply to the other view, or `None` when the
    /// move is the echo of the last mirrored state.
    pub fn on_move(&mut self, source: ViewId, state: ViewState) -> Option<MirrorCommand> {
        if let Some(pending) = self.pending_echo {
            if pending.target == source && pending.state.matches(&state) {
                self.pending_echo = None;
                return None;
            }
        }

        let command = MirrorCommand {
            target: source.other(),
            state: state.mirrored(),
        };
        self.pending_echo = Some(command);
        Some(command)
    }

    /// Handle a move and apply the resulting command to `target`.
    ///
    /// Returns true if `target` was updated.
    pub fn propagate<V: MapView>(&mut self, source: ViewId, state: ViewState, target: &mut V) -> bool {
        match self.on_move(source, state) {
            Some(command) => {
                target.set_view_state(command.state);
                true
            }
            None => false,
        }
    }

    /// Whether a mirrored state is still waiting for its echo.
    pub fn has_pending_echo(&self) -> bool {
        self.pending_echo.is_some()
    }
}

/// Positions of the two popups, always antipodal to each other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopupPair {
    primary: GeoPoint,
    antipodal: GeoPoint,
}

impl Default for PopupPair {
    fn default() -> Self {
        Self::at(DEFAULT_POPUP)
    }
}

impl PopupPair {
    /// Popups with the primary one at `point`.
    pub fn at(point: GeoPoint) -> Self {
        Self {
            primary: point,
            antipodal: point.antipode(),
        }
    }

    /// Move the popup of `view` to the cursor and the other one to its antipode.
    pub fn cursor_moved(&mut self, view: ViewId, point: GeoPoint) {
        match view {
            ViewId::Primary => {
                self.primary = point;
                self.antipodal = point.antipode();
            }
            ViewId::Antipodal => {
                self.antipodal = point;
                self.primary = point.antipode();
            }
        }
    }

    /// Popup position on the primary view.
    pub fn primary(&self) -> GeoPoint {
        self.primary
    }

    /// Popup position on the antipodal view.
    pub fn antipodal(&self) -> GeoPoint {
        self.antipodal
    }

    /// Popup position on `view`.
    pub fn position(&self, view: ViewId) -> GeoPoint {
        match view {
            ViewId::Primary => self.primary,
            ViewId::Antipodal => self.antipodal,
        }
    }
}

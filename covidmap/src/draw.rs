//! Interactive draw modes.
//!
//! While a draw mode is armed, the next map click is consumed by it instead of
//! being treated as navigation. Only one mode can be armed at a time.

use crate::engine::InteractionId;
use crate::error::MapError;
use crate::position::MapPosition;
use crate::session::InsertionCancel;

/// Callback of the free draw mode, receives the clicked position.
pub type DrawCallback = Box<dyn FnOnce(MapPosition) + Send>;

/// Callback of the marker insertion mode, receives the inserted position and a
/// handle that removes the marker again.
pub type InsertCallback = Box<dyn FnOnce(MapPosition, InsertionCancel) + Send>;

/// Which draw mode is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawState {
    /// Clicks are navigation.
    #[default]
    Idle,
    /// Next click places a free point.
    FreeDrawArmed,
    /// Next click inserts a marker.
    InsertArmed,
}

/// Armed mode together with its single-shot subscription.
#[derive(Default)]
pub(crate) enum DrawMode {
    #[default]
    Idle,
    FreeDraw {
        interaction: InteractionId,
        on_draw: DrawCallback,
    },
    Insert {
        on_insert: InsertCallback,
    },
}

impl DrawMode {
    pub(crate) fn state(&self) -> DrawState {
        match self {
            Self::Idle => DrawState::Idle,
            Self::FreeDraw { .. } => DrawState::FreeDrawArmed,
            Self::Insert { .. } => DrawState::InsertArmed,
        }
    }

    /// Checks that `requested` may be armed now.
    ///
    /// Re-arming the mode that is already armed is allowed and replaces its
    /// callback. Arming a different mode is not.
    pub(crate) fn check_arm(&self, requested: DrawState) -> Result<(), MapError> {
        match self.state() {
            DrawState::Idle => Ok(()),
            active if active == requested => Ok(()),
            active => Err(MapError::DrawModeBusy { active }),
        }
    }

    /// Disarms the mode and returns what was armed.
    pub(crate) fn take(&mut self) -> DrawMode {
        std::mem::take(self)
    }
}

impl std::fmt::Debug for DrawMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_mode() -> DrawMode {
        DrawMode::Insert {
            on_insert: Box::new(|_, _| {}),
        }
    }

    #[test]
    fn idle_accepts_any_mode() {
        let mode = DrawMode::Idle;
        assert!(mode.check_arm(DrawState::FreeDrawArmed).is_ok());
        assert!(mode.check_arm(DrawState::InsertArmed).is_ok());
    }

    #[test]
    fn same_mode_can_be_rearmed() {
        assert!(insert_mode().check_arm(DrawState::InsertArmed).is_ok());
    }

    #[test]
    fn other_mode_is_rejected() {
        let result = insert_mode().check_arm(DrawState::FreeDrawArmed);
        assert!(matches!(
            result,
            Err(MapError::DrawModeBusy {
                active: DrawState::InsertArmed
            })
        ));
    }

    #[test]
    fn take_leaves_idle() {
        let mut mode = insert_mode();
        let taken = mode.take();

        assert_eq!(taken.state(), DrawState::InsertArmed);
        assert_eq!(mode.state(), DrawState::Idle);
    }
}

//! Execution mode - the process-wide safe/unsafe switch
//!
//! The mode only changes through an explicit call. Evaluating or executing
//! a request never toggles it.

use parking_lot::RwLock;
use riskgate_core::Mode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Outcome of a mode change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeTransition {
    pub previous: Mode,
    pub current: Mode,
}

impl ModeTransition {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Shared holder of the current mode
#[derive(Debug, Default)]
pub struct ModeController {
    mode: RwLock<Mode>,
}

impl ModeController {
    pub fn new(initial: Mode) -> Self {
        Self {
            mode: RwLock::new(initial),
        }
    }

    pub fn current(&self) -> Mode {
        *self.mode.read()
    }

    pub fn is_unsafe(&self) -> bool {
        self.current().is_unsafe()
    }

    /// Switch to `mode`; setting the current mode again is a no-op
    pub fn set_mode(&self, mode: Mode) -> ModeTransition {
        let previous = {
            let mut guard = self.mode.write();
            std::mem::replace(&mut *guard, mode)
        };

        let transition = ModeTransition {
            previous,
            current: mode,
        };
        if transition.changed() {
            match mode {
                Mode::Unsafe => warn!("Unsafe mode enabled: write operations are permitted"),
                Mode::Safe => info!("Safe mode restored: only read operations are permitted"),
            }
        }
        transition
    }

    pub fn enable_unsafe(&self) -> ModeTransition {
        self.set_mode(Mode::Unsafe)
    }

    pub fn enable_safe(&self) -> ModeTransition {
        self.set_mode(Mode::Safe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_safe() {
        let controller = ModeController::default();
        assert_eq!(controller.current(), Mode::Safe);
        assert!(!controller.is_unsafe());
    }

    #[test]
    fn test_transitions() {
        let controller = ModeController::new(Mode::Safe);

        let t = controller.enable_unsafe();
        assert_eq!(t.previous, Mode::Safe);
        assert_eq!(t.current, Mode::Unsafe);
        assert!(t.changed());

        let t = controller.enable_unsafe();
        assert!(!t.changed());
        assert_eq!(controller.current(), Mode::Unsafe);

        let t = controller.enable_safe();
        assert!(t.changed());
        assert_eq!(controller.current(), Mode::Safe);
    }
}

use thiserror::Error;

use crate::state::{MAX_WINDOWS, MIN_WINDOWS};
use crate::{ArchitecturalState, RunState, TrapQueue, TrapType};

/// Number of register windows used when no configuration is supplied.
pub const DEFAULT_WINDOWS: u8 = 32;

/// Top-level immutable configuration for a core instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoreConfig {
    /// Number of register windows (`NWIN`), between 2 and 32.
    pub windows: u8,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            windows: DEFAULT_WINDOWS,
        }
    }
}

impl CoreConfig {
    /// Checks that the configuration describes a buildable core.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WindowCount`] when `windows` is outside 2..=32.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.windows < MIN_WINDOWS || self.windows > MAX_WINDOWS {
            return Err(ConfigError::WindowCount {
                windows: self.windows,
            });
        }
        Ok(())
    }
}

/// Rejected core configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// Window count outside the architectural range.
    #[error("{windows} register windows requested, expected 2..=32")]
    WindowCount {
        /// Requested window count.
        windows: u8,
    },
}

/// Complete simulator-visible core state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreState {
    /// Architectural registers and PC triple.
    pub arch: ArchitecturalState,
    /// Pending traps.
    pub traps: TrapQueue,
    /// Set by the executing instruction to skip its delay slot.
    pub annul: bool,
    /// Current execution state.
    pub run_state: RunState,
}

impl Default for CoreState {
    fn default() -> Self {
        Self::with_config(&CoreConfig::default())
    }
}

impl CoreState {
    /// Builds zeroed state sized for `config`.
    #[must_use]
    pub fn with_config(config: &CoreConfig) -> Self {
        Self {
            arch: ArchitecturalState::new(config.windows),
            traps: TrapQueue::new(),
            annul: false,
            run_state: RunState::Normal,
        }
    }

    /// Queues `trap` for delivery at the end of the current instruction.
    pub fn raise(&mut self, trap: TrapType) {
        self.traps.raise(trap);
        if !self.run_state.is_error() {
            self.run_state = RunState::TrapPending;
        }
    }
}

/// Result of one completed `exec` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// The instruction retired and the pipeline advanced.
    Retired,
    /// A trap was delivered; the next instruction is the handler's first.
    TrapTaken {
        /// Delivered trap.
        trap: TrapType,
    },
    /// A pending reset rebooted the core at its last entry point.
    Reset,
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, CoreState, DEFAULT_WINDOWS};
    use crate::{RunState, TrapType};
    use rstest::rstest;

    #[rstest]
    #[case(1, false)]
    #[case(2, true)]
    #[case(8, true)]
    #[case(32, true)]
    #[case(33, false)]
    fn window_count_is_validated(#[case] windows: u8, #[case] valid: bool) {
        let result = CoreConfig { windows }.validate();
        if valid {
            assert_eq!(result, Ok(()));
        } else {
            assert_eq!(result, Err(ConfigError::WindowCount { windows }));
        }
    }

    #[test]
    fn default_state_uses_default_window_count() {
        let state = CoreState::default();
        assert_eq!(state.arch.registers().nwindows(), DEFAULT_WINDOWS);
        assert_eq!(state.run_state, RunState::Normal);
        assert!(state.traps.is_empty());
    }

    #[test]
    fn raising_a_trap_marks_it_pending() {
        let mut state = CoreState::default();
        state.raise(TrapType::TagOverflow);
        assert!(state.traps.is_pending(TrapType::TagOverflow));
        assert_eq!(state.run_state, RunState::TrapPending);
    }
}

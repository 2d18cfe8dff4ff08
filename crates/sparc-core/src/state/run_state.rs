use crate::TrapType;

/// Execution-state machine of the pipeline controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Executing normally with no pending trap.
    #[default]
    Normal,
    /// At least one trap is pending and will be considered after the next instruction.
    TrapPending,
    /// A synchronous trap arrived with traps disabled; no further progress is possible.
    Error(TrapType),
}

impl RunState {
    /// Returns the trap that forced error mode, if any.
    #[must_use]
    pub const fn error_trap(self) -> Option<TrapType> {
        match self {
            Self::Error(trap) => Some(trap),
            Self::Normal | Self::TrapPending => None,
        }
    }

    /// Returns `true` once error mode has been entered.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error(_))
    }
}

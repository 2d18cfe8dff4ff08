use thiserror::Error;

use crate::{BusError, TrapType};

/// Host-level failure that aborts a pipeline stage.
///
/// Architectural exceptions never surface here: they are queued as traps and
/// delivered at the end of `exec`. A `CpuError` means the simulation itself
/// cannot continue the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CpuError {
    /// A pipeline stage ran before `boot`.
    #[error("cpu has not been booted")]
    NotBooted,
    /// The instruction fetch device rejected the access.
    #[error("instruction fetch at {addr:#010x} failed")]
    Fetch {
        /// Fetch address.
        addr: u32,
        /// Device error.
        #[source]
        source: BusError,
    },
    /// A load or store hit a host bus error.
    #[error("data access failed")]
    Memory(#[from] BusError),
    /// The first handler instruction could not be fetched during trap entry.
    #[error("fetch of {trap} handler at {vector:#010x} failed")]
    TrapVector {
        /// Trap being delivered.
        trap: TrapType,
        /// Handler address taken from `TBR`.
        vector: u32,
        /// Device error.
        #[source]
        source: BusError,
    },
    /// A synchronous trap arrived while traps were disabled.
    #[error("processor entered error mode on {trap}")]
    ErrorMode {
        /// Trap that could not be delivered.
        trap: TrapType,
    },
}

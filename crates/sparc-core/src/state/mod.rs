//! Architectural CPU state model primitives.

/// Special registers, condition codes and the PC triple.
pub mod registers;
/// Run-state machine of the pipeline controller.
pub mod run_state;
/// Windowed integer register file.
pub mod window;

pub use registers::{ArchitecturalState, ConditionCodes};
pub use run_state::RunState;
pub use window::{physical_slot, RegisterFile, RegisterSlot, MAX_WINDOWS, MIN_WINDOWS};

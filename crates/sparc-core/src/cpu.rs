//! Pipeline controller: boot, fetch, decode, execute and trap delivery.
//!
//! The controller keeps a two-entry pipeline register. Slot 0 holds the word
//! at `PC` (being executed), slot 1 the word at `nPC` (the delay slot). After
//! every `exec` the pending trap queue is consulted; if nothing is delivered
//! slot 1 moves into slot 0 and the PC triple advances.

use crate::decoder::{DecodeError, DecodedInstruction};
use crate::execute::execute_instruction;
use crate::state::registers::{REG_L1, REG_L2};
use crate::{
    AddressSpaces, ArchitecturalState, Bus, ConditionCodes, ConfigError, CoreConfig, CoreState,
    CpuError, Decoder, RunState, StepOutcome, TrapQueue, TrapType,
};

/// One simulated SPARC V8 integer unit bound to its address spaces.
#[derive(Debug)]
pub struct Cpu {
    config: CoreConfig,
    state: CoreState,
    spaces: AddressSpaces,
    pipeline: [u32; 2],
    staged: Option<Result<DecodedInstruction, DecodeError>>,
    fetched: bool,
    entry: Option<u32>,
}

impl Cpu {
    /// Builds a core whose standard address spaces resolve to `memory`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` is invalid.
    pub fn new(config: CoreConfig, memory: Box<dyn Bus>) -> Result<Self, ConfigError> {
        Self::with_spaces(config, AddressSpaces::new(memory))
    }

    /// Builds a core over a prepared address space registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` is invalid.
    pub fn with_spaces(config: CoreConfig, spaces: AddressSpaces) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: CoreState::with_config(&config),
            spaces,
            pipeline: [0; 2],
            staged: None,
            fetched: false,
            entry: None,
        })
    }

    /// Configuration the core was built with.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Resets the pipeline and starts execution at `entry` in supervisor mode.
    ///
    /// Pending traps are dropped and error mode is left.
    ///
    /// # Errors
    ///
    /// Returns [`CpuError::Fetch`] when the word at `entry` cannot be fetched.
    pub fn boot(&mut self, entry: u32) -> Result<(), CpuError> {
        let arch = &mut self.state.arch;
        arch.set_pc_triple(entry, entry.wrapping_add(4), entry.wrapping_add(8));
        arch.set_supervisor(true);
        arch.set_traps_enabled(false);
        self.state.traps.clear();
        self.state.annul = false;
        self.state.run_state = RunState::Normal;
        self.staged = None;
        self.fetched = false;
        self.entry = Some(entry);
        self.pipeline[0] = self.fetch_word(entry)?;
        tracing::debug!(entry = format_args!("{entry:#010x}"), "booted");
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), CpuError> {
        if self.entry.is_none() {
            return Err(CpuError::NotBooted);
        }
        match self.state.run_state {
            RunState::Error(trap) => Err(CpuError::ErrorMode { trap }),
            RunState::Normal | RunState::TrapPending => Ok(()),
        }
    }

    fn fetch_word(&mut self, addr: u32) -> Result<u32, CpuError> {
        self.spaces
            .instruction(self.state.arch.supervisor())
            .and_then(|bus| bus.fetch32(addr))
            .map_err(|source| CpuError::Fetch { addr, source })
    }

    /// Fetch stage: loads the delay-slot word at `nPC` into pipeline slot 1.
    ///
    /// # Errors
    ///
    /// Returns [`CpuError::NotBooted`], [`CpuError::ErrorMode`] or
    /// [`CpuError::Fetch`].
    pub fn fetch(&mut self) -> Result<(), CpuError> {
        self.ensure_running()?;
        self.pipeline[1] = self.fetch_word(self.state.arch.npc())?;
        self.fetched = true;
        Ok(())
    }

    /// Decode stage: decodes pipeline slot 0.
    ///
    /// # Errors
    ///
    /// Returns [`CpuError::NotBooted`] or [`CpuError::ErrorMode`]. Invalid
    /// encodings are not an error here; they trap when executed.
    pub fn decode(&mut self) -> Result<(), CpuError> {
        self.ensure_running()?;
        self.staged = Some(Decoder::decode(self.pipeline[0]));
        Ok(())
    }

    /// Execute stage: runs slot 0, applies annulment, delivers the highest
    /// pending trap and advances the pipeline.
    ///
    /// Missing fetch or decode stages are performed first.
    ///
    /// # Errors
    ///
    /// Returns [`CpuError::ErrorMode`] when a trap arrives with traps
    /// disabled, and bus errors from data accesses or fetches.
    pub fn exec(&mut self) -> Result<StepOutcome, CpuError> {
        self.ensure_running()?;
        if !self.fetched {
            self.fetch()?;
        }
        let decoded = self
            .staged
            .take()
            .unwrap_or_else(|| Decoder::decode(self.pipeline[0]));
        let pc = self.state.arch.pc();
        match &decoded {
            Ok(instr) => tracing::trace!(pc = format_args!("{pc:#010x}"), "{instr}"),
            Err(err) => tracing::trace!(pc = format_args!("{pc:#010x}"), "{err}"),
        }
        execute_instruction(&mut self.state, &mut self.spaces, decoded)?;
        self.fetched = false;

        if self.state.annul {
            self.state.annul = false;
            self.state.arch.annul_delay_slot();
            self.pipeline[1] = self.fetch_word(self.state.arch.npc())?;
        }

        let outcome = self.deliver_trap()?;
        if outcome == StepOutcome::Reset {
            return Ok(outcome);
        }
        self.pipeline[0] = self.pipeline[1];
        self.state.arch.advance();
        self.state.run_state = if self.state.traps.is_empty() {
            RunState::Normal
        } else {
            RunState::TrapPending
        };
        Ok(outcome)
    }

    /// Runs fetch, decode and execute for one instruction.
    ///
    /// # Errors
    ///
    /// See [`Self::exec`].
    pub fn step(&mut self) -> Result<StepOutcome, CpuError> {
        self.fetch()?;
        self.decode()?;
        self.exec()
    }

    fn deliver_trap(&mut self) -> Result<StepOutcome, CpuError> {
        let Some(trap) = self.state.traps.highest() else {
            return Ok(StepOutcome::Retired);
        };
        if trap == TrapType::Reset {
            let entry = self.entry.unwrap_or_default();
            tracing::debug!("reset requested");
            self.boot(entry)?;
            return Ok(StepOutcome::Reset);
        }
        if !trap.is_interrupt() && !self.state.arch.traps_enabled() {
            tracing::warn!(
                %trap,
                pc = format_args!("{:#010x}", self.state.arch.pc()),
                "trap with traps disabled, entering error mode"
            );
            self.state.run_state = RunState::Error(trap);
            return Err(CpuError::ErrorMode { trap });
        }

        let arch = &mut self.state.arch;
        let (pc, npc) = (arch.pc(), arch.npc());
        arch.set_traps_enabled(false);
        let supervisor = arch.supervisor();
        arch.set_previous_supervisor(supervisor);
        arch.set_supervisor(true);
        arch.registers_mut().save_unchecked();
        arch.set_reg(REG_L1, pc);
        arch.set_reg(REG_L2, npc);
        arch.set_trap_type(trap.tt());
        let vector = arch.tbr();
        arch.redirect(vector);
        self.pipeline[1] = self
            .fetch_word(vector)
            .map_err(|err| match err {
                CpuError::Fetch { source, .. } => CpuError::TrapVector {
                    trap,
                    vector,
                    source,
                },
                other => other,
            })?;
        self.state.traps.acknowledge(trap);
        tracing::debug!(
            %trap,
            tt = trap.tt(),
            vector = format_args!("{vector:#010x}"),
            cwp = self.state.arch.cwp(),
            "trap taken"
        );
        Ok(StepOutcome::TrapTaken { trap })
    }

    /// Queues an external interrupt at `level` (1..=15).
    ///
    /// Returns `false` for levels outside that range.
    pub fn raise_interrupt(&mut self, level: u8) -> bool {
        TrapType::interrupt(level).is_some_and(|trap| {
            self.state.raise(trap);
            true
        })
    }

    /// Queues a reset; the next `exec` reboots at the last entry point.
    pub fn request_reset(&mut self) {
        self.state.raise(TrapType::Reset);
    }

    /// Registers `device` for alternate-space accesses to `asi`.
    pub fn register_address_space(&mut self, asi: u8, device: Box<dyn Bus>) -> Option<Box<dyn Bus>> {
        self.spaces.register(asi, device)
    }

    /// Address space registry.
    pub fn spaces_mut(&mut self) -> &mut AddressSpaces {
        &mut self.spaces
    }

    /// Main memory device.
    pub fn memory(&mut self) -> &mut dyn Bus {
        self.spaces.memory()
    }

    /// Full simulator-visible state.
    #[must_use]
    pub const fn state(&self) -> &CoreState {
        &self.state
    }

    /// Mutable state for harnesses that preload registers.
    pub fn state_mut(&mut self) -> &mut CoreState {
        &mut self.state
    }

    /// Architectural registers.
    #[must_use]
    pub const fn arch(&self) -> &ArchitecturalState {
        &self.state.arch
    }

    /// Reads integer register `idx` in the current window.
    #[must_use]
    pub fn reg(&self, idx: u8) -> u32 {
        self.state.arch.reg(idx)
    }

    /// Integer condition codes.
    #[must_use]
    pub const fn icc(&self) -> ConditionCodes {
        self.state.arch.icc()
    }

    /// Address of the next instruction to execute.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.state.arch.pc()
    }

    /// Address of the following instruction.
    #[must_use]
    pub const fn npc(&self) -> u32 {
        self.state.arch.npc()
    }

    /// Multiply/divide register `Y`.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.state.arch.y()
    }

    /// Processor state register.
    #[must_use]
    pub const fn psr(&self) -> u32 {
        self.state.arch.psr()
    }

    /// Window invalid mask.
    #[must_use]
    pub const fn wim(&self) -> u32 {
        self.state.arch.wim()
    }

    /// Trap base register.
    #[must_use]
    pub const fn tbr(&self) -> u32 {
        self.state.arch.tbr()
    }

    /// Current execution state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.state.run_state
    }

    /// Pending trap set.
    #[must_use]
    pub const fn pending_traps(&self) -> &TrapQueue {
        &self.state.traps
    }
}

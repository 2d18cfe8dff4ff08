use super::window::RegisterFile;

/// `PSR` bit for a negative result.
pub const PSR_ICC_N: u32 = 1 << 23;
/// `PSR` bit for a zero result.
pub const PSR_ICC_Z: u32 = 1 << 22;
/// `PSR` bit for signed overflow.
pub const PSR_ICC_V: u32 = 1 << 21;
/// `PSR` bit for carry/borrow.
pub const PSR_ICC_C: u32 = 1 << 20;
/// Mask of the integer condition code field.
pub const PSR_ICC_MASK: u32 = PSR_ICC_N | PSR_ICC_Z | PSR_ICC_V | PSR_ICC_C;
/// Coprocessor enable; hard-wired to zero.
pub const PSR_EC: u32 = 1 << 13;
/// FPU enable; hard-wired to zero.
pub const PSR_EF: u32 = 1 << 12;
/// Processor interrupt level field.
pub const PSR_PIL_MASK: u32 = 0xF << 8;
/// Supervisor mode.
pub const PSR_S: u32 = 1 << 7;
/// Supervisor mode before the most recent trap.
pub const PSR_PS: u32 = 1 << 6;
/// Traps enabled.
pub const PSR_ET: u32 = 1 << 5;
/// Current window pointer field.
pub const PSR_CWP_MASK: u32 = 0x1F;
/// Bits software can change through `WRPSR`.
pub const PSR_WRITABLE_MASK: u32 =
    PSR_ICC_MASK | PSR_PIL_MASK | PSR_S | PSR_PS | PSR_ET | PSR_CWP_MASK;

/// Trap base address field of `TBR`.
pub const TBR_TBA_MASK: u32 = 0xFFFF_F000;
/// Trap type field of `TBR`.
pub const TBR_TT_MASK: u32 = 0x0000_0FF0;
/// Bit position of the `TBR` trap type field.
pub const TBR_TT_SHIFT: u32 = 4;

/// Number of ancillary state registers (`ASR0` is `Y`).
pub const ASR_COUNT: usize = 32;

/// `%o7`, the `CALL` link register.
pub const REG_O7: u8 = 15;
/// `%l1`, receives the trapped `PC`.
pub const REG_L1: u8 = 17;
/// `%l2`, receives the trapped `nPC`.
pub const REG_L2: u8 = 18;

/// Integer condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ConditionCodes {
    /// Negative.
    pub n: bool,
    /// Zero.
    pub z: bool,
    /// Overflow.
    pub v: bool,
    /// Carry.
    pub c: bool,
}

impl ConditionCodes {
    /// Extracts the condition codes from a `PSR` value.
    #[must_use]
    pub const fn from_psr(psr: u32) -> Self {
        Self {
            n: psr & PSR_ICC_N != 0,
            z: psr & PSR_ICC_Z != 0,
            v: psr & PSR_ICC_V != 0,
            c: psr & PSR_ICC_C != 0,
        }
    }

    /// Packs the condition codes into their `PSR` bit positions.
    #[must_use]
    pub const fn to_psr_bits(self) -> u32 {
        let mut bits = 0;
        if self.n {
            bits |= PSR_ICC_N;
        }
        if self.z {
            bits |= PSR_ICC_Z;
        }
        if self.v {
            bits |= PSR_ICC_V;
        }
        if self.c {
            bits |= PSR_ICC_C;
        }
        bits
    }
}

/// Architecturally visible integer-unit state.
///
/// `PSR.CWP` and `WIM` live in the [`RegisterFile`]; [`Self::psr`] reassembles
/// the full register.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ArchitecturalState {
    registers: RegisterFile,
    psr: u32,
    tbr: u32,
    y: u32,
    asr: [u32; ASR_COUNT],
    pc: u32,
    npc: u32,
    npc2: u32,
}

impl ArchitecturalState {
    /// Creates zeroed state with `nwindows` register windows.
    #[must_use]
    pub fn new(nwindows: u8) -> Self {
        Self {
            registers: RegisterFile::new(nwindows),
            psr: 0,
            tbr: 0,
            y: 0,
            asr: [0; ASR_COUNT],
            pc: 0,
            npc: 0,
            npc2: 0,
        }
    }

    /// Register file and window manager.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Mutable register file and window manager.
    pub const fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// Reads `r[idx]` in the current window.
    #[must_use]
    pub fn reg(&self, idx: u8) -> u32 {
        self.registers.get(idx)
    }

    /// Writes `r[idx]` in the current window.
    pub fn set_reg(&mut self, idx: u8, value: u32) {
        self.registers.set(idx, value);
    }

    /// Full `PSR` value including `CWP`.
    #[must_use]
    pub const fn psr(&self) -> u32 {
        self.psr | self.registers.cwp() as u32
    }

    /// Replaces the writable `PSR` fields, including `CWP`.
    ///
    /// Callers validate the `CWP` field against the window count first.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_psr(&mut self, value: u32) {
        let value = value & PSR_WRITABLE_MASK;
        self.psr = value & !PSR_CWP_MASK;
        self.registers.set_cwp((value & PSR_CWP_MASK) as u8);
    }

    /// Integer condition codes.
    #[must_use]
    pub const fn icc(&self) -> ConditionCodes {
        ConditionCodes::from_psr(self.psr)
    }

    /// Replaces the integer condition codes.
    pub const fn set_icc(&mut self, icc: ConditionCodes) {
        self.psr = (self.psr & !PSR_ICC_MASK) | icc.to_psr_bits();
    }

    const fn flag(&self, mask: u32) -> bool {
        self.psr & mask != 0
    }

    const fn set_flag(&mut self, mask: u32, value: bool) {
        if value {
            self.psr |= mask;
        } else {
            self.psr &= !mask;
        }
    }

    /// `PSR.S`.
    #[must_use]
    pub const fn supervisor(&self) -> bool {
        self.flag(PSR_S)
    }

    /// Sets `PSR.S`.
    pub const fn set_supervisor(&mut self, value: bool) {
        self.set_flag(PSR_S, value);
    }

    /// `PSR.PS`.
    #[must_use]
    pub const fn previous_supervisor(&self) -> bool {
        self.flag(PSR_PS)
    }

    /// Sets `PSR.PS`.
    pub const fn set_previous_supervisor(&mut self, value: bool) {
        self.set_flag(PSR_PS, value);
    }

    /// `PSR.ET`.
    #[must_use]
    pub const fn traps_enabled(&self) -> bool {
        self.flag(PSR_ET)
    }

    /// Sets `PSR.ET`.
    pub const fn set_traps_enabled(&mut self, value: bool) {
        self.set_flag(PSR_ET, value);
    }

    /// Processor interrupt level (`PSR.PIL`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn pil(&self) -> u8 {
        ((self.psr & PSR_PIL_MASK) >> 8) as u8
    }

    /// Current window pointer.
    #[must_use]
    pub const fn cwp(&self) -> u8 {
        self.registers.cwp()
    }

    /// Window invalid mask.
    #[must_use]
    pub const fn wim(&self) -> u32 {
        self.registers.wim()
    }

    /// Writes the window invalid mask.
    pub fn set_wim(&mut self, value: u32) {
        self.registers.set_wim(value);
    }

    /// Trap base register (`TBA | tt << 4`); also the trap vector after trap entry.
    #[must_use]
    pub const fn tbr(&self) -> u32 {
        self.tbr
    }

    /// Writes the trap base address; `tt` is preserved.
    pub const fn set_tbr_base(&mut self, value: u32) {
        self.tbr = (value & TBR_TBA_MASK) | (self.tbr & TBR_TT_MASK);
    }

    /// Records the trap type of the trap being entered.
    pub const fn set_trap_type(&mut self, tt: u8) {
        self.tbr = (self.tbr & TBR_TBA_MASK) | ((tt as u32) << TBR_TT_SHIFT);
    }

    /// Trap type of the most recently entered trap.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn trap_type(&self) -> u8 {
        ((self.tbr & TBR_TT_MASK) >> TBR_TT_SHIFT) as u8
    }

    /// Multiply/divide register.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Writes `Y`.
    pub const fn set_y(&mut self, value: u32) {
        self.y = value;
    }

    /// Reads ancillary state register `n`; `ASR0` is `Y`.
    #[must_use]
    pub const fn asr(&self, n: u8) -> u32 {
        match n & 0x1F {
            0 => self.y,
            n => self.asr[n as usize],
        }
    }

    /// Writes ancillary state register `n`; `ASR0` is `Y`.
    pub const fn set_asr(&mut self, n: u8, value: u32) {
        match n & 0x1F {
            0 => self.y = value,
            n => self.asr[n as usize] = value,
        }
    }

    /// Address of the executing instruction.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Address of the delay-slot instruction.
    #[must_use]
    pub const fn npc(&self) -> u32 {
        self.npc
    }

    /// Address scheduled to follow the delay slot.
    #[must_use]
    pub const fn npc2(&self) -> u32 {
        self.npc2
    }

    /// Sets the whole PC triple.
    pub const fn set_pc_triple(&mut self, pc: u32, npc: u32, npc2: u32) {
        self.pc = pc;
        self.npc = npc;
        self.npc2 = npc2;
    }

    /// Schedules a delayed control transfer to `target`.
    pub const fn schedule_jump(&mut self, target: u32) {
        self.npc2 = target;
    }

    /// Skips the delay slot: `npc := npc2; npc2 += 4`.
    pub const fn annul_delay_slot(&mut self) {
        self.npc = self.npc2;
        self.npc2 = self.npc2.wrapping_add(4);
    }

    /// Redirects the next fetch to `vector` (trap entry).
    pub const fn redirect(&mut self, vector: u32) {
        self.npc = vector;
        self.npc2 = vector.wrapping_add(4);
    }

    /// Retires the current instruction: `pc := npc; npc := npc2; npc2 += 4`.
    pub const fn advance(&mut self) {
        self.pc = self.npc;
        self.npc = self.npc2;
        self.npc2 = self.npc2.wrapping_add(4);
    }
}

use crate::TrapType;

/// Number of global registers addressed by `%g0..%g7` (`%g0` is not stored).
pub const GLOBAL_REGISTER_COUNT: usize = 8;
/// Registers stored per window: 8 locals followed by 8 ins.
pub const WINDOW_REGISTER_COUNT: usize = 16;
/// Smallest supported number of register windows.
pub const MIN_WINDOWS: u8 = 2;
/// Largest number of register windows addressable by the 5-bit `CWP` field.
pub const MAX_WINDOWS: u8 = 32;

/// First window-relative register index (`%o0`).
pub const FIRST_OUT_REGISTER: u8 = 8;
/// First local register index (`%l0`).
pub const FIRST_LOCAL_REGISTER: u8 = 16;
/// First in register index (`%i0`).
pub const FIRST_IN_REGISTER: u8 = 24;

/// Physical storage location of an architectural register index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterSlot {
    /// `%g0`: reads as zero, writes are discarded.
    Zero,
    /// Index into the global bank (`%g1` is slot 0).
    Global(usize),
    /// Slot inside one physical window.
    Windowed {
        /// Physical window holding the register.
        window: usize,
        /// Offset inside the window: locals at `0..8`, ins at `8..16`.
        offset: usize,
    },
}

/// Maps `(cwp, idx)` to a physical slot.
///
/// The outs of window `w` are the ins of window `w - 1 (mod nwindows)`, so a
/// `SAVE` (which decrements `CWP`) turns the caller's outs into the callee's
/// ins. Only the low five bits of `idx` are significant.
#[must_use]
pub const fn physical_slot(cwp: u8, idx: u8, nwindows: u8) -> RegisterSlot {
    let idx = idx & 0x1F;
    let nwindows = nwindows as usize;
    let cwp = cwp as usize % nwindows;
    match idx {
        0 => RegisterSlot::Zero,
        1..=7 => RegisterSlot::Global(idx as usize - 1),
        8..=15 => RegisterSlot::Windowed {
            window: (cwp + nwindows - 1) % nwindows,
            offset: 8 + (idx - FIRST_OUT_REGISTER) as usize,
        },
        16..=23 => RegisterSlot::Windowed {
            window: cwp,
            offset: (idx - FIRST_LOCAL_REGISTER) as usize,
        },
        _ => RegisterSlot::Windowed {
            window: cwp,
            offset: 8 + (idx - FIRST_IN_REGISTER) as usize,
        },
    }
}

/// Integer register file with overlapping register windows.
///
/// Owns the current window pointer and the window invalid mask, the only
/// state consulted by [`Self::save`] and [`Self::restore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    globals: [u32; GLOBAL_REGISTER_COUNT - 1],
    windows: Vec<[u32; WINDOW_REGISTER_COUNT]>,
    cwp: u8,
    wim: u32,
}

impl RegisterFile {
    /// Creates a zeroed register file with `nwindows` windows.
    ///
    /// `nwindows` is clamped to `MIN_WINDOWS..=MAX_WINDOWS`.
    #[must_use]
    pub fn new(nwindows: u8) -> Self {
        let nwindows = nwindows.clamp(MIN_WINDOWS, MAX_WINDOWS);
        Self {
            globals: [0; GLOBAL_REGISTER_COUNT - 1],
            windows: vec![[0; WINDOW_REGISTER_COUNT]; usize::from(nwindows)],
            cwp: 0,
            wim: 0,
        }
    }

    /// Number of implemented windows.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn nwindows(&self) -> u8 {
        self.windows.len() as u8
    }

    /// Reads register `idx` in the current window.
    #[must_use]
    pub fn get(&self, idx: u8) -> u32 {
        match physical_slot(self.cwp, idx, self.nwindows()) {
            RegisterSlot::Zero => 0,
            RegisterSlot::Global(slot) => self.globals[slot],
            RegisterSlot::Windowed { window, offset } => self.windows[window][offset],
        }
    }

    /// Writes register `idx` in the current window; writes to `%g0` are discarded.
    pub fn set(&mut self, idx: u8, value: u32) {
        match physical_slot(self.cwp, idx, self.nwindows()) {
            RegisterSlot::Zero => {}
            RegisterSlot::Global(slot) => self.globals[slot] = value,
            RegisterSlot::Windowed { window, offset } => self.windows[window][offset] = value,
        }
    }

    /// Current window pointer.
    #[must_use]
    pub const fn cwp(&self) -> u8 {
        self.cwp
    }

    /// Replaces the current window pointer, as `WRPSR` does.
    ///
    /// Callers validate `cwp < nwindows` first; out-of-range values wrap.
    pub fn set_cwp(&mut self, cwp: u8) {
        self.cwp = cwp % self.nwindows();
    }

    /// Window invalid mask, limited to implemented windows.
    #[must_use]
    pub const fn wim(&self) -> u32 {
        self.wim
    }

    /// Writes the window invalid mask; bits of unimplemented windows read as zero.
    pub fn set_wim(&mut self, wim: u32) {
        self.wim = wim & self.wim_mask();
    }

    fn wim_mask(&self) -> u32 {
        match self.nwindows() {
            MAX_WINDOWS => u32::MAX,
            n => (1u32 << n) - 1,
        }
    }

    /// Returns `true` when window `cwp` is marked invalid.
    #[must_use]
    pub const fn is_invalid(&self, cwp: u8) -> bool {
        self.wim & (1 << (cwp & 0x1F)) != 0
    }

    fn below(&self) -> u8 {
        let n = self.nwindows();
        (self.cwp + n - 1) % n
    }

    fn above(&self) -> u8 {
        (self.cwp + 1) % self.nwindows()
    }

    /// Moves to the next window down (`SAVE`).
    ///
    /// # Errors
    ///
    /// Returns [`TrapType::WindowOverflow`] and leaves `CWP` unchanged when
    /// the destination window is marked invalid.
    pub fn save(&mut self) -> Result<(), TrapType> {
        let next = self.below();
        if self.is_invalid(next) {
            return Err(TrapType::WindowOverflow);
        }
        self.cwp = next;
        Ok(())
    }

    /// Moves to the next window down without consulting `WIM` (trap entry).
    pub fn save_unchecked(&mut self) {
        self.cwp = self.below();
    }

    /// Moves to the next window up (`RESTORE`, `RETT`).
    ///
    /// # Errors
    ///
    /// Returns [`TrapType::WindowUnderflow`] and leaves `CWP` unchanged when
    /// the destination window is marked invalid.
    pub fn restore(&mut self) -> Result<(), TrapType> {
        let next = self.above();
        if self.is_invalid(next) {
            return Err(TrapType::WindowUnderflow);
        }
        self.cwp = next;
        Ok(())
    }
}

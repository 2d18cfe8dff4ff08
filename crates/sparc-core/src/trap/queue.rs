use super::TrapType;

/// Number of priority slots tracked by the pending trap bitmap.
pub const TRAP_QUEUE_SLOTS: usize = 256;

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = TRAP_QUEUE_SLOTS / WORD_BITS;

/// Pending trap set indexed by fixed hardware priority.
///
/// Traps are raised many at once and drained one at a time: [`Self::highest`]
/// scans from slot 0 upwards and a trap stays pending until it is
/// [acknowledged](Self::acknowledge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TrapQueue {
    pending: [u64; WORDS],
}

impl TrapQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: [0; WORDS],
        }
    }

    /// Marks `trap` as pending. Raising an already pending trap is a no-op.
    pub fn raise(&mut self, trap: TrapType) {
        let slot = usize::from(trap.priority());
        self.pending[slot / WORD_BITS] |= 1 << (slot % WORD_BITS);
    }

    /// Clears `trap` once the pipeline has committed to servicing it.
    pub fn acknowledge(&mut self, trap: TrapType) {
        let slot = usize::from(trap.priority());
        self.pending[slot / WORD_BITS] &= !(1 << (slot % WORD_BITS));
    }

    /// Returns `true` when `trap` is pending.
    #[must_use]
    pub fn is_pending(&self, trap: TrapType) -> bool {
        let slot = usize::from(trap.priority());
        self.pending[slot / WORD_BITS] & (1 << (slot % WORD_BITS)) != 0
    }

    /// Returns the highest-priority pending trap without acknowledging it.
    #[must_use]
    pub fn highest(&self) -> Option<TrapType> {
        self.pending
            .iter()
            .enumerate()
            .find(|(_, word)| **word != 0)
            .and_then(|(index, word)| {
                let slot = index * WORD_BITS + word.trailing_zeros() as usize;
                u8::try_from(slot).ok().and_then(TrapType::from_priority)
            })
    }

    /// Returns `true` when no trap is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.iter().all(|word| *word == 0)
    }

    /// Number of distinct pending traps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }

    /// Drops every pending trap.
    pub fn clear(&mut self) {
        self.pending = [0; WORDS];
    }
}

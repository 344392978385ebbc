//! # Sequence IDs
//!
//! Completion identifiers handed to the hardware breadcrumb mechanism.
//!
//! An id packs a wrap counter in the top byte and a 24-bit scratch counter
//! below it. The scratch counter runs `1..=0xFF_FFFF`; on wrap the wrap
//! counter advances by `1 << 24` and the scratch counter restarts at 1, so
//! a live id is never zero.

use core::fmt;

use spin::Mutex;

// =============================================================================
// SEQUENCE ID
// =============================================================================

/// A completion id: `(wrap << 24) | scratch`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct SequenceId(u32);

impl SequenceId {
    /// The placeholder id reported for submissions that did nothing
    pub const NONE: Self = Self(0);
    /// Scratch counter field
    pub const SCRATCH_MASK: u32 = 0x00FF_FFFF;
    /// Wrap counter increment
    pub const WRAP_STEP: u32 = 0x0100_0000;

    /// Wrap a raw value read back from the hardware
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Wrap counter component (already shifted)
    pub const fn wrap(self) -> u32 {
        self.0 & !Self::SCRATCH_MASK
    }

    /// Scratch counter component
    pub const fn scratch(self) -> u32 {
        self.0 & Self::SCRATCH_MASK
    }

    /// Whether this is [`SequenceId::NONE`]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Whether the hardware having reached `last` means this id completed
    ///
    /// Compares modulo 2^32 so the comparison survives the wrap counter
    /// rolling over.
    pub const fn is_signaled_by(self, last: SequenceId) -> bool {
        (last.0.wrapping_sub(self.0) as i32) >= 0
    }
}

impl fmt::Debug for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SequenceId({:#04x}:{:06x})", self.wrap() >> 24, self.scratch())
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

// =============================================================================
// ALLOCATOR
// =============================================================================

#[derive(Debug, Default)]
struct Counters {
    /// Scratch counter, `0` only before the first id
    scnt: u32,
    /// Wrap counter, a multiple of `1 << 24`
    wcnt: u32,
}

/// Process-wide sequence id allocator
///
/// The read-modify-write of the counters happens under a lock, so
/// concurrent submitters never observe duplicate or skipped ids.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    counters: Mutex<Counters>,
}

impl SequenceAllocator {
    /// Fresh allocator; the first id is `1`
    pub const fn new() -> Self {
        Self {
            counters: Mutex::new(Counters { scnt: 0, wcnt: 0 }),
        }
    }

    /// Allocate the next id
    pub fn next_id(&self) -> SequenceId {
        let mut c = self.counters.lock();
        c.scnt = (c.scnt + 1) & SequenceId::SCRATCH_MASK;
        if c.scnt == 0 {
            c.wcnt = c.wcnt.wrapping_add(SequenceId::WRAP_STEP);
            c.scnt = 1;
        }
        SequenceId(c.wcnt | c.scnt)
    }

    /// Most recently allocated id, or [`SequenceId::NONE`]
    pub fn last_id(&self) -> SequenceId {
        let c = self.counters.lock();
        SequenceId(c.wcnt | c.scnt)
    }
}

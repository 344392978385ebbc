//! # Indirect Buffers
//!
//! The provider hands out device-visible IB storage per submission; the
//! assembler copies a validated stream into it.
//!
//! IB memory is normally mapped write-combined. Posted writes may still
//! sit in the CPU's combining buffers after the copy, so the assembler
//! reads the last word back before the buffer is handed to the hardware.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::RwLock;

use crate::error::{CsError, Result};
use crate::MAX_IB_DWORDS;

// =============================================================================
// PROVIDER CONTRACT
// =============================================================================

/// Device-visible IB storage
pub trait IbBuffer {
    /// Offset the command processor fetches the IB from
    fn card_offset(&self) -> u32;

    /// CPU mapping of the buffer
    fn words_mut(&mut self) -> &mut [u32];
}

/// Source of IB storage
///
/// `acquire` and `release` are called exactly once each per submission
/// that reaches validation.
pub trait IbProvider {
    /// Buffer handed out by this provider
    type Buffer: IbBuffer;

    /// Reserve storage for `length_dw` words
    fn acquire(&self, length_dw: usize) -> Result<Self::Buffer>;

    /// Return storage; the buffer is not used again
    fn release(&self, buffer: &mut Self::Buffer);
}

/// An acquired IB that is released when dropped
pub struct IbGuard<'a, P: IbProvider + ?Sized> {
    provider: &'a P,
    buffer: P::Buffer,
}

impl<'a, P: IbProvider + ?Sized> IbGuard<'a, P> {
    /// Acquire from `provider`
    pub fn acquire(provider: &'a P, length_dw: usize) -> Result<Self> {
        let buffer = provider.acquire(length_dw)?;
        Ok(Self { provider, buffer })
    }

    /// Card offset of the held buffer
    pub fn card_offset(&self) -> u32 {
        self.buffer.card_offset()
    }

    /// Held buffer
    pub fn buffer_mut(&mut self) -> &mut P::Buffer {
        &mut self.buffer
    }
}

impl<P: IbProvider + ?Sized> Drop for IbGuard<'_, P> {
    fn drop(&mut self) {
        self.provider.release(&mut self.buffer);
    }
}

// =============================================================================
// ASSEMBLER
// =============================================================================

/// Copy `stream` verbatim into `dst` and flush write combining
pub fn assemble<B: IbBuffer + ?Sized>(dst: &mut B, stream: &[u32]) -> Result<()> {
    let words = dst.words_mut();
    let target = words.get_mut(..stream.len()).ok_or(CsError::OutOfMemory)?;
    target.copy_from_slice(stream);

    if let Some(last) = target.last() {
        // SAFETY: `last` is a valid, aligned reference into the mapping
        let _ = unsafe { core::ptr::read_volatile(last) };
    }
    Ok(())
}

// =============================================================================
// HOST IB POOL
// =============================================================================

#[derive(Debug, Default)]
struct HostSlot {
    busy: bool,
    /// Storage; moved out to the holder while busy
    words: Vec<u32>,
    /// Length requested by the last holder
    used: usize,
}

/// IB storage held in host memory
#[derive(Debug)]
pub struct HostIb {
    slot: usize,
    card_offset: u32,
    words: Vec<u32>,
    used: usize,
}

impl IbBuffer for HostIb {
    fn card_offset(&self) -> u32 {
        self.card_offset
    }

    fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }
}

/// Fixed set of IB slots laid out from a base card offset
///
/// Slot `i` lives at `base + i * MAX_IB_DWORDS * 4`. Contents stay in
/// place after release so they can be read back.
#[derive(Debug)]
pub struct HostIbPool {
    base: u32,
    slots: RwLock<Vec<HostSlot>>,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl HostIbPool {
    /// Bytes between slot offsets
    pub const SLOT_BYTES: u32 = (MAX_IB_DWORDS * 4) as u32;

    /// Create a pool of `count` slots
    pub fn new(base: u32, count: usize) -> Self {
        let mut slots = Vec::with_capacity(count);
        slots.resize_with(count, HostSlot::default);
        Self {
            base,
            slots: RwLock::new(slots),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    fn slot_offset(&self, slot: usize) -> u32 {
        self.base.wrapping_add((slot as u32).wrapping_mul(Self::SLOT_BYTES))
    }

    /// Words last assembled at `card_offset`, if that slot is idle
    pub fn read_back(&self, card_offset: u32) -> Option<Vec<u32>> {
        let index = card_offset.checked_sub(self.base)? / Self::SLOT_BYTES;
        let slots = self.slots.read();
        let slot = slots.get(index as usize)?;
        if slot.busy || self.slot_offset(index as usize) != card_offset {
            return None;
        }
        Some(slot.words[..slot.used].to_vec())
    }

    /// Buffers handed out so far
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::Relaxed)
    }

    /// Buffers returned so far
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    /// Buffers currently held
    pub fn in_use(&self) -> usize {
        self.slots.read().iter().filter(|s| s.busy).count()
    }
}

impl IbProvider for HostIbPool {
    type Buffer = HostIb;

    fn acquire(&self, length_dw: usize) -> Result<HostIb> {
        if length_dw > MAX_IB_DWORDS {
            return Err(CsError::OutOfMemory);
        }

        let mut slots = self.slots.write();
        let index = slots
            .iter()
            .position(|s| !s.busy)
            .ok_or(CsError::OutOfMemory)?;
        let slot = &mut slots[index];

        if slot.words.len() < MAX_IB_DWORDS {
            slot.words
                .try_reserve_exact(MAX_IB_DWORDS - slot.words.len())
                .map_err(|_| CsError::OutOfMemory)?;
            slot.words.resize(MAX_IB_DWORDS, 0);
        }

        slot.busy = true;
        self.acquired.fetch_add(1, Ordering::Relaxed);
        let card_offset = self.slot_offset(index);
        log::debug!("ib slot {} at {:#x} for {} dw", index, card_offset, length_dw);
        Ok(HostIb {
            slot: index,
            card_offset,
            words: core::mem::take(&mut slot.words),
            used: length_dw,
        })
    }

    fn release(&self, buffer: &mut HostIb) {
        let mut slots = self.slots.write();
        if let Some(slot) = slots.get_mut(buffer.slot) {
            slot.words = core::mem::take(&mut buffer.words);
            slot.used = buffer.used;
            slot.busy = false;
            self.released.fetch_add(1, Ordering::Relaxed);
        }
    }
}

//! Test doubles shared by the unit tests.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use bytemuck::Pod;
use spin::Mutex;

use crate::chunk::UserMemory;
use crate::emit::RingWriter;
use crate::error::{CsError, Result};
use crate::reloc::{RelocEntry, RelocError, Relocator};

// =============================================================================
// USER MEMORY
// =============================================================================

/// Caller address space made of disjoint mapped regions
#[derive(Debug, Default)]
pub struct FakeUserMemory {
    regions: Vec<(u64, Vec<u8>)>,
    next: u64,
}

impl FakeUserMemory {
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            next: 0x0001_0000,
        }
    }

    /// Map `bytes` at a fresh address
    pub fn place_bytes(&mut self, bytes: &[u8]) -> u64 {
        let addr = self.next;
        self.regions.push((addr, bytes.to_vec()));
        let span = (bytes.len() as u64 + 0xFFF) & !0xFFF;
        self.next += span + 0x1000;
        addr
    }

    pub fn place_words(&mut self, words: &[u32]) -> u64 {
        self.place_bytes(bytemuck::cast_slice(words))
    }

    pub fn place_u64s(&mut self, values: &[u64]) -> u64 {
        self.place_bytes(bytemuck::cast_slice(values))
    }

    pub fn place_pod<T: Pod>(&mut self, value: &T) -> u64 {
        self.place_bytes(bytemuck::bytes_of(value))
    }
}

impl UserMemory for FakeUserMemory {
    fn copy_from_user(&self, dst: &mut [u8], addr: u64) -> Result<()> {
        let fault = CsError::TransferFault { addr };
        let (base, bytes) = self
            .regions
            .iter()
            .find(|(base, bytes)| addr >= *base && addr < base + bytes.len() as u64)
            .ok_or(fault)?;
        let start = (addr - base) as usize;
        let src = bytes.get(start..start + dst.len()).ok_or(fault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

// =============================================================================
// RING
// =============================================================================

/// Ring writer that records every word
#[derive(Debug, Default)]
pub struct RecordingRing {
    pub words: Vec<u32>,
    pub reservations: Vec<usize>,
    pub advances: usize,
    pub commits: usize,
    pub breadcrumb: u32,
    pub scratch_regs: [u32; 8],
}

impl RecordingRing {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RingWriter for RecordingRing {
    fn begin(&mut self, ndw: usize) {
        self.reservations.push(ndw);
    }

    fn out(&mut self, dw: u32) {
        self.words.push(dw);
    }

    fn advance(&mut self) {
        self.advances += 1;
    }

    fn commit(&mut self) {
        self.commits += 1;
    }

    fn update_breadcrumb(&mut self) -> u32 {
        self.breadcrumb += 1;
        self.breadcrumb
    }

    fn scratch(&self, index: usize) -> u32 {
        self.scratch_regs.get(index).copied().unwrap_or(0)
    }
}

// =============================================================================
// RELOCATOR
// =============================================================================

/// Resolver with a fixed answer that counts its calls
#[derive(Debug)]
pub struct CountingRelocator {
    answer: core::result::Result<u32, RelocError>,
    calls: AtomicUsize,
    last: Mutex<Option<RelocEntry>>,
}

impl CountingRelocator {
    pub fn new(addr: u32) -> Self {
        Self {
            answer: Ok(addr),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn failing(cause: RelocError) -> Self {
        Self {
            answer: Err(cause),
            ..Self::new(0)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn last(&self) -> Option<RelocEntry> {
        *self.last.lock()
    }
}

impl Relocator for CountingRelocator {
    fn relocate(&self, reloc: &RelocEntry) -> core::result::Result<u32, RelocError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        *self.last.lock() = Some(*reloc);
        self.answer
    }
}

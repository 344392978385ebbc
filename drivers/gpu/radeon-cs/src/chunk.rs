//! # Chunk Loader
//!
//! Turns the caller's chunk descriptors into an owned [`Submission`].
//!
//! ## Layout
//!
//! ```text
//! CsArgs.chunks ──► [u64; num_chunks] ──► CsChunkHeader { id, length_dw, data }
//!                                                                  │
//!                                                                  ▼
//!                                                        [u32; length_dw]
//! ```
//!
//! Every payload is copied into a buffer owned by the submission. A copy
//! or allocation failure drops the partially built submission, which frees
//! every chunk loaded so far.

use alloc::vec::Vec;

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use crate::error::{ChunkLayoutError, CsError, LengthError, Result};
use crate::regs::{RADEON_CHUNK_ID_IB, RADEON_CHUNK_ID_OLD, RADEON_CHUNK_ID_RELOCS};
use crate::MAX_IB_DWORDS;

// =============================================================================
// USER MEMORY
// =============================================================================

/// Source of submission data in the caller's address space
pub trait UserMemory {
    /// Fill `dst` from caller address `addr`
    ///
    /// Fails with [`CsError::TransferFault`] when any byte is unreadable.
    fn copy_from_user(&self, dst: &mut [u8], addr: u64) -> Result<()>;
}

impl<M: UserMemory + ?Sized> UserMemory for &M {
    fn copy_from_user(&self, dst: &mut [u8], addr: u64) -> Result<()> {
        (**self).copy_from_user(dst, addr)
    }
}

// =============================================================================
// IOCTL ARGUMENT BLOCKS
// =============================================================================

/// One chunk descriptor, as laid out in caller memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct CsChunkHeader {
    /// Chunk id (`RADEON_CHUNK_ID_*`)
    pub chunk_id: u32,
    /// Payload length in dwords
    pub length_dw: u32,
    /// Caller address of the payload
    pub chunk_data: u64,
}

/// Chunked submission arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct CsArgs {
    /// Assigned sequence id, written back on success
    pub cs_id: u32,
    /// Number of chunk pointers
    pub num_chunks: u32,
    /// Caller address of the `u64` chunk pointer array
    pub chunks: u64,
}

/// Single-stream submission arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct CsLegacyArgs {
    /// Stream length in dwords
    pub dwords: u32,
    /// Assigned sequence id, written back on success
    pub cs_id: u32,
    /// Caller address of the stream
    pub packets: u64,
}

const_assert_eq!(core::mem::size_of::<CsChunkHeader>(), 16);
const_assert_eq!(core::mem::size_of::<CsArgs>(), 16);
const_assert_eq!(core::mem::size_of::<CsLegacyArgs>(), 16);

// =============================================================================
// CHUNKS
// =============================================================================

/// What a chunk carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Command stream; relocations come from a separate chunk
    IndirectBuffer,
    /// Relocation table of 4-dword entries
    Relocations,
    /// Command stream with inline relocation records
    LegacyCombined,
    /// Unrecognized id; kept in order, payload not loaded
    Unknown(u32),
}

impl ChunkKind {
    /// Classify a chunk id
    pub const fn from_id(id: u32) -> Self {
        match id {
            RADEON_CHUNK_ID_RELOCS => Self::Relocations,
            RADEON_CHUNK_ID_IB => Self::IndirectBuffer,
            RADEON_CHUNK_ID_OLD => Self::LegacyCombined,
            other => Self::Unknown(other),
        }
    }

    /// Whether the chunk holds the command stream
    pub const fn is_ib(self) -> bool {
        matches!(self, Self::IndirectBuffer | Self::LegacyCombined)
    }
}

/// A loaded chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk kind
    pub kind: ChunkKind,
    /// Declared length in dwords
    pub length_dw: u32,
    /// Owned copy of the payload; empty for unknown kinds
    pub payload: Vec<u32>,
}

// =============================================================================
// SUBMISSION
// =============================================================================

/// All chunks of one submission
#[derive(Debug, Clone)]
pub struct Submission {
    chunks: Vec<Chunk>,
    ib_index: usize,
    reloc_index: Option<usize>,
}

impl Submission {
    /// Single legacy combined stream
    pub fn legacy(words: Vec<u32>) -> Result<Self> {
        let length_dw = check_ib_length(words.len() as u64)?;
        Ok(Self {
            chunks: alloc::vec![Chunk {
                kind: ChunkKind::LegacyCombined,
                length_dw,
                payload: words,
            }],
            ib_index: 0,
            reloc_index: None,
        })
    }

    /// Build from already loaded chunks, enforcing the layout rules
    ///
    /// Exactly one IB or legacy combined chunk must exist. A legacy
    /// combined chunk disables any relocation chunk in the same list.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self> {
        let mut ib_index = None;
        let mut reloc_index = None;
        let mut legacy = false;

        for (index, chunk) in chunks.iter().enumerate() {
            match chunk.kind {
                ChunkKind::IndirectBuffer | ChunkKind::LegacyCombined => {
                    if ib_index.is_some() {
                        return Err(ChunkLayoutError::DuplicateIb { index }.into());
                    }
                    check_ib_length(u64::from(chunk.length_dw))?;
                    if chunk.payload.len() != chunk.length_dw as usize {
                        return Err(LengthError::Mismatch {
                            length_dw: chunk.length_dw,
                            payload_dw: chunk.payload.len(),
                        }
                        .into());
                    }
                    ib_index = Some(index);
                    if chunk.kind == ChunkKind::LegacyCombined {
                        legacy = true;
                        reloc_index = None;
                    }
                },
                ChunkKind::Relocations if legacy => {
                    log::debug!("chunk {}: relocations ignored after legacy stream", index);
                },
                ChunkKind::Relocations => {
                    if reloc_index.is_some() {
                        return Err(ChunkLayoutError::DuplicateRelocs { index }.into());
                    }
                    reloc_index = Some(index);
                },
                ChunkKind::Unknown(id) => {
                    log::debug!("chunk {}: unknown id {:#x} skipped", index, id);
                },
            }
        }

        let ib_index = ib_index.ok_or(CsError::from(ChunkLayoutError::MissingIb))?;
        Ok(Self {
            chunks,
            ib_index,
            reloc_index,
        })
    }

    /// Load a chunked submission; `None` when it has no chunks
    pub fn load_chunked<M: UserMemory + ?Sized>(mem: &M, args: &CsArgs) -> Result<Option<Self>> {
        if args.num_chunks == 0 {
            return Ok(None);
        }

        let count = args.num_chunks as usize;
        let mut pointers: Vec<u64> = alloc_zeroed(count)?;
        mem.copy_from_user(bytemuck::cast_slice_mut(&mut pointers), args.chunks)?;

        let mut chunks = Vec::new();
        chunks.try_reserve_exact(count).map_err(|_| CsError::OutOfMemory)?;
        for (index, &ptr) in pointers.iter().enumerate() {
            let mut header = CsChunkHeader::zeroed();
            mem.copy_from_user(bytemuck::bytes_of_mut(&mut header), ptr)?;
            log::debug!(
                "chunk {} id {:#x} {} dw at {:#x}",
                index,
                header.chunk_id,
                header.length_dw,
                header.chunk_data
            );
            chunks.push(load_chunk(mem, &header)?);
        }

        Self::from_chunks(chunks).map(Some)
    }

    /// Load a single-stream submission; `None` when it is empty
    pub fn load_legacy<M: UserMemory + ?Sized>(
        mem: &M,
        args: &CsLegacyArgs,
    ) -> Result<Option<Self>> {
        if args.dwords == 0 {
            return Ok(None);
        }
        check_ib_length(u64::from(args.dwords))?;

        let words = copy_words(mem, args.packets, args.dwords as usize)?;
        Self::legacy(words).map(Some)
    }

    /// Loaded chunks, in submission order
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Index of the command stream chunk
    pub fn ib_index(&self) -> usize {
        self.ib_index
    }

    /// Index of the relocation chunk, if one applies
    pub fn reloc_index(&self) -> Option<usize> {
        self.reloc_index
    }

    /// Command stream words
    pub fn ib(&self) -> &[u32] {
        &self.chunks[self.ib_index].payload
    }

    /// Relocation table words, if a relocation chunk applies
    pub fn relocs(&self) -> Option<&[u32]> {
        self.reloc_index.map(|i| self.chunks[i].payload.as_slice())
    }

    /// Mutable command stream alongside the relocation table
    pub fn parts_mut(&mut self) -> (&mut [u32], Option<&[u32]>) {
        let ib = self.ib_index;
        match self.reloc_index {
            None => (&mut self.chunks[ib].payload, None),
            Some(r) if r < ib => {
                let (head, tail) = self.chunks.split_at_mut(ib);
                (&mut tail[0].payload, Some(&head[r].payload))
            },
            Some(r) => {
                let (head, tail) = self.chunks.split_at_mut(r);
                (&mut head[ib].payload, Some(&tail[0].payload))
            },
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn check_ib_length(length_dw: u64) -> Result<u32> {
    match u32::try_from(length_dw) {
        Ok(0) => Err(LengthError::Empty.into()),
        Ok(n) if n as usize <= MAX_IB_DWORDS => Ok(n),
        Ok(n) => Err(LengthError::TooLarge { length_dw: n }.into()),
        Err(_) => Err(LengthError::TooLarge {
            length_dw: u32::MAX,
        }
        .into()),
    }
}

fn alloc_zeroed<T: Pod>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| CsError::OutOfMemory)?;
    v.resize(len, T::zeroed());
    Ok(v)
}

fn copy_words<M: UserMemory + ?Sized>(mem: &M, addr: u64, len: usize) -> Result<Vec<u32>> {
    let mut words: Vec<u32> = alloc_zeroed(len)?;
    mem.copy_from_user(bytemuck::cast_slice_mut(&mut words), addr)?;
    Ok(words)
}

fn load_chunk<M: UserMemory + ?Sized>(mem: &M, header: &CsChunkHeader) -> Result<Chunk> {
    let kind = ChunkKind::from_id(header.chunk_id);
    let payload = match kind {
        ChunkKind::IndirectBuffer | ChunkKind::LegacyCombined => {
            // bound before allocating so an oversized stream costs nothing
            check_ib_length(u64::from(header.length_dw))?;
            copy_words(mem, header.chunk_data, header.length_dw as usize)?
        },
        ChunkKind::Relocations if header.length_dw == 0 => Vec::new(),
        ChunkKind::Relocations => copy_words(mem, header.chunk_data, header.length_dw as usize)?,
        ChunkKind::Unknown(_) => Vec::new(),
    };
    Ok(Chunk {
        kind,
        length_dw: header.length_dw,
        payload,
    })
}

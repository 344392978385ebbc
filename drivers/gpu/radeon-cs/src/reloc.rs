//! # Relocation Resolvers
//!
//! A resolver maps a relocation record from the command stream (a buffer
//! handle plus access information) to a device address. The checker calls
//! it synchronously and never caches its answers.
//!
//! Resolvers must fail closed: a lookup miss is an error, never a stale
//! or default address.

use alloc::collections::BTreeMap;
use core::fmt;

use bytemuck::{Pod, Zeroable};
use spin::RwLock;
use static_assertions::const_assert_eq;

use crate::error::{EFAULT, EINVAL, ENOMEM};

// =============================================================================
// MEMORY DOMAINS
// =============================================================================

bitflags::bitflags! {
    /// Memory domains a buffer may live in or be accessed through
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GemDomain: u32 {
        /// System memory, CPU access only
        const CPU = 1 << 0;
        /// System memory mapped through the GART
        const GTT = 1 << 1;
        /// On-board video memory
        const VRAM = 1 << 2;
    }
}

// =============================================================================
// RELOCATION ENTRY
// =============================================================================

/// One relocation record, as laid out in a relocation chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct RelocEntry {
    /// Buffer handle; a raw device offset when no memory manager exists
    pub handle: u32,
    /// Domains the GPU reads the buffer through
    pub read_domains: u32,
    /// Domain the GPU writes the buffer through (0 for none)
    pub write_domain: u32,
    /// Driver-specific flags
    pub flags: u32,
}

const_assert_eq!(core::mem::size_of::<RelocEntry>(), 16);

impl RelocEntry {
    /// Entry size in dwords
    pub const DWORDS: usize = 4;

    /// Record carried inline in a legacy marker: handle and flags only
    pub const fn inline(handle: u32, flags: u32) -> Self {
        Self {
            handle,
            read_domains: 0,
            write_domain: 0,
            flags,
        }
    }

    /// Decode from relocation chunk words
    pub fn from_words(words: &[u32; 4]) -> Self {
        bytemuck::cast(*words)
    }

    /// Read domains as flags; unknown bits are dropped
    pub fn read_domains(&self) -> GemDomain {
        GemDomain::from_bits_truncate(self.read_domains)
    }

    /// Write domain as flags; unknown bits are dropped
    pub fn write_domain(&self) -> GemDomain {
        GemDomain::from_bits_truncate(self.write_domain)
    }
}

// =============================================================================
// RESOLVER CONTRACT
// =============================================================================

/// Resolver failure causes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocError {
    /// Handle does not name a buffer
    InvalidHandle(u32),
    /// Requested domains are not permitted for the buffer
    AccessDenied {
        /// Buffer handle
        handle: u32,
        /// Domains requested by the record
        requested: u32,
    },
    /// Buffer could not be made resident
    NotResident(u32),
}

impl RelocError {
    /// Negative errno for an ioctl return
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidHandle(_) => -EINVAL,
            Self::AccessDenied { .. } => -EFAULT,
            Self::NotResident(_) => -ENOMEM,
        }
    }
}

impl fmt::Display for RelocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle(h) => write!(f, "invalid handle {}", h),
            Self::AccessDenied { handle, requested } => {
                write!(f, "handle {} denied domains {:#x}", handle, requested)
            },
            Self::NotResident(h) => write!(f, "handle {} not resident", h),
        }
    }
}

/// Relocation resolver
///
/// Must not depend on checker state and must answer the same record the
/// same way for the duration of one submission.
pub trait Relocator {
    /// Resolve a record to the device address its buffer lives at
    fn relocate(&self, reloc: &RelocEntry) -> core::result::Result<u32, RelocError>;
}

impl<R: Relocator + ?Sized> Relocator for &R {
    fn relocate(&self, reloc: &RelocEntry) -> core::result::Result<u32, RelocError> {
        (**self).relocate(reloc)
    }
}

// =============================================================================
// NO MEMORY MANAGER
// =============================================================================

/// Resolver used when no memory manager backs the device
///
/// The handle word already is the device offset; it is returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMmRelocator;

impl Relocator for NoMmRelocator {
    fn relocate(&self, reloc: &RelocEntry) -> core::result::Result<u32, RelocError> {
        Ok(reloc.handle)
    }
}

// =============================================================================
// HANDLE TABLE
// =============================================================================

/// A buffer known to the handle table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferObject {
    /// Device address of the buffer
    pub gpu_addr: u32,
    /// Domains the buffer may be read or written through
    pub domains: GemDomain,
    /// Whether the buffer is currently resident
    pub resident: bool,
}

/// Handle-table resolver with domain checks
#[derive(Debug, Default)]
pub struct HandleTableRelocator {
    /// Handle to buffer map
    buffers: RwLock<BTreeMap<u32, BufferObject>>,
}

impl HandleTableRelocator {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a buffer under `handle`, replacing any previous entry
    pub fn insert(&self, handle: u32, bo: BufferObject) {
        self.buffers.write().insert(handle, bo);
    }

    /// Forget `handle`
    pub fn remove(&self, handle: u32) -> Option<BufferObject> {
        self.buffers.write().remove(&handle)
    }

    /// Number of registered buffers
    pub fn len(&self) -> usize {
        self.buffers.read().len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.buffers.read().is_empty()
    }
}

impl Relocator for HandleTableRelocator {
    fn relocate(&self, reloc: &RelocEntry) -> core::result::Result<u32, RelocError> {
        let bo = self
            .buffers
            .read()
            .get(&reloc.handle)
            .copied()
            .ok_or(RelocError::InvalidHandle(reloc.handle))?;

        let requested = reloc.read_domains() | reloc.write_domain();
        if !bo.domains.contains(requested) {
            return Err(RelocError::AccessDenied {
                handle: reloc.handle,
                requested: requested.bits(),
            });
        }
        if !bo.resident {
            return Err(RelocError::NotResident(reloc.handle));
        }

        log::debug!("reloc handle {} -> {:#x}", reloc.handle, bo.gpu_addr);
        Ok(bo.gpu_addr)
    }
}

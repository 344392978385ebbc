//! # Command Stream Errors
//!
//! Every rejection carries a specific kind so the caller can tell a
//! transport fault from a resource shortage from bad stream content.
//! None of them are retried internally; a failed submission reaches the
//! hardware in no form at all.

use core::fmt;

use crate::config::ChipFamily;
use crate::reloc::RelocError;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// Command stream result type alias
pub type Result<T> = core::result::Result<T, CsError>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// Command stream submission error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CsError {
    // =========================================================================
    // Device Errors
    // =========================================================================
    /// Submission service not initialized
    NoDevice,
    /// No emitter/table exists for this chip family
    UnsupportedFamily(ChipFamily),

    // =========================================================================
    // Transport / Resource Errors
    // =========================================================================
    /// Could not read the submission from caller memory
    TransferFault {
        /// Caller address that faulted
        addr: u64,
    },
    /// Chunk buffer or IB allocation failed
    OutOfMemory,

    // =========================================================================
    // Submission Shape Errors
    // =========================================================================
    /// The chunk list does not describe exactly one command stream
    InvalidChunkLayout(ChunkLayoutError),
    /// Command stream length is zero or over the hardware bound
    InvalidLength(LengthError),

    // =========================================================================
    // Content Validation Errors
    // =========================================================================
    /// Packet 0 writes a register the submitter may not touch
    IllegalRegister {
        /// Register offset in bytes
        reg: u32,
        /// IB word offset of the packet header
        offset: usize,
    },
    /// Relocation marker packet missing or not in the expected encoding
    MalformedRelocationMarker {
        /// IB word offset of the marker
        offset: usize,
        /// Word found at that offset
        found: u32,
    },
    /// Packet 3 opcode is neither safe nor relocatable
    UnknownOpcode {
        /// Opcode field (`header & 0xff00`)
        opcode: u32,
        /// IB word offset of the packet header
        offset: usize,
    },
    /// The resolver refused a relocation
    RelocationFailed {
        /// IB word offset of the relocation marker
        offset: usize,
        /// Cause reported by the resolver
        cause: RelocError,
    },
    /// A packet declares more words than the stream holds
    TruncatedPacket {
        /// IB word offset of the packet header
        offset: usize,
        /// Words the packet needs from `offset`
        needed: usize,
        /// Words left in the stream from `offset`
        available: usize,
    },
}

impl fmt::Display for CsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDevice => write!(f, "called with no initialization"),
            Self::UnsupportedFamily(family) => {
                write!(f, "no command stream support for {:?}", family)
            },
            Self::TransferFault { addr } => write!(f, "fault copying from user {:#x}", addr),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::InvalidChunkLayout(e) => write!(f, "invalid chunk layout: {}", e),
            Self::InvalidLength(e) => write!(f, "invalid length: {}", e),
            Self::IllegalRegister { reg, offset } => {
                write!(f, "illegal register {:#x} at {}", reg, offset)
            },
            Self::MalformedRelocationMarker { offset, found } => {
                write!(f, "bad relocation marker {:#010x} at {}", found, offset)
            },
            Self::UnknownOpcode { opcode, offset } => {
                write!(f, "unknown packet 3 {:#x} at {}", opcode, offset)
            },
            Self::RelocationFailed { offset, cause } => {
                write!(f, "relocation at {} failed: {}", offset, cause)
            },
            Self::TruncatedPacket {
                offset,
                needed,
                available,
            } => write!(
                f,
                "packet at {} needs {} words, {} left",
                offset, needed, available
            ),
        }
    }
}

// =============================================================================
// SUB-ERROR TYPES
// =============================================================================

/// Command stream length errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthError {
    /// IB chunk has zero words
    Empty,
    /// IB chunk exceeds [`crate::MAX_IB_DWORDS`]
    TooLarge {
        /// Declared length in words
        length_dw: u32,
    },
    /// Declared length disagrees with the words actually held
    Mismatch {
        /// Declared length in words
        length_dw: u32,
        /// Words in the payload
        payload_dw: usize,
    },
}

impl fmt::Display for LengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command stream"),
            Self::TooLarge { length_dw } => write!(f, "cs->dwords too big: {}", length_dw),
            Self::Mismatch {
                length_dw,
                payload_dw,
            } => write!(f, "{} dw declared, {} held", length_dw, payload_dw),
        }
    }
}

/// Chunk list shape errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayoutError {
    /// No IB or legacy combined chunk present
    MissingIb,
    /// More than one IB or legacy combined chunk
    DuplicateIb {
        /// Index of the second IB chunk
        index: usize,
    },
    /// More than one relocation chunk
    DuplicateRelocs {
        /// Index of the second relocation chunk
        index: usize,
    },
}

impl fmt::Display for ChunkLayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIb => write!(f, "no IB chunk"),
            Self::DuplicateIb { index } => write!(f, "second IB chunk at {}", index),
            Self::DuplicateRelocs { index } => write!(f, "second relocation chunk at {}", index),
        }
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Which stage rejected a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Service state (not initialized, unsupported chip)
    Device,
    /// Copying the submission from the caller
    Transport,
    /// Memory for chunk buffers or the IB
    Resource,
    /// Stream shape or content
    Validation,
}

/// `EINVAL`
pub const EINVAL: i32 = 22;
/// `EFAULT`
pub const EFAULT: i32 = 14;
/// `ENOMEM`
pub const ENOMEM: i32 = 12;
/// `ENODEV`
pub const ENODEV: i32 = 19;

impl CsError {
    /// Stage that produced the error
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoDevice | Self::UnsupportedFamily(_) => ErrorClass::Device,
            Self::TransferFault { .. } => ErrorClass::Transport,
            Self::OutOfMemory => ErrorClass::Resource,
            Self::InvalidChunkLayout(_)
            | Self::InvalidLength(_)
            | Self::IllegalRegister { .. }
            | Self::MalformedRelocationMarker { .. }
            | Self::UnknownOpcode { .. }
            | Self::RelocationFailed { .. }
            | Self::TruncatedPacket { .. } => ErrorClass::Validation,
        }
    }

    /// Negative errno for an ioctl return
    pub fn errno(&self) -> i32 {
        match self {
            Self::UnsupportedFamily(_) => -ENODEV,
            Self::TransferFault { .. } => -EFAULT,
            Self::OutOfMemory => -ENOMEM,
            Self::RelocationFailed { cause, .. } => cause.errno(),
            _ => -EINVAL,
        }
    }
}

// =============================================================================
// ERROR CONVERSION
// =============================================================================

impl From<LengthError> for CsError {
    fn from(e: LengthError) -> Self {
        CsError::InvalidLength(e)
    }
}

impl From<ChunkLayoutError> for CsError {
    fn from(e: ChunkLayoutError) -> Self {
        CsError::InvalidChunkLayout(e)
    }
}

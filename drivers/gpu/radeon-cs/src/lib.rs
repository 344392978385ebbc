//! # Radeon Command Stream Checker
//!
//! Validation and submission of user command streams for R100 - R500
//! class Radeon GPUs.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                       Command Stream Submission                    │
//! │                                                                    │
//! │  ┌────────────┐    ┌─────────────┐    ┌────────────┐              │
//! │  │   Chunk    │    │   Packet    │    │     IB     │              │
//! │  │   Loader   │───▶│  Validator  │───▶│ Assembler  │              │
//! │  └────────────┘    └──────┬──────┘    └─────┬──────┘              │
//! │                           │                 │                      │
//! │               ┌───────────┴───┐      ┌──────▼───────┐              │
//! │               │ Register      │      │ Sequence ID  │              │
//! │               │ Table         │      │ + Emitter    │──▶ CP ring   │
//! │               │ Relocator     │      └──────────────┘              │
//! │               └───────────────┘                                    │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A submission is either accepted whole (validated, patched, copied into
//! an IB and given a [`SequenceId`]) or rejected with a [`CsError`] and
//! nothing reaches the hardware.
//!
//! ## Usage
//!
//! ```ignore
//! let cs = RadeonCs::new(NoMmRelocator, pool, ring);
//! cs.init(CsConfig::for_family(ChipFamily::R300))?;
//! cs.cs_ioctl(&user, &mut args)?;
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

pub mod chunk;
pub mod config;
pub mod device;
pub mod emit;
pub mod error;
pub mod ib;
pub mod packet;
pub mod parser;
pub mod regs;
pub mod reloc;
pub mod seqno;
pub mod table;

#[cfg(test)]
pub(crate) mod testing;

use static_assertions::const_assert_eq;

/// Largest command stream accepted, in dwords
///
/// Bounded by the fixed-size command FIFO and staging buffer.
pub const MAX_IB_DWORDS: usize = 16 * 1024;

const_assert_eq!(MAX_IB_DWORDS * 4, 64 * 1024);

// Re-exports
pub use chunk::{Chunk, ChunkKind, CsArgs, CsChunkHeader, CsLegacyArgs, Submission, UserMemory};
pub use config::{ChipFamily, CsConfig, Generation};
pub use device::{CsStats, RadeonCs};
pub use emit::{CompletionEmitter, RingWriter};
pub use error::{ChunkLayoutError, CsError, ErrorClass, LengthError, Result};
pub use ib::{assemble, HostIbPool, IbBuffer, IbGuard, IbProvider};
pub use parser::{CsParser, ParseStats};
pub use reloc::{GemDomain, HandleTableRelocator, NoMmRelocator, RelocEntry, RelocError, Relocator};
pub use seqno::{SequenceAllocator, SequenceId};
pub use table::{Disposition, OffsetPatch, RegisterRule, RegisterTable};

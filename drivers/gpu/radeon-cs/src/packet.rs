//! # CP Packets
//!
//! Decoding of command processor packet headers and the Type 3 opcode
//! sets the checker knows about.
//!
//! ```text
//!  31 30 29                16 15 14  13            0
//! ┌─────┬────────────────────┬──┬──┬───────────────┐
//! │type │ count (body - 1)   │1R│  │ reg >> 2       │   type 0
//! ├─────┼────────────────────┼──┴──┴──┬────────────┤
//! │ 11  │ count (body - 1)   │ opcode  │            │   type 3
//! └─────┴────────────────────┴─────────┴────────────┘
//! ```

use crate::regs::*;

// =============================================================================
// PACKET HEADER
// =============================================================================

/// Packet family, from the top two header bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Sequential register writes
    Type0,
    /// Paired register writes (not validated)
    Type1,
    /// Filler (not validated)
    Type2,
    /// Opcode with operands
    Type3,
}

/// A decoded packet header word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PacketHeader(pub u32);

impl PacketHeader {
    /// Wrap a raw header word
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw header word
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Packet family
    pub const fn kind(self) -> PacketKind {
        match self.0 & CP_PACKET_MASK {
            CP_PACKET0 => PacketKind::Type0,
            CP_PACKET1 => PacketKind::Type1,
            CP_PACKET2 => PacketKind::Type2,
            _ => PacketKind::Type3,
        }
    }

    /// Count field: body words minus one
    pub const fn count(self) -> usize {
        ((self.0 & CP_PACKET_COUNT_MASK) >> 16) as usize
    }

    /// Words the command processor consumes for this packet
    ///
    /// Header plus `count + 1` body words, for every family.
    pub const fn stride(self) -> usize {
        self.count() + 2
    }

    /// Packet 0 base register, in bytes
    pub const fn register(self) -> u32 {
        (self.0 & CP_PACKET0_REG_MASK) << 2
    }

    /// Packet 0 one-register-write bit
    pub const fn one_reg_write(self) -> bool {
        self.0 & CP_PACKET0_ONE_REG_WR != 0
    }

    /// Packet 3 opcode field
    pub const fn opcode(self) -> u32 {
        self.0 & CP_PACKET3_OPCODE_MASK
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Type 0 header writing `count + 1` registers from `reg`
pub const fn cp_packet0(reg: u32, count: u32) -> u32 {
    CP_PACKET0 | (count << 16) | (reg >> 2)
}

/// Type 0 header writing `count + 1` words to `reg` alone
pub const fn cp_packet0_one_reg(reg: u32, count: u32) -> u32 {
    cp_packet0(reg, count) | CP_PACKET0_ONE_REG_WR
}

/// Type 2 filler
pub const fn cp_packet2() -> u32 {
    CP_PACKET2
}

/// Type 3 header with opcode and `count + 1` body words
pub const fn cp_packet3(opcode: u32, count: u32) -> u32 {
    CP_PACKET3 | opcode | (count << 16)
}

// =============================================================================
// TYPE 3 OPCODES
// =============================================================================

/// Type 3 opcodes
pub mod opcode {
    /// No operation; also carries inline relocation records
    pub const NOP: u32 = 0x1000;
    /// Wait for engine idle
    pub const WAIT_FOR_IDLE: u32 = 0x2600;
    /// Draw with in-packet vertex data
    pub const DRAW_IMMD: u32 = 0x2900;
    /// Load vertex array pointers
    pub const LOAD_VBPNTR: u32 = 0x2F00;
    /// Set index buffer
    pub const INDX_BUFFER: u32 = 0x3300;
    /// Draw vertex buffers set up elsewhere
    pub const DRAW_VBUF_2: u32 = 0x3400;
    /// Draw with in-packet vertex data (v2)
    pub const DRAW_IMMD_2: u32 = 0x3500;
    /// Draw with indices into a vertex buffer
    pub const DRAW_INDX_2: u32 = 0x3600;
    /// Host data blit
    pub const CNTL_HOSTDATA_BLT: u32 = 0x9400;
    /// Multiple blits; relocation not supported
    pub const CNTL_BITBLT_MULTI: u32 = 0x9B00;
}

/// How the checker treats a Type 3 opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet3Class {
    /// Needs no inspection
    Safe,
    /// Embeds a host data blit destination
    HostdataBlit,
    /// Embeds a vertex array pointer table
    VertexBufferPointers,
    /// Embeds an index buffer address
    IndexBuffer,
}

impl Packet3Class {
    /// Classify an opcode; `None` means the opcode is rejected
    pub const fn of(opcode: u32) -> Option<Self> {
        match opcode {
            opcode::DRAW_IMMD
            | opcode::DRAW_IMMD_2
            | opcode::DRAW_VBUF_2
            | opcode::DRAW_INDX_2
            | opcode::WAIT_FOR_IDLE
            | opcode::NOP => Some(Self::Safe),
            opcode::CNTL_HOSTDATA_BLT => Some(Self::HostdataBlit),
            opcode::LOAD_VBPNTR => Some(Self::VertexBufferPointers),
            opcode::INDX_BUFFER => Some(Self::IndexBuffer),
            _ => None,
        }
    }
}

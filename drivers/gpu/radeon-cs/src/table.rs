//! # Register Permission Table
//!
//! Answers, for any register offset, whether a submitter may write it.
//! A table is built once per device generation from a list of ranges and
//! is read-only afterwards, so concurrent validations share it freely.
//!
//! Lookup is total: offsets outside the table, unaligned offsets and
//! offsets no range mentions are all [`Disposition::Forbidden`].

use alloc::vec;
use alloc::vec::Vec;

use crate::regs::*;

// =============================================================================
// DISPOSITION
// =============================================================================

/// How a relocated register value is patched with the resolved address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetPatch {
    /// 2D pitch/offset word: the low 22 bits hold an offset in 1 KiB units
    PitchOffset2d,
    /// Surface base: add the 32-byte aligned address to the local offset
    SurfaceBase,
    /// Add the address unmasked
    Displace,
}

impl OffsetPatch {
    /// Patch `value` with the resolved device address `addr`
    pub const fn apply(self, value: u32, addr: u32) -> u32 {
        match self {
            Self::PitchOffset2d => {
                let local = (value & RADEON_2D_OFFSET_MASK) << RADEON_2D_OFFSET_SHIFT;
                let offset = addr.wrapping_add(local) >> RADEON_2D_OFFSET_SHIFT;
                (value & !RADEON_2D_OFFSET_MASK) | offset
            },
            Self::SurfaceBase => value.wrapping_add(addr & 0xFFFF_FFE0),
            Self::Displace => value.wrapping_add(addr),
        }
    }
}

/// What a register write requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not writable by submitters
    Forbidden,
    /// Writable as-is
    Allowed,
    /// Holds a buffer address; must be relocated
    RelocateOffset(OffsetPatch),
    /// Clip/scissor state; bounds policy belongs to the table's consumer
    ValidateScissor,
}

/// Result of a table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterRule {
    /// Register offset in bytes
    pub offset: u32,
    /// Required handling
    pub disposition: Disposition,
}

/// A run of consecutive registers sharing one disposition
#[derive(Debug, Clone, Copy)]
pub struct RegRange {
    /// First register, in bytes
    pub start: u32,
    /// Number of registers
    pub count: u32,
    /// Disposition for every register in the run
    pub disposition: Disposition,
}

impl RegRange {
    /// Plain writable range
    pub const fn allowed(start: u32, count: u32) -> Self {
        Self {
            start,
            count,
            disposition: Disposition::Allowed,
        }
    }

    /// Range with a specific disposition
    pub const fn marked(start: u32, count: u32, disposition: Disposition) -> Self {
        Self {
            start,
            count,
            disposition,
        }
    }
}

// =============================================================================
// GENERATION TABLES
// =============================================================================

const RELOC_2D: Disposition = Disposition::RelocateOffset(OffsetPatch::PitchOffset2d);
const RELOC_SURFACE: Disposition = Disposition::RelocateOffset(OffsetPatch::SurfaceBase);

/// 2D engine state shared by every generation
const RANGES_2D: &[RegRange] = &[
    RegRange::marked(RADEON_SRC_PITCH_OFFSET, 1, RELOC_2D),
    RegRange::marked(RADEON_DST_PITCH_OFFSET, 1, RELOC_2D),
    RegRange::allowed(RADEON_DP_GUI_MASTER_CNTL, 1),
    RegRange::allowed(RADEON_DP_BRUSH_FRGD_CLR, 1),
    RegRange::allowed(RADEON_DP_SRC_FRGD_CLR, 1),
    RegRange::allowed(RADEON_DP_CNTL, 1),
    RegRange::allowed(RADEON_DP_WRITE_MASK, 1),
];

/// R100 / R200 3D state
const RANGES_R100: &[RegRange] = &[
    RegRange::allowed(RADEON_PP_MISC, 2),
    RegRange::allowed(RADEON_RB3D_BLENDCNTL, 1),
    RegRange::marked(RADEON_RB3D_DEPTHOFFSET, 1, RELOC_SURFACE),
    RegRange::allowed(RADEON_RB3D_DEPTHPITCH, 2),
    RegRange::allowed(RADEON_PP_CNTL, 2),
    RegRange::marked(RADEON_RB3D_COLOROFFSET, 1, RELOC_SURFACE),
    RegRange::marked(RADEON_RE_WIDTH_HEIGHT, 1, Disposition::ValidateScissor),
    RegRange::allowed(RADEON_SE_CNTL, 2),
    RegRange::allowed(RADEON_PP_TXFILTER_0, 2),
    RegRange::marked(RADEON_PP_TXOFFSET_0, 1, RELOC_SURFACE),
    RegRange::allowed(RADEON_PP_TXFILTER_1, 2),
    RegRange::marked(RADEON_PP_TXOFFSET_1, 1, RELOC_SURFACE),
    RegRange::allowed(RADEON_RB3D_COLORPITCH, 1),
    RegRange::allowed(RADEON_SE_VTX_FMT, 1),
    RegRange::marked(RADEON_RE_TOP_LEFT, 1, Disposition::ValidateScissor),
    RegRange::marked(R200_PP_TXOFFSET_0, 1, RELOC_SURFACE),
    RegRange::marked(R200_PP_TXOFFSET_1, 1, RELOC_SURFACE),
];

/// R300 - R500 3D state
const RANGES_R300: &[RegRange] = &[
    RegRange::marked(RADEON_RB3D_COLOROFFSET, 1, RELOC_SURFACE),
    RegRange::allowed(R300_SE_VPORT_XSCALE, 6),
    RegRange::allowed(R300_VAP_CNTL, 1),
    RegRange::allowed(R300_VAP_OUTPUT_VTX_FMT_0, 2),
    RegRange::allowed(R300_SE_VTE_CNTL, 2),
    RegRange::allowed(R300_VAP_CNTL_STATUS, 1),
    RegRange::allowed(R300_VAP_INPUT_CNTL_0, 2),
    RegRange::allowed(R300_VAP_CLIP_X_0, 4),
    RegRange::allowed(R300_VAP_PVS_STATE_FLUSH_REG, 1),
    RegRange::allowed(R300_VAP_PVS_CNTL_1, 3),
    RegRange::allowed(R300_GB_ENABLE, 1),
    RegRange::allowed(R300_GB_MSPOS0, 5),
    RegRange::allowed(R300_TX_ENABLE, 1),
    RegRange::allowed(R300_RE_POINTSIZE, 1),
    RegRange::allowed(R300_RE_SHADE, 4),
    RegRange::allowed(R300_RE_POLYGON_MODE, 5),
    RegRange::allowed(R300_RE_CULL_CNTL, 1),
    RegRange::allowed(R300_RS_CNTL_0, 2),
    RegRange::allowed(R300_RS_INTERP_0, 8),
    RegRange::allowed(R300_RS_ROUTE_0, 8),
    RegRange::marked(R300_SC_SCISSOR0, 2, Disposition::ValidateScissor),
    RegRange::allowed(R300_TX_FILTER_0, 16),
    RegRange::allowed(R300_TX_FILTER1_0, 16),
    RegRange::allowed(R300_TX_SIZE_0, 16),
    RegRange::allowed(R300_TX_FORMAT_0, 16),
    RegRange::allowed(R300_TX_PITCH_0, 16),
    RegRange::marked(R300_TX_OFFSET_0, 16, RELOC_SURFACE),
    RegRange::allowed(R300_TX_CHROMA_KEY_0, 16),
    RegRange::allowed(R300_TX_BORDER_COLOR_0, 16),
    RegRange::allowed(R300_PFS_CNTL_0, 3),
    RegRange::allowed(R300_PFS_NODE_0, 4),
    RegRange::allowed(R300_PFS_TEXI_0, 64),
    RegRange::allowed(R300_PFS_INSTR0_0, 64),
    RegRange::allowed(R300_PFS_PARAM_0_X, 64),
    RegRange::allowed(R300_RB3D_CBLEND, 2),
    RegRange::allowed(R300_RB3D_COLORMASK, 1),
    RegRange::marked(R300_RB3D_COLOROFFSET0, 1, RELOC_SURFACE),
    RegRange::allowed(R300_RB3D_COLORPITCH0, 1),
    RegRange::allowed(R300_ZB_CNTL, 3),
    RegRange::allowed(R300_ZB_FORMAT, 4),
    RegRange::marked(R300_ZB_DEPTHOFFSET, 1, RELOC_SURFACE),
    RegRange::allowed(R300_ZB_DEPTHPITCH, 1),
];

/// Ports streamed with the one-register-write bit; the uploaded block is
/// checked elsewhere at its own granularity
const UPLOAD_PORTS_R300: &[u32] = &[R300_VAP_PVS_UPLOAD_DATA];

// =============================================================================
// REGISTER TABLE
// =============================================================================

/// Per-generation register permission table
#[derive(Debug, Clone)]
pub struct RegisterTable {
    /// Table name for logs
    name: &'static str,
    /// One disposition per dword register
    flags: Vec<Disposition>,
    /// One-register-write upload ports exempt from per-register checks
    upload_ports: &'static [u32],
}

impl RegisterTable {
    /// Register space covered by a table, in bytes
    pub const SPAN: u32 = 0x1_0000;

    /// Table with every register forbidden
    pub fn empty(name: &'static str) -> Self {
        Self {
            name,
            flags: vec![Disposition::Forbidden; (Self::SPAN >> 2) as usize],
            upload_ports: &[],
        }
    }

    /// Build a table from ranges; later ranges override earlier ones
    pub fn from_ranges(
        name: &'static str,
        groups: &[&[RegRange]],
        upload_ports: &'static [u32],
    ) -> Self {
        let mut table = Self::empty(name);
        for range in groups.iter().flat_map(|g| g.iter()) {
            table.add_range(*range);
        }
        table.upload_ports = upload_ports;
        table
    }

    /// R100 / R200 table
    pub fn r100() -> Self {
        Self::from_ranges("r100", &[RANGES_2D, RANGES_R100], &[])
    }

    /// R300 - R500 table
    pub fn r300() -> Self {
        Self::from_ranges("r300", &[RANGES_2D, RANGES_R300], UPLOAD_PORTS_R300)
    }

    /// Mark a range; registers past the table span are ignored
    pub fn add_range(&mut self, range: RegRange) {
        let first = (range.start >> 2) as usize;
        for index in first..first.saturating_add(range.count as usize) {
            match self.flags.get_mut(index) {
                Some(slot) => *slot = range.disposition,
                None => {
                    log::warn!(
                        "{}: range {:#x}+{} exceeds register span",
                        self.name,
                        range.start,
                        range.count
                    );
                    break;
                },
            }
        }
    }

    /// Table name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up a register
    pub fn lookup(&self, offset: u32) -> RegisterRule {
        let disposition = if offset & 3 != 0 {
            Disposition::Forbidden
        } else {
            self.flags
                .get((offset >> 2) as usize)
                .copied()
                .unwrap_or(Disposition::Forbidden)
        };
        RegisterRule {
            offset,
            disposition,
        }
    }

    /// Whether every register in `[start, start + 4 * count)` is plainly allowed
    pub fn range_allowed(&self, start: u32, count: u32) -> bool {
        (0..count).all(|i| {
            let reg = start.wrapping_add(i.wrapping_mul(4));
            self.lookup(reg).disposition == Disposition::Allowed
        })
    }

    /// Whether `reg` is an upload port for one-register-write streams
    pub fn is_upload_port(&self, reg: u32) -> bool {
        self.upload_ports.contains(&reg)
    }
}

//! # Register Definitions
//!
//! Register offsets and bit definitions used by the checker and by the
//! completion emitters. Offsets are in bytes from the MMIO base, which is
//! also the unit used in packet 0 headers (after the `<< 2`).

// =============================================================================
// CP PACKET ENCODING
// =============================================================================

/// Type 0 packet (register writes)
pub const CP_PACKET0: u32 = 0x0000_0000;
/// Type 1 packet (two register writes, unused)
pub const CP_PACKET1: u32 = 0x4000_0000;
/// Type 2 packet (filler)
pub const CP_PACKET2: u32 = 0x8000_0000;
/// Type 3 packet (opcode)
pub const CP_PACKET3: u32 = 0xC000_0000;
/// Packet type field
pub const CP_PACKET_MASK: u32 = 0xC000_0000;
/// Packet body length field (body words minus one)
pub const CP_PACKET_COUNT_MASK: u32 = 0x3FFF_0000;
/// Packet 0 register field (dword index)
pub const CP_PACKET0_REG_MASK: u32 = 0x0000_1FFF;
/// Packet 0: write every body word to the base register
pub const CP_PACKET0_ONE_REG_WR: u32 = 1 << 15;
/// Packet 3 opcode field
pub const CP_PACKET3_OPCODE_MASK: u32 = 0x0000_FF00;

// =============================================================================
// CP / SCRATCH / INTERRUPT
// =============================================================================

/// Software interrupt status
pub const RADEON_GEN_INT_STATUS: u32 = 0x0044;
/// Fires the software interrupt when written to `GEN_INT_STATUS`
pub const RADEON_SW_INT_FIRE: u32 = 1 << 26;
/// Indirect buffer base (followed by `CP_IB_BUFSZ`)
pub const RADEON_CP_IB_BASE: u32 = 0x0738;
/// Scratch register 0
pub const RADEON_SCRATCH_REG0: u32 = 0x15E0;
/// Scratch register 3, used for the IRQ breadcrumb
pub const RADEON_SCRATCH_REG3: u32 = 0x15EC;
/// Scratch register 4, R100 completion id
pub const RADEON_SCRATCH_REG4: u32 = 0x15F0;
/// Last emitted software interrupt breadcrumb
pub const RADEON_LAST_SWI_REG: u32 = RADEON_SCRATCH_REG3;
/// Wait-until register
pub const RADEON_WAIT_UNTIL: u32 = 0x1720;
/// Wait for the 3D engine to be idle and clean
pub const RADEON_WAIT_3D_IDLECLEAN: u32 = 1 << 17;
/// Wait for the host path to be idle and clean
pub const RADEON_WAIT_HOST_IDLECLEAN: u32 = 1 << 18;

/// Resync address register; writing selects a scratch slot
pub const R300_CP_RESYNC_ADDR: u32 = 0x0778;
/// Resync data register
pub const R300_CP_RESYNC_DATA: u32 = 0x077C;
/// Destination cache control
pub const R300_RB3D_DSTCACHE_CTLSTAT: u32 = 0x4E4C;
/// Destination cache flush
pub const R300_RB3D_DC_FLUSH: u32 = 2 << 0;
/// Destination cache finish
pub const R300_RB3D_DC_FINISH: u32 = 1 << 4;

/// Scratch slot used for R300 completion ids
pub const R300_ID_SCRATCH: usize = 6;
/// Scratch slot used for R100 completion ids
pub const R100_ID_SCRATCH: usize = 4;

// =============================================================================
// 2D ENGINE
// =============================================================================

/// Source pitch/offset
pub const RADEON_SRC_PITCH_OFFSET: u32 = 0x1428;
/// Destination pitch/offset
pub const RADEON_DST_PITCH_OFFSET: u32 = 0x142C;
/// GUI master control
pub const RADEON_DP_GUI_MASTER_CNTL: u32 = 0x146C;
/// Brush foreground colour
pub const RADEON_DP_BRUSH_FRGD_CLR: u32 = 0x147C;
/// Source foreground colour
pub const RADEON_DP_SRC_FRGD_CLR: u32 = 0x15D8;
/// Datapath write mask
pub const RADEON_DP_WRITE_MASK: u32 = 0x16CC;
/// Datapath control
pub const RADEON_DP_CNTL: u32 = 0x16C0;
/// Offset mask inside a pitch/offset word
pub const RADEON_2D_OFFSET_MASK: u32 = 0x003F_FFFF;
/// Granularity shift of the 2D offset field
pub const RADEON_2D_OFFSET_SHIFT: u32 = 10;

// =============================================================================
// R100 / R200 3D
// =============================================================================

/// Pixel pipe misc
pub const RADEON_PP_MISC: u32 = 0x1C14;
/// Fog colour
pub const RADEON_PP_FOG_COLOR: u32 = 0x1C18;
/// Alpha blend control
pub const RADEON_RB3D_BLENDCNTL: u32 = 0x1C20;
/// Depth buffer offset
pub const RADEON_RB3D_DEPTHOFFSET: u32 = 0x1C24;
/// Depth buffer pitch
pub const RADEON_RB3D_DEPTHPITCH: u32 = 0x1C28;
/// Z/stencil control
pub const RADEON_RB3D_ZSTENCILCNTL: u32 = 0x1C2C;
/// Pixel pipe control
pub const RADEON_PP_CNTL: u32 = 0x1C38;
/// Render backend control
pub const RADEON_RB3D_CNTL: u32 = 0x1C3C;
/// Colour buffer offset
pub const RADEON_RB3D_COLOROFFSET: u32 = 0x1C40;
/// Rasteriser width/height (scissor-like)
pub const RADEON_RE_WIDTH_HEIGHT: u32 = 0x1C44;
/// Setup engine control
pub const RADEON_SE_CNTL: u32 = 0x1C4C;
/// Setup engine coordinate format
pub const RADEON_SE_COORD_FMT: u32 = 0x1C50;
/// Texture unit 0 filter
pub const RADEON_PP_TXFILTER_0: u32 = 0x1C54;
/// Texture unit 0 format
pub const RADEON_PP_TXFORMAT_0: u32 = 0x1C58;
/// Texture unit 0 offset
pub const RADEON_PP_TXOFFSET_0: u32 = 0x1C5C;
/// Texture unit 1 filter
pub const RADEON_PP_TXFILTER_1: u32 = 0x1C6C;
/// Texture unit 1 format
pub const RADEON_PP_TXFORMAT_1: u32 = 0x1C70;
/// Texture unit 1 offset
pub const RADEON_PP_TXOFFSET_1: u32 = 0x1C74;
/// Colour buffer pitch
pub const RADEON_RB3D_COLORPITCH: u32 = 0x1D40;
/// Setup engine vertex format
pub const RADEON_SE_VTX_FMT: u32 = 0x2080;
/// Rasteriser top/left (scissor-like)
pub const RADEON_RE_TOP_LEFT: u32 = 0x26C0;
/// R200 texture unit 0 offset
pub const R200_PP_TXOFFSET_0: u32 = 0x2D00;
/// R200 texture unit 1 offset
pub const R200_PP_TXOFFSET_1: u32 = 0x2D18;

// =============================================================================
// R300 3D
// =============================================================================

/// Viewport transform (6 registers)
pub const R300_SE_VPORT_XSCALE: u32 = 0x1D98;
/// VAP control
pub const R300_VAP_CNTL: u32 = 0x2080;
/// VAP output vertex format (2 registers)
pub const R300_VAP_OUTPUT_VTX_FMT_0: u32 = 0x2090;
/// Viewport transform enable (2 registers)
pub const R300_SE_VTE_CNTL: u32 = 0x20B0;
/// VAP status control
pub const R300_VAP_CNTL_STATUS: u32 = 0x2140;
/// VAP input control (2 registers)
pub const R300_VAP_INPUT_CNTL_0: u32 = 0x2150;
/// Vertex program upload port; streamed with the one-register-write bit
pub const R300_VAP_PVS_UPLOAD_DATA: u32 = 0x2208;
/// VAP clip (4 registers)
pub const R300_VAP_CLIP_X_0: u32 = 0x2220;
/// Vertex program state flush
pub const R300_VAP_PVS_STATE_FLUSH_REG: u32 = 0x2284;
/// Vertex program control (3 registers)
pub const R300_VAP_PVS_CNTL_1: u32 = 0x22D0;
/// Geometry block enable
pub const R300_GB_ENABLE: u32 = 0x4008;
/// Multisample positions (5 registers)
pub const R300_GB_MSPOS0: u32 = 0x4010;
/// Texture enable
pub const R300_TX_ENABLE: u32 = 0x4104;
/// Point size
pub const R300_RE_POINTSIZE: u32 = 0x421C;
/// Shade model (4 registers)
pub const R300_RE_SHADE: u32 = 0x4274;
/// Polygon mode (5 registers)
pub const R300_RE_POLYGON_MODE: u32 = 0x4288;
/// Cull control
pub const R300_RE_CULL_CNTL: u32 = 0x42B8;
/// Rasteriser setup control (2 registers)
pub const R300_RS_CNTL_0: u32 = 0x4300;
/// Rasteriser interpolators (8 registers)
pub const R300_RS_INTERP_0: u32 = 0x4310;
/// Rasteriser routing (8 registers)
pub const R300_RS_ROUTE_0: u32 = 0x4330;
/// Scissor top/left and bottom/right
pub const R300_SC_SCISSOR0: u32 = 0x43E0;
/// Texture filters (16 registers)
pub const R300_TX_FILTER_0: u32 = 0x4400;
/// Texture filters, second word (16 registers)
pub const R300_TX_FILTER1_0: u32 = 0x4440;
/// Texture sizes (16 registers)
pub const R300_TX_SIZE_0: u32 = 0x4480;
/// Texture formats (16 registers)
pub const R300_TX_FORMAT_0: u32 = 0x44C0;
/// Texture pitches (16 registers)
pub const R300_TX_PITCH_0: u32 = 0x4500;
/// Texture offsets (16 registers)
pub const R300_TX_OFFSET_0: u32 = 0x4540;
/// Texture chroma keys (16 registers)
pub const R300_TX_CHROMA_KEY_0: u32 = 0x4580;
/// Texture border colours (16 registers)
pub const R300_TX_BORDER_COLOR_0: u32 = 0x45C0;
/// Fragment shader control (3 registers)
pub const R300_PFS_CNTL_0: u32 = 0x4600;
/// Fragment shader nodes (4 registers)
pub const R300_PFS_NODE_0: u32 = 0x4610;
/// Fragment shader texture instructions (64 registers)
pub const R300_PFS_TEXI_0: u32 = 0x4620;
/// Fragment shader ALU instructions (64 registers)
pub const R300_PFS_INSTR0_0: u32 = 0x48C0;
/// Fragment shader constants (64 registers)
pub const R300_PFS_PARAM_0_X: u32 = 0x4C00;
/// Colour blend (2 registers)
pub const R300_RB3D_CBLEND: u32 = 0x4E04;
/// Colour write mask
pub const R300_RB3D_COLORMASK: u32 = 0x4E0C;
/// Colour buffer 0 offset
pub const R300_RB3D_COLOROFFSET0: u32 = 0x4E28;
/// Colour buffer 0 pitch
pub const R300_RB3D_COLORPITCH0: u32 = 0x4E38;
/// Z buffer control (3 registers)
pub const R300_ZB_CNTL: u32 = 0x4F00;
/// Z buffer format (4 registers)
pub const R300_ZB_FORMAT: u32 = 0x4F10;
/// Z buffer offset
pub const R300_ZB_DEPTHOFFSET: u32 = 0x4F20;
/// Z buffer pitch
pub const R300_ZB_DEPTHPITCH: u32 = 0x4F24;

// =============================================================================
// CHUNK IDS
// =============================================================================

/// Relocation table chunk
pub const RADEON_CHUNK_ID_RELOCS: u32 = 0x01;
/// Indirect buffer chunk
pub const RADEON_CHUNK_ID_IB: u32 = 0x02;
/// Legacy combined chunk (IB with inline relocations)
pub const RADEON_CHUNK_ID_OLD: u32 = 0xFF;

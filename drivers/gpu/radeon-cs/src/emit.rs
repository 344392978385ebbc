//! # Completion Emission
//!
//! After a stream is validated and assembled, the ring receives the IB
//! pointer followed by a breadcrumb carrying the submission's sequence id
//! and a software interrupt. The exact sequence differs per generation;
//! the variant is picked once at initialization.

use crate::packet::{cp_packet0, cp_packet2};
use crate::regs::*;
use crate::seqno::SequenceId;

// =============================================================================
// RING WRITER
// =============================================================================

/// Writer for the command processor ring
///
/// `begin` blocks until `ndw` words of ring space are free, so emission
/// cannot fail once a sequence id has been allocated.
pub trait RingWriter {
    /// Reserve `ndw` words
    fn begin(&mut self, ndw: usize);

    /// Write one word into the reservation
    fn out(&mut self, dw: u32);

    /// Close the reservation
    fn advance(&mut self);

    /// Publish written words to the command processor
    fn commit(&mut self);

    /// Bump and return the IRQ breadcrumb value
    fn update_breadcrumb(&mut self) -> u32;

    /// Read scratch register `index`
    fn scratch(&self, index: usize) -> u32;

    /// Write `value` to `reg` through a one-register packet 0
    fn out_reg(&mut self, reg: u32, value: u32) {
        self.out(cp_packet0(reg, 0));
        self.out(value);
    }
}

// =============================================================================
// EMITTER VARIANTS
// =============================================================================

/// Per-generation completion emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEmitter {
    /// R100 - RV250: id in scratch register 4
    R100,
    /// RV280 - R500: id in scratch register 6 via CP resync
    R300,
}

impl CompletionEmitter {
    /// Words reserved by one emission
    pub const fn ring_words(self) -> usize {
        match self {
            Self::R100 => 10,
            Self::R300 => 32,
        }
    }

    /// Kick the IB at `card_offset` and arrange completion signalling for `id`
    pub fn emit<W: RingWriter + ?Sized>(
        self,
        ring: &mut W,
        card_offset: u32,
        length_dw: u32,
        id: SequenceId,
    ) {
        let breadcrumb = ring.update_breadcrumb();
        log::debug!(
            "emit ib {:#x}+{} id {} breadcrumb {}",
            card_offset,
            length_dw,
            id,
            breadcrumb
        );
        match self {
            Self::R100 => Self::emit_r100(ring, card_offset, length_dw, id, breadcrumb),
            Self::R300 => Self::emit_r300(ring, card_offset, length_dw, id, breadcrumb),
        }
    }

    fn emit_r100<W: RingWriter + ?Sized>(
        ring: &mut W,
        card_offset: u32,
        length_dw: u32,
        id: SequenceId,
        breadcrumb: u32,
    ) {
        ring.begin(10);
        ring.out(cp_packet0(RADEON_CP_IB_BASE, 1));
        ring.out(card_offset);
        ring.out(length_dw);
        ring.out(cp_packet2());
        ring.out_reg(RADEON_SCRATCH_REG4, id.raw());
        ring.out_reg(RADEON_LAST_SWI_REG, breadcrumb);
        ring.out_reg(RADEON_GEN_INT_STATUS, RADEON_SW_INT_FIRE);
        ring.advance();
        ring.commit();
    }

    fn emit_r300<W: RingWriter + ?Sized>(
        ring: &mut W,
        card_offset: u32,
        length_dw: u32,
        id: SequenceId,
        breadcrumb: u32,
    ) {
        ring.begin(16);
        ring.out(cp_packet0(RADEON_CP_IB_BASE, 1));
        ring.out(card_offset);
        ring.out(length_dw);
        ring.out_reg(R300_RB3D_DSTCACHE_CTLSTAT, 0);
        // pad to the 16-word fetch boundary
        for _ in 0..11 {
            ring.out(cp_packet2());
        }
        ring.advance();
        ring.commit();

        ring.begin(16);
        ring.out_reg(R300_RB3D_DSTCACHE_CTLSTAT, R300_RB3D_DC_FLUSH);
        ring.out(cp_packet0(R300_CP_RESYNC_ADDR, 1));
        ring.out(R300_ID_SCRATCH as u32);
        ring.out(id.raw());
        ring.out_reg(
            R300_RB3D_DSTCACHE_CTLSTAT,
            R300_RB3D_DC_FINISH | R300_RB3D_DC_FLUSH,
        );
        ring.out_reg(
            RADEON_WAIT_UNTIL,
            RADEON_WAIT_3D_IDLECLEAN | RADEON_WAIT_HOST_IDLECLEAN,
        );
        ring.out_reg(RADEON_LAST_SWI_REG, breadcrumb);
        ring.out_reg(RADEON_GEN_INT_STATUS, RADEON_SW_INT_FIRE);
        for _ in 0..3 {
            ring.out(cp_packet2());
        }
        ring.advance();
        ring.commit();
    }

    /// Last id the hardware reported complete
    pub fn last_completed<W: RingWriter + ?Sized>(self, ring: &W) -> SequenceId {
        let slot = match self {
            Self::R100 => R100_ID_SCRATCH,
            Self::R300 => R300_ID_SCRATCH,
        };
        SequenceId::from_raw(ring.scratch(slot))
    }
}

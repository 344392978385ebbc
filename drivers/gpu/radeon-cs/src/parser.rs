//! # Packet Decoder & Validator
//!
//! Walks a command stream packet by packet, rejects anything that could
//! reach state the submitter does not own, and patches buffer handles
//! into device addresses in place.
//!
//! ## Stream walk
//!
//! Every packet, whatever its family, occupies `count + 2` words. The
//! whole packet must lie inside the stream before it is looked at.
//!
//! ## Relocation markers
//!
//! A relocated value is followed by a Type 3 NOP carrying its relocation
//! record(s):
//!
//! ```text
//! legacy:   PACKET3 | NOP | (2 << 16), handle, flags, pad
//! chunked:  PACKET3 | NOP | (0 << 16), index into relocation chunk
//! ```
//!
//! A Type 0 write is followed directly by its marker; a Type 3 packet's
//! marker starts right after the packet body.

use crate::error::{CsError, Result};
use crate::packet::{cp_packet3, opcode, Packet3Class, PacketHeader, PacketKind};
use crate::reloc::{RelocEntry, Relocator};
use crate::table::{Disposition, OffsetPatch, RegisterTable};

/// Count field of a legacy inline relocation marker
pub const LEGACY_MARKER_COUNT: u32 = 2;
/// Count field of a chunked relocation marker
pub const CHUNKED_MARKER_COUNT: u32 = 0;

// =============================================================================
// PARSER STATE
// =============================================================================

/// Where relocation records come from
#[derive(Debug, Clone, Copy)]
pub enum RelocEncoding<'a> {
    /// Records inline in the marker body
    Legacy,
    /// Records in a separate relocation chunk
    Chunked(&'a [u32]),
}

impl RelocEncoding<'_> {
    /// Exact marker word required after a relocated Type 0 write
    pub const fn packet0_marker(&self) -> u32 {
        match self {
            Self::Legacy => cp_packet3(opcode::NOP, LEGACY_MARKER_COUNT),
            Self::Chunked(_) => cp_packet3(opcode::NOP, CHUNKED_MARKER_COUNT),
        }
    }
}

/// Counters for one parsed stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Packets walked
    pub packets: u64,
    /// Relocations resolved and applied
    pub relocations: u64,
}

/// Validator for one command stream
pub struct CsParser<'a, R: Relocator + ?Sized> {
    table: &'a RegisterTable,
    relocator: &'a R,
    encoding: RelocEncoding<'a>,
    trace: bool,
    stats: ParseStats,
}

impl<'a, R: Relocator + ?Sized> CsParser<'a, R> {
    /// Create a parser; `relocs` selects the chunked encoding
    pub fn new(table: &'a RegisterTable, relocator: &'a R, relocs: Option<&'a [u32]>) -> Self {
        Self {
            table,
            relocator,
            encoding: match relocs {
                Some(words) => RelocEncoding::Chunked(words),
                None => RelocEncoding::Legacy,
            },
            trace: false,
            stats: ParseStats::default(),
        }
    }

    /// Log each packet at trace level
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Validate and patch `ib` in place
    ///
    /// On error `ib` may hold some applied patches; it must not be
    /// submitted.
    pub fn parse(mut self, ib: &mut [u32]) -> Result<ParseStats> {
        match self.walk(ib) {
            Ok(()) => Ok(self.stats),
            Err(e) => {
                log::error!("radeon cs ({}): {}", self.table.name(), e);
                Err(e)
            },
        }
    }

    fn walk(&mut self, ib: &mut [u32]) -> Result<()> {
        let len = ib.len();
        let mut offset = 0;

        while offset < len {
            let hdr = PacketHeader::new(ib[offset]);
            let stride = hdr.stride();
            let available = len - offset;
            if stride > available {
                return Err(CsError::TruncatedPacket {
                    offset,
                    needed: stride,
                    available,
                });
            }

            if self.trace {
                log::trace!(
                    "{:5}: {:#010x} {:?} count {}",
                    offset,
                    hdr.raw(),
                    hdr.kind(),
                    hdr.count()
                );
            }

            match hdr.kind() {
                PacketKind::Type0 => self.packet0(ib, offset, hdr)?,
                PacketKind::Type1 | PacketKind::Type2 => {},
                PacketKind::Type3 => self.packet3(ib, offset, hdr)?,
            }

            self.stats.packets += 1;
            offset += stride;
        }
        Ok(())
    }

    // =========================================================================
    // TYPE 0
    // =========================================================================

    fn packet0(&mut self, ib: &mut [u32], offset: usize, hdr: PacketHeader) -> Result<()> {
        let base = hdr.register();
        let nregs = if hdr.one_reg_write() {
            if self.table.is_upload_port(base) {
                return Ok(());
            }
            1
        } else {
            hdr.count() + 1
        };

        for i in 0..nregs {
            let reg = base + 4 * i as u32;
            match self.table.lookup(reg).disposition {
                Disposition::Forbidden => {
                    return Err(CsError::IllegalRegister { reg, offset });
                },
                Disposition::Allowed => {},
                Disposition::ValidateScissor => {
                    log::debug!("scissor register {:#x} at {}", reg, offset);
                },
                Disposition::RelocateOffset(patch) => {
                    // the marker follows the single value word
                    if hdr.count() != 0 {
                        return Err(CsError::MalformedRelocationMarker {
                            offset,
                            found: hdr.raw(),
                        });
                    }
                    self.relocate_packet0(ib, offset, reg, patch)?;
                },
            }
        }
        Ok(())
    }

    fn relocate_packet0(
        &mut self,
        ib: &mut [u32],
        offset: usize,
        reg: u32,
        patch: OffsetPatch,
    ) -> Result<()> {
        let marker = offset + 2;
        let found = *ib.get(marker).ok_or(CsError::TruncatedPacket {
            offset,
            needed: 3,
            available: ib.len() - offset,
        })?;
        if found != self.encoding.packet0_marker() {
            return Err(CsError::MalformedRelocationMarker {
                offset: marker,
                found,
            });
        }

        let addr = self.resolve(ib, marker, 0)?;
        let value = ib[offset + 1];
        ib[offset + 1] = patch.apply(value, addr);
        log::debug!(
            "reloc reg {:#x} at {}: {:#x} -> {:#x}",
            reg,
            offset,
            value,
            ib[offset + 1]
        );
        Ok(())
    }

    // =========================================================================
    // TYPE 3
    // =========================================================================

    fn packet3(&mut self, ib: &mut [u32], offset: usize, hdr: PacketHeader) -> Result<()> {
        let op = hdr.opcode();
        match Packet3Class::of(op) {
            None => Err(CsError::UnknownOpcode { opcode: op, offset }),
            Some(Packet3Class::Safe) => Ok(()),
            Some(Packet3Class::HostdataBlit) => self.hostdata_blit(ib, offset, hdr),
            Some(Packet3Class::VertexBufferPointers) => self.load_vbpntr(ib, offset, hdr),
            Some(Packet3Class::IndexBuffer) => self.index_buffer(ib, offset, hdr),
        }
    }

    /// Destination word after the blit header takes the 2D offset patch
    fn hostdata_blit(&mut self, ib: &mut [u32], offset: usize, hdr: PacketHeader) -> Result<()> {
        let dst = body_word(offset, hdr, 2)?;
        let addr = self.resolve(ib, offset + hdr.stride(), 0)?;
        ib[dst] = OffsetPatch::PitchOffset2d.apply(ib[dst], addr);
        Ok(())
    }

    /// Vertex array pointers
    ///
    /// Arrays are described in groups of two: one attribute word covering
    /// both arrays, then one pointer word per array. Counting the header as
    /// word 0, pointer `k` therefore sits at word `3 + 3 * (k / 2) + k % 2`.
    fn load_vbpntr(&mut self, ib: &mut [u32], offset: usize, hdr: PacketHeader) -> Result<()> {
        let nptr = ib[body_word(offset, hdr, 1)?] as usize;
        let marker = offset + hdr.stride();

        let mut pair = 0;
        while pair + 1 < nptr {
            self.add_pointer(ib, offset, hdr, marker, pair)?;
            self.add_pointer(ib, offset, hdr, marker, pair + 1)?;
            pair += 2;
        }
        if nptr % 2 == 1 {
            self.add_pointer(ib, offset, hdr, marker, nptr - 1)?;
        }
        Ok(())
    }

    fn add_pointer(
        &mut self,
        ib: &mut [u32],
        offset: usize,
        hdr: PacketHeader,
        marker: usize,
        slot: usize,
    ) -> Result<()> {
        let dst = body_word(offset, hdr, 3 + 3 * (slot / 2) + slot % 2)?;
        let addr = self.resolve(ib, marker, slot)?;
        ib[dst] = OffsetPatch::Displace.apply(ib[dst], addr);
        Ok(())
    }

    /// Index buffer address is added to, not replaced
    fn index_buffer(&mut self, ib: &mut [u32], offset: usize, hdr: PacketHeader) -> Result<()> {
        let dst = body_word(offset, hdr, 2)?;
        let addr = self.resolve(ib, offset + hdr.stride(), 0)?;
        ib[dst] = OffsetPatch::Displace.apply(ib[dst], addr);
        Ok(())
    }

    // =========================================================================
    // RELOCATION RECORDS
    // =========================================================================

    /// Read record `slot` of the marker at `marker`
    fn reloc_entry(&self, ib: &[u32], marker: usize, slot: usize) -> Result<RelocEntry> {
        let found = *ib.get(marker).ok_or(CsError::TruncatedPacket {
            offset: marker,
            needed: 1,
            available: 0,
        })?;
        let hdr = PacketHeader::new(found);
        if hdr.kind() != PacketKind::Type3 || hdr.opcode() != opcode::NOP {
            return Err(CsError::MalformedRelocationMarker {
                offset: marker,
                found,
            });
        }

        let malformed = CsError::MalformedRelocationMarker {
            offset: marker,
            found,
        };
        let truncated = CsError::TruncatedPacket {
            offset: marker,
            needed: hdr.stride(),
            available: ib.len() - marker,
        };
        let body = marker + 1;
        let body_len = hdr.count() + 1;

        match self.encoding {
            RelocEncoding::Legacy => {
                let first = 2 * slot;
                if first + 2 > body_len {
                    return Err(malformed);
                }
                let words = ib.get(body + first..body + first + 2).ok_or(truncated)?;
                Ok(RelocEntry::inline(words[0], words[1]))
            },
            RelocEncoding::Chunked(relocs) => {
                if slot >= body_len {
                    return Err(malformed);
                }
                let index = *ib.get(body + slot).ok_or(truncated)? as usize;
                if index % RelocEntry::DWORDS != 0 {
                    return Err(malformed);
                }
                let end = index.checked_add(RelocEntry::DWORDS).ok_or(malformed)?;
                let words: &[u32; 4] = relocs
                    .get(index..end)
                    .and_then(|w| w.try_into().ok())
                    .ok_or(malformed)?;
                Ok(RelocEntry::from_words(words))
            },
        }
    }

    fn resolve(&mut self, ib: &[u32], marker: usize, slot: usize) -> Result<u32> {
        let entry = self.reloc_entry(ib, marker, slot)?;
        let addr = self
            .relocator
            .relocate(&entry)
            .map_err(|cause| CsError::RelocationFailed {
                offset: marker,
                cause,
            })?;
        self.stats.relocations += 1;
        Ok(addr)
    }
}

/// Index of word `k` of the packet at `offset` (the header is word 0)
fn body_word(offset: usize, hdr: PacketHeader, k: usize) -> Result<usize> {
    if k < hdr.stride() {
        Ok(offset + k)
    } else {
        Err(CsError::TruncatedPacket {
            offset,
            needed: k + 1,
            available: hdr.stride(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{cp_packet0, cp_packet0_one_reg, cp_packet2};
    use crate::regs::*;
    use crate::reloc::{NoMmRelocator, RelocError};
    use crate::testing::CountingRelocator;

    const LEGACY_NOP: u32 = 0xC002_1000;
    const CHUNKED_NOP: u32 = 0xC000_1000;

    fn parse(table: &RegisterTable, ib: &mut [u32]) -> Result<ParseStats> {
        CsParser::new(table, &NoMmRelocator, None).parse(ib)
    }

    #[test]
    fn test_marker_words() {
        assert_eq!(RelocEncoding::Legacy.packet0_marker(), LEGACY_NOP);
        assert_eq!(RelocEncoding::Chunked(&[]).packet0_marker(), CHUNKED_NOP);
    }

    #[test]
    fn test_allowed_registers_pass() {
        let table = RegisterTable::r300();
        let mut ib = [
            cp_packet0(R300_ZB_FORMAT, 3),
            1,
            2,
            3,
            4,
            cp_packet3(opcode::WAIT_FOR_IDLE, 0),
            0,
        ];
        let before = ib;
        let stats = parse(&table, &mut ib).unwrap();
        assert_eq!(stats.packets, 2);
        assert_eq!(stats.relocations, 0);
        assert_eq!(ib, before);
    }

    #[test]
    fn test_illegal_register() {
        let table = RegisterTable::r300();
        let mut ib = [cp_packet0(RADEON_CP_IB_BASE, 0), 0x1000];
        assert_eq!(
            parse(&table, &mut ib),
            Err(CsError::IllegalRegister {
                reg: RADEON_CP_IB_BASE,
                offset: 0
            })
        );
    }

    #[test]
    fn test_every_register_checked() {
        let table = RegisterTable::r300();
        // GB_MSPOS0 is five registers wide; the sixth is past the range
        let mut ib = [cp_packet0(R300_GB_MSPOS0, 5), 0, 0, 0, 0, 0, 0];
        assert_eq!(
            parse(&table, &mut ib),
            Err(CsError::IllegalRegister {
                reg: R300_GB_MSPOS0 + 20,
                offset: 0
            })
        );
    }

    #[test]
    fn test_forbidden_sweep() {
        let table = RegisterTable::r100();
        // a type 0 header addresses registers below 0x8000
        for reg in (0..0x8000u32).step_by(4) {
            if table.lookup(reg).disposition != Disposition::Forbidden {
                continue;
            }
            let mut ib = [cp_packet0(reg, 0), 0];
            assert_eq!(
                parse(&table, &mut ib),
                Err(CsError::IllegalRegister { reg, offset: 0 }),
                "reg {:#x}",
                reg
            );
        }
    }

    #[test]
    fn test_pitch_offset_relocation() {
        let table = RegisterTable::r300();
        for &(local, addr) in &[(0x10u32, 0x0010_0000u32), (0x0, 0x0800_0000), (0x3F, 0x0123_4400)] {
            let value = (0x100 << 22) | local;
            let mut ib = [cp_packet0(RADEON_DST_PITCH_OFFSET, 0), value, LEGACY_NOP, addr, 0, 0];
            let stats = parse(&table, &mut ib).unwrap();
            assert_eq!(stats.relocations, 1);
            assert_eq!(ib[1] & !RADEON_2D_OFFSET_MASK, 0x100 << 22);
            assert_eq!(ib[1] & RADEON_2D_OFFSET_MASK, (addr >> 10) + local);
        }
    }

    #[test]
    fn test_surface_base_relocation() {
        let table = RegisterTable::r300();
        for &(local, addr) in &[(0x4u32, 0x0800_0000u32), (0x20, 0x0100_001F), (0x0, 0xFFFF_FFE0)] {
            let mut ib = [cp_packet0(R300_TX_OFFSET_0 + 8, 0), local, LEGACY_NOP, addr, 0, 0];
            parse(&table, &mut ib).unwrap();
            assert_eq!(ib[1], (addr & 0xFFFF_FFE0).wrapping_add(local));
        }
    }

    #[test]
    fn test_reloc_register_needs_single_write() {
        let table = RegisterTable::r300();
        let hdr = cp_packet0(R300_ZB_DEPTHOFFSET, 1);
        let mut ib = [hdr, 0, 0, LEGACY_NOP, 0, 0, 0];
        assert_eq!(
            parse(&table, &mut ib),
            Err(CsError::MalformedRelocationMarker { offset: 0, found: hdr })
        );
    }

    #[test]
    fn test_malformed_marker_legacy() {
        let table = RegisterTable::r300();
        let mut ib = [cp_packet0(R300_ZB_DEPTHOFFSET, 0), 0, CHUNKED_NOP, 0];
        assert_eq!(
            parse(&table, &mut ib),
            Err(CsError::MalformedRelocationMarker {
                offset: 2,
                found: CHUNKED_NOP
            })
        );
    }

    #[test]
    fn test_malformed_marker_chunked() {
        let table = RegisterTable::r300();
        let relocs = [0x1000, 4, 0, 0];

        let mut ib = [cp_packet0(R300_ZB_DEPTHOFFSET, 0), 0, LEGACY_NOP, 0, 0, 0];
        let r = CsParser::new(&table, &NoMmRelocator, Some(&relocs)).parse(&mut ib);
        assert_eq!(
            r,
            Err(CsError::MalformedRelocationMarker {
                offset: 2,
                found: LEGACY_NOP
            })
        );

        // unaligned index into the relocation chunk
        let mut ib = [cp_packet0(R300_ZB_DEPTHOFFSET, 0), 0, CHUNKED_NOP, 1];
        let r = CsParser::new(&table, &NoMmRelocator, Some(&relocs)).parse(&mut ib);
        assert_eq!(
            r,
            Err(CsError::MalformedRelocationMarker {
                offset: 2,
                found: CHUNKED_NOP
            })
        );

        // index past the relocation chunk
        let mut ib = [cp_packet0(R300_ZB_DEPTHOFFSET, 0), 0, CHUNKED_NOP, 4];
        let r = CsParser::new(&table, &NoMmRelocator, Some(&relocs)).parse(&mut ib);
        assert!(matches!(r, Err(CsError::MalformedRelocationMarker { offset: 2, .. })));
    }

    #[test]
    fn test_chunked_relocation() {
        let table = RegisterTable::r300();
        let relocs = [0, 0, 0, 0, 0x0040_0000, 4, 0, 0];
        let mut ib = [cp_packet0(R300_ZB_DEPTHOFFSET, 0), 0x8, CHUNKED_NOP, 4];
        let stats = CsParser::new(&table, &NoMmRelocator, Some(&relocs))
            .parse(&mut ib)
            .unwrap();
        assert_eq!(stats.relocations, 1);
        assert_eq!(ib[1], 0x0040_0008);
    }

    #[test]
    fn test_marker_past_stream() {
        let table = RegisterTable::r300();
        let mut ib = [cp_packet0(R300_ZB_DEPTHOFFSET, 0), 0];
        assert_eq!(
            parse(&table, &mut ib),
            Err(CsError::TruncatedPacket {
                offset: 0,
                needed: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_upload_port_carve_out() {
        let table = RegisterTable::r300();
        let mut ib = [cp_packet0_one_reg(R300_VAP_PVS_UPLOAD_DATA, 3), 1, 2, 3, 4];
        assert!(parse(&table, &mut ib).is_ok());

        // without the one-register bit the port and its neighbours are checked
        let mut ib = [cp_packet0(R300_VAP_PVS_UPLOAD_DATA, 0), 1];
        assert!(matches!(
            parse(&table, &mut ib),
            Err(CsError::IllegalRegister { .. })
        ));

        // the R100 table has no upload ports
        let table = RegisterTable::r100();
        let mut ib = [cp_packet0_one_reg(R300_VAP_PVS_UPLOAD_DATA, 0), 1];
        assert!(parse(&table, &mut ib).is_err());
    }

    #[test]
    fn test_one_reg_write_checks_base_only() {
        let table = RegisterTable::r300();
        // ZB_DEPTHPITCH is followed by a forbidden register
        let mut ib = [cp_packet0_one_reg(R300_ZB_DEPTHPITCH, 2), 1, 2, 3];
        assert!(parse(&table, &mut ib).is_ok());
    }

    #[test]
    fn test_scissor_registers_pass() {
        let table = RegisterTable::r300();
        let mut ib = [cp_packet0(R300_SC_SCISSOR0, 1), 0, 0x0FFF_0FFF];
        assert!(parse(&table, &mut ib).is_ok());
    }

    #[test]
    fn test_unknown_opcode_no_resolver_calls() {
        let table = RegisterTable::r300();
        let relocator = CountingRelocator::new(0x1000);
        for &op in &[opcode::CNTL_BITBLT_MULTI, 0x7700, 0x2500] {
            let hdr = cp_packet3(op, 2);
            let mut ib = [hdr, 0, 0, 0, LEGACY_NOP, 0, 0, 0];
            let r = CsParser::new(&table, &relocator, None).parse(&mut ib);
            assert_eq!(r, Err(CsError::UnknownOpcode { opcode: op, offset: 0 }));
        }
        assert_eq!(relocator.calls(), 0);
    }

    #[test]
    fn test_truncated_packet() {
        let table = RegisterTable::r300();
        let mut ib = [cp_packet0(R300_ZB_FORMAT, 3), 1, 2];
        assert_eq!(
            parse(&table, &mut ib),
            Err(CsError::TruncatedPacket {
                offset: 0,
                needed: 5,
                available: 3
            })
        );

        let mut ib = [cp_packet3(opcode::NOP, 0), 0, cp_packet3(opcode::NOP, 0x3FFF)];
        assert_eq!(
            parse(&table, &mut ib),
            Err(CsError::TruncatedPacket {
                offset: 2,
                needed: 0x4001,
                available: 1
            })
        );
    }

    #[test]
    fn test_filler_packets_skipped() {
        let table = RegisterTable::r300();
        // type 1 and type 2 content is never looked at
        let mut ib = [cp_packet2(), 0xFFFF_FFFF, CP_PACKET1 | (1 << 16), 0xDEAD, 0xBEEF];
        let stats = parse(&table, &mut ib).unwrap();
        assert_eq!(stats.packets, 2);
    }

    #[test]
    fn test_hostdata_blit() {
        let table = RegisterTable::r300();
        let value = (0x40 << 22) | 0x2;
        let mut ib = [
            cp_packet3(opcode::CNTL_HOSTDATA_BLT, 2),
            0xAAAA,
            value,
            0xBBBB,
            LEGACY_NOP,
            0x0020_0000,
            0,
            0,
        ];
        parse(&table, &mut ib).unwrap();
        assert_eq!(ib[1], 0xAAAA);
        assert_eq!(ib[2], OffsetPatch::PitchOffset2d.apply(value, 0x0020_0000));
        assert_eq!(ib[2] & RADEON_2D_OFFSET_MASK, 0x802);
        assert_eq!(ib[3], 0xBBBB);
    }

    #[test]
    fn test_index_buffer_adds() {
        let table = RegisterTable::r300();
        let mut ib = [
            cp_packet3(opcode::INDX_BUFFER, 2),
            0x8000_0000,
            0x0000_0123,
            16,
            LEGACY_NOP,
            0x0100_0000,
            0,
            0,
        ];
        parse(&table, &mut ib).unwrap();
        assert_eq!(ib[2], 0x0100_0123);
        assert_eq!(ib[3], 16);
    }

    #[test]
    fn test_vbpntr_slot_mapping() {
        let table = RegisterTable::r300();
        // three arrays: attr01, ptr0, ptr1, attr2, ptr2
        let mut ib = [
            cp_packet3(opcode::LOAD_VBPNTR, 5),
            3,
            0x0101,
            0x10,
            0x20,
            0x0202,
            0x30,
            cp_packet3(opcode::NOP, 5),
            0x1000,
            0,
            0x2000,
            0,
            0x3000,
            0,
        ];
        let stats = parse(&table, &mut ib).unwrap();
        assert_eq!(stats.relocations, 3);
        assert_eq!(&ib[1..7], &[3, 0x0101, 0x1010, 0x2020, 0x0202, 0x3030]);
    }

    #[test]
    fn test_vbpntr_marker_too_short() {
        let table = RegisterTable::r300();
        let mut ib = [
            cp_packet3(opcode::LOAD_VBPNTR, 3),
            2,
            0,
            0x10,
            0x20,
            LEGACY_NOP,
            0x1000,
            0,
            0,
        ];
        // second record would be body words 2..4 of a 3-word body
        assert_eq!(
            parse(&table, &mut ib),
            Err(CsError::MalformedRelocationMarker {
                offset: 5,
                found: LEGACY_NOP
            })
        );
    }

    #[test]
    fn test_vbpntr_destination_outside_packet() {
        let table = RegisterTable::r300();
        let mut ib = [cp_packet3(opcode::LOAD_VBPNTR, 1), 4, 0, LEGACY_NOP, 0, 0, 0];
        assert_eq!(
            parse(&table, &mut ib),
            Err(CsError::TruncatedPacket {
                offset: 0,
                needed: 4,
                available: 3
            })
        );
    }

    #[test]
    fn test_relocation_failure_carries_cause() {
        let table = RegisterTable::r300();
        let relocator = CountingRelocator::failing(RelocError::InvalidHandle(7));
        let mut ib = [cp_packet0(R300_ZB_DEPTHOFFSET, 0), 0, LEGACY_NOP, 7, 0, 0];
        let r = CsParser::new(&table, &relocator, None).parse(&mut ib);
        let err = r.unwrap_err();
        assert_eq!(
            err,
            CsError::RelocationFailed {
                offset: 2,
                cause: RelocError::InvalidHandle(7)
            }
        );
        assert_eq!(err.errno(), RelocError::InvalidHandle(7).errno());
        assert_eq!(relocator.calls(), 1);
        assert_eq!(ib[1], 0);
    }

    #[test]
    fn test_resolver_sees_records() {
        let table = RegisterTable::r300();
        let relocator = CountingRelocator::new(0);
        let mut ib = [cp_packet0(R300_ZB_DEPTHOFFSET, 0), 0, LEGACY_NOP, 0x55, 0x66, 0];
        CsParser::new(&table, &relocator, None)
            .with_trace(true)
            .parse(&mut ib)
            .unwrap();
        assert_eq!(relocator.last(), Some(RelocEntry::inline(0x55, 0x66)));
    }
}

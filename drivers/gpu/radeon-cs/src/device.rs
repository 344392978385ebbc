//! # Submission Service
//!
//! Per-device entry points for command stream submission.
//!
//! ## Flow
//!
//! ```text
//! ioctl args ──► Submission (owned chunks)
//!                    │
//!                    ▼
//!               IbGuard::acquire ─────────────────────────┐
//!                    │                                    │
//!                    ▼                                    │
//!               CsParser::parse  (validate + patch)       │ release on
//!                    │                                    │ every path
//!                    ▼                                    │
//!               assemble         (copy + WC flush)        │
//!                    │                                    │
//!                    ▼                                    │
//!               ring lock: next_id + emit ────────────────┘
//! ```
//!
//! Nothing reaches the ring unless every step before it succeeded.

use core::sync::atomic::{AtomicU64, Ordering};

use spin::{Mutex, Once};

use crate::chunk::{CsArgs, CsLegacyArgs, Submission, UserMemory};
use crate::config::{CsConfig, Generation};
use crate::emit::RingWriter;
use crate::error::{CsError, Result};
use crate::ib::{assemble, IbGuard, IbProvider};
use crate::parser::CsParser;
use crate::reloc::Relocator;
use crate::seqno::{SequenceAllocator, SequenceId};

// =============================================================================
// STATISTICS
// =============================================================================

/// Submission statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsStats {
    /// Submissions handed to the ring
    pub submitted: u64,
    /// Submissions rejected at any stage
    pub rejected: u64,
    /// Packets walked in accepted submissions
    pub packets: u64,
    /// Relocations applied in accepted submissions
    pub relocations: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    packets: AtomicU64,
    relocations: AtomicU64,
}

// =============================================================================
// SERVICE
// =============================================================================

struct DeviceState {
    config: CsConfig,
    generation: Generation,
}

/// Command stream submission service for one device
pub struct RadeonCs<R, P, W> {
    relocator: R,
    provider: P,
    ring: Mutex<W>,
    seq: SequenceAllocator,
    state: Once<DeviceState>,
    stats: StatCounters,
}

impl<R: Relocator, P: IbProvider, W: RingWriter> RadeonCs<R, P, W> {
    /// Create an uninitialized service
    pub fn new(relocator: R, provider: P, ring: W) -> Self {
        Self {
            relocator,
            provider,
            ring: Mutex::new(ring),
            seq: SequenceAllocator::new(),
            state: Once::new(),
            stats: StatCounters::default(),
        }
    }

    /// Select the register table and emitter for `config.family`
    ///
    /// Selection happens once; later calls keep the first selection.
    pub fn init(&self, config: CsConfig) -> Result<()> {
        if self.state.is_completed() {
            log::warn!("radeon cs: already initialized");
            return Ok(());
        }
        let generation = Generation::select(config.family)?;
        self.state.call_once(|| DeviceState { config, generation });
        Ok(())
    }

    /// Whether [`RadeonCs::init`] succeeded
    pub fn is_initialized(&self) -> bool {
        self.state.is_completed()
    }

    fn state(&self) -> Result<&DeviceState> {
        self.state.get().ok_or_else(|| {
            log::error!("radeon cs: called with no initialization");
            CsError::NoDevice
        })
    }

    // =========================================================================
    // ENTRY POINTS
    // =========================================================================

    /// Single-stream submission
    ///
    /// `args.cs_id` is zeroed on entry and holds the assigned id on success.
    pub fn cs_ioctl<M: UserMemory + ?Sized>(&self, mem: &M, args: &mut CsLegacyArgs) -> Result<()> {
        args.cs_id = SequenceId::NONE.raw();
        self.state()?;

        let loaded = self.tally(Submission::load_legacy(mem, args).map_err(load_failed))?;
        if let Some(mut submission) = loaded {
            args.cs_id = self.submit(&mut submission)?.raw();
        }
        Ok(())
    }

    /// Chunked submission
    ///
    /// `args.cs_id` is zeroed on entry and holds the assigned id on success.
    pub fn cs2_ioctl<M: UserMemory + ?Sized>(&self, mem: &M, args: &mut CsArgs) -> Result<()> {
        args.cs_id = SequenceId::NONE.raw();
        self.state()?;

        let loaded = self.tally(Submission::load_chunked(mem, args).map_err(load_failed))?;
        if let Some(mut submission) = loaded {
            args.cs_id = self.submit(&mut submission)?.raw();
        }
        Ok(())
    }

    /// Validate, assemble and emit a loaded submission
    pub fn submit(&self, submission: &mut Submission) -> Result<SequenceId> {
        let state = self.state()?;
        let result = self.run(state, submission);
        if let Ok(id) = result {
            self.stats.submitted.fetch_add(1, Ordering::Relaxed);
            log::debug!("radeon cs: submitted {}", id);
        }
        self.tally(result)
    }

    fn run(&self, state: &DeviceState, submission: &mut Submission) -> Result<SequenceId> {
        let length_dw = submission.ib().len();
        let mut ib = IbGuard::acquire(&self.provider, length_dw).map_err(|e| {
            log::error!("radeon cs: ib_get failed: {}", e);
            e
        })?;

        let (words, relocs) = submission.parts_mut();
        let parsed = CsParser::new(&state.generation.table, &self.relocator, relocs)
            .with_trace(state.config.trace_packets)
            .parse(words)?;
        assemble(ib.buffer_mut(), words)?;

        let card_offset = ib.card_offset();
        let id = {
            let mut ring = self.ring.lock();
            let id = self.seq.next_id();
            state
                .generation
                .emitter
                .emit(&mut *ring, card_offset, length_dw as u32, id);
            id
        };

        self.stats.packets.fetch_add(parsed.packets, Ordering::Relaxed);
        self.stats
            .relocations
            .fetch_add(parsed.relocations, Ordering::Relaxed);
        Ok(id)
    }

    fn tally<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    // =========================================================================
    // COMPLETION
    // =========================================================================

    /// Last id the hardware reported complete
    pub fn last_completed(&self) -> Result<SequenceId> {
        let state = self.state()?;
        let ring = self.ring.lock();
        Ok(state.generation.emitter.last_completed(&*ring))
    }

    /// Whether `id` has completed
    pub fn is_signaled(&self, id: SequenceId) -> Result<bool> {
        Ok(id.is_signaled_by(self.last_completed()?))
    }

    /// Most recently assigned id
    pub fn last_emitted(&self) -> SequenceId {
        self.seq.last_id()
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Statistics snapshot
    pub fn stats(&self) -> CsStats {
        CsStats {
            submitted: self.stats.submitted.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            packets: self.stats.packets.load(Ordering::Relaxed),
            relocations: self.stats.relocations.load(Ordering::Relaxed),
        }
    }

    /// Relocation resolver
    pub fn relocator(&self) -> &R {
        &self.relocator
    }

    /// IB provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run `f` with the ring locked
    pub fn with_ring<T>(&self, f: impl FnOnce(&mut W) -> T) -> T {
        f(&mut *self.ring.lock())
    }
}

fn load_failed(e: CsError) -> CsError {
    log::error!("radeon cs: load failed: {}", e);
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::CsChunkHeader;
    use crate::config::ChipFamily;
    use crate::error::LengthError;
    use crate::ib::HostIbPool;
    use crate::packet::{cp_packet0, cp_packet3, opcode};
    use crate::regs::*;
    use crate::reloc::{BufferObject, GemDomain, HandleTableRelocator, NoMmRelocator};
    use crate::testing::{FakeUserMemory, RecordingRing};
    use crate::MAX_IB_DWORDS;

    const IB_BASE: u32 = 0x0040_0000;

    fn device(family: ChipFamily) -> RadeonCs<NoMmRelocator, HostIbPool, RecordingRing> {
        let dev = RadeonCs::new(NoMmRelocator, HostIbPool::new(IB_BASE, 2), RecordingRing::new());
        dev.init(CsConfig::for_family(family)).unwrap();
        dev
    }

    fn legacy(mem: &mut FakeUserMemory, words: &[u32]) -> CsLegacyArgs {
        CsLegacyArgs {
            dwords: words.len() as u32,
            cs_id: 0xFFFF_FFFF,
            packets: mem.place_words(words),
        }
    }

    #[test]
    fn test_no_device() {
        let dev = RadeonCs::new(NoMmRelocator, HostIbPool::new(0, 1), RecordingRing::new());
        let mem = FakeUserMemory::new();
        let mut args = CsLegacyArgs {
            dwords: 1,
            cs_id: 9,
            packets: 0,
        };
        assert_eq!(dev.cs_ioctl(&mem, &mut args), Err(CsError::NoDevice));
        assert_eq!(args.cs_id, 0);
        assert_eq!(
            dev.cs2_ioctl(&mem, &mut CsArgs::default()),
            Err(CsError::NoDevice)
        );
        assert_eq!(dev.last_completed(), Err(CsError::NoDevice));
        assert!(!dev.is_initialized());
    }

    #[test]
    fn test_init_unsupported_family() {
        let dev = RadeonCs::new(NoMmRelocator, HostIbPool::new(0, 1), RecordingRing::new());
        assert_eq!(
            dev.init(CsConfig::for_family(ChipFamily::R600)),
            Err(CsError::UnsupportedFamily(ChipFamily::R600))
        );
        assert!(!dev.is_initialized());
        dev.init(CsConfig::for_family(ChipFamily::Rv380)).unwrap();
        assert!(dev.is_initialized());
    }

    #[test]
    fn test_legacy_end_to_end() {
        let dev = device(ChipFamily::R300);
        let mut mem = FakeUserMemory::new();
        let stream = [cp_packet0(R300_GB_ENABLE, 0), 1, cp_packet3(opcode::NOP, 0), 0];
        let mut args = legacy(&mut mem, &stream);

        dev.cs_ioctl(&mem, &mut args).unwrap();
        assert_ne!(args.cs_id, 0);
        assert_eq!(args.cs_id, dev.last_emitted().raw());
        assert_eq!(dev.provider().read_back(IB_BASE), Some(stream.to_vec()));

        dev.with_ring(|ring| {
            assert_eq!(ring.commits, 2);
            assert_eq!(&ring.words[1..3], &[IB_BASE, 4]);
            assert_eq!(ring.words[20], args.cs_id);
        });
        assert_eq!(
            dev.stats(),
            CsStats {
                submitted: 1,
                rejected: 0,
                packets: 2,
                relocations: 0,
            }
        );
    }

    #[test]
    fn test_length_boundary() {
        let dev = device(ChipFamily::R300);
        let mut mem = FakeUserMemory::new();
        let stream: Vec<u32> = [cp_packet3(opcode::NOP, 0), 0]
            .iter()
            .copied()
            .cycle()
            .take(MAX_IB_DWORDS)
            .collect();
        let mut args = legacy(&mut mem, &stream);
        dev.cs_ioctl(&mem, &mut args).unwrap();
        assert_eq!(args.cs_id, 1);

        args.dwords += 1;
        assert_eq!(
            dev.cs_ioctl(&mem, &mut args),
            Err(CsError::InvalidLength(LengthError::TooLarge {
                length_dw: 16385
            }))
        );
        assert_eq!(args.cs_id, 0);
        assert_eq!(dev.provider().acquired(), 1);
        assert_eq!(dev.stats().rejected, 1);
    }

    #[test]
    fn test_empty_submission() {
        let dev = device(ChipFamily::R300);
        let mem = FakeUserMemory::new();

        let mut args = CsLegacyArgs {
            dwords: 0,
            cs_id: 5,
            packets: 0,
        };
        assert_eq!(dev.cs_ioctl(&mem, &mut args), Ok(()));
        assert_eq!(args.cs_id, 0);

        let mut args = CsArgs {
            cs_id: 5,
            num_chunks: 0,
            chunks: 0,
        };
        assert_eq!(dev.cs2_ioctl(&mem, &mut args), Ok(()));
        assert_eq!(args.cs_id, 0);

        assert_eq!(dev.provider().acquired(), 0);
        assert!(dev.with_ring(|ring| ring.words.is_empty()));
        assert_eq!(dev.last_emitted(), SequenceId::NONE);
    }

    #[test]
    fn test_failure_releases_and_emits_nothing() {
        let dev = device(ChipFamily::R300);
        let mut mem = FakeUserMemory::new();
        let bad = [cp_packet0(RADEON_CP_IB_BASE, 0), 0];
        let mut args = legacy(&mut mem, &bad);

        assert_eq!(
            dev.cs_ioctl(&mem, &mut args),
            Err(CsError::IllegalRegister {
                reg: RADEON_CP_IB_BASE,
                offset: 0
            })
        );
        assert_eq!(args.cs_id, 0);
        assert_eq!(dev.provider().acquired(), 1);
        assert_eq!(dev.provider().released(), 1);
        assert_eq!(dev.provider().in_use(), 0);
        assert!(dev.with_ring(|ring| ring.words.is_empty()));
        assert_eq!(dev.last_emitted(), SequenceId::NONE);

        // the counter did not move
        let good = [cp_packet3(opcode::WAIT_FOR_IDLE, 0), 0];
        let mut args = legacy(&mut mem, &good);
        dev.cs_ioctl(&mem, &mut args).unwrap();
        assert_eq!(args.cs_id, 1);
        assert_eq!(dev.provider().released(), 2);
    }

    #[test]
    fn test_transfer_fault() {
        let dev = device(ChipFamily::R300);
        let mem = FakeUserMemory::new();
        let mut args = CsLegacyArgs {
            dwords: 4,
            cs_id: 0,
            packets: 0xBAD0_0000,
        };
        let err = dev.cs_ioctl(&mem, &mut args).unwrap_err();
        assert_eq!(err, CsError::TransferFault { addr: 0xBAD0_0000 });
        assert_eq!(err.errno(), -crate::error::EFAULT);
        assert_eq!(dev.provider().acquired(), 0);
    }

    #[test]
    fn test_round_trip_matches_validator() {
        let dev = device(ChipFamily::R300);
        let mut mem = FakeUserMemory::new();
        let stream = [
            cp_packet0(R300_ZB_DEPTHOFFSET, 0),
            0x10,
            cp_packet3(opcode::NOP, 2),
            0x0080_0000,
            0,
            0,
            cp_packet3(opcode::INDX_BUFFER, 2),
            0,
            0x40,
            8,
            cp_packet3(opcode::NOP, 2),
            0x0100_0000,
            0,
            0,
        ];

        let mut expected = stream;
        let table = crate::table::RegisterTable::r300();
        let parsed = CsParser::new(&table, &NoMmRelocator, None)
            .parse(&mut expected)
            .unwrap();
        assert_eq!(parsed.relocations, 2);
        assert_eq!(expected[1], 0x0080_0010);
        assert_eq!(expected[8], 0x0100_0040);

        let mut args = legacy(&mut mem, &stream);
        dev.cs_ioctl(&mem, &mut args).unwrap();
        assert_eq!(dev.provider().read_back(IB_BASE), Some(expected.to_vec()));
        assert_eq!(dev.stats().relocations, 2);
    }

    #[test]
    fn test_chunked_with_handle_table() {
        let relocator = HandleTableRelocator::new();
        relocator.insert(
            5,
            BufferObject {
                gpu_addr: 0x0800_0000,
                domains: GemDomain::VRAM,
                resident: true,
            },
        );
        let dev = RadeonCs::new(relocator, HostIbPool::new(IB_BASE, 1), RecordingRing::new());
        dev.init(CsConfig::for_family(ChipFamily::R420)).unwrap();

        let mut mem = FakeUserMemory::new();
        let ib = mem.place_words(&[
            cp_packet0(R300_RB3D_COLOROFFSET0, 0),
            0x20,
            cp_packet3(opcode::NOP, 0),
            4,
        ]);
        let relocs = mem.place_words(&[0, 0, 0, 0, 5, GemDomain::VRAM.bits(), 0, 0]);
        let headers = [
            mem.place_pod(&CsChunkHeader {
                chunk_id: RADEON_CHUNK_ID_RELOCS,
                length_dw: 8,
                chunk_data: relocs,
            }),
            mem.place_pod(&CsChunkHeader {
                chunk_id: RADEON_CHUNK_ID_IB,
                length_dw: 4,
                chunk_data: ib,
            }),
        ];
        let mut args = CsArgs {
            cs_id: 0,
            num_chunks: 2,
            chunks: mem.place_u64s(&headers),
        };

        dev.cs2_ioctl(&mem, &mut args).unwrap();
        assert_eq!(args.cs_id, 1);
        let words = dev.provider().read_back(IB_BASE).unwrap();
        assert_eq!(words[1], 0x0800_0020);

        // an unknown handle fails closed
        dev.relocator().remove(5);
        let err = dev.cs2_ioctl(&mem, &mut args).unwrap_err();
        assert!(matches!(err, CsError::RelocationFailed { offset: 2, .. }));
        assert_eq!(args.cs_id, 0);
        assert_eq!(dev.stats().submitted, 1);
        assert_eq!(dev.stats().rejected, 1);
    }

    #[test]
    fn test_r100_completion() {
        let dev = device(ChipFamily::Rv200);
        let mut mem = FakeUserMemory::new();
        let stream = [cp_packet0(RADEON_PP_CNTL, 1), 0, 0];
        let mut args = legacy(&mut mem, &stream);
        dev.cs_ioctl(&mem, &mut args).unwrap();
        let id = SequenceId::from_raw(args.cs_id);

        dev.with_ring(|ring| {
            assert_eq!(ring.words.len(), 10);
            assert_eq!(ring.words[5], id.raw());
        });
        assert_eq!(dev.is_signaled(id), Ok(false));
        dev.with_ring(|ring| ring.scratch_regs[R100_ID_SCRATCH] = id.raw());
        assert_eq!(dev.last_completed(), Ok(id));
        assert_eq!(dev.is_signaled(id), Ok(true));
    }

    #[test]
    fn test_ids_follow_submission_order() {
        let dev = device(ChipFamily::R350);
        let mut mem = FakeUserMemory::new();
        let stream = [cp_packet3(opcode::WAIT_FOR_IDLE, 0), 0];
        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut args = legacy(&mut mem, &stream);
            dev.cs_ioctl(&mem, &mut args).unwrap();
            ids.push(args.cs_id);
        }
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(dev.provider().acquired(), 3);
        assert_eq!(dev.provider().in_use(), 0);
    }
}

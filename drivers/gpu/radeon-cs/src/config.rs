//! # Configuration
//!
//! Chip families, per-generation selection and service configuration.

use crate::emit::CompletionEmitter;
use crate::error::{CsError, Result};
use crate::table::RegisterTable;

// =============================================================================
// CHIP FAMILY
// =============================================================================

/// Radeon chip families, in hardware order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChipFamily {
    /// Radeon 7200
    R100,
    /// Radeon 7000 / VE
    Rv100,
    /// Radeon IGP 320
    Rs100,
    /// Radeon 7500
    Rv200,
    /// Radeon IGP 340
    Rs200,
    /// Radeon 8500
    R200,
    /// Radeon 9000
    Rv250,
    /// Radeon 9100 IGP
    Rs300,
    /// Radeon 9200
    Rv280,
    /// Radeon 9700
    R300,
    /// Radeon 9800
    R350,
    /// Radeon 9600
    Rv350,
    /// Radeon X300 / X600
    Rv380,
    /// Radeon X800
    R420,
    /// Radeon X700
    Rv410,
    /// Radeon Xpress 200
    Rs400,
    /// Radeon X1300
    Rv515,
    /// Radeon X1800
    R520,
    /// Radeon X1600
    Rv530,
    /// Radeon X1900
    R580,
    /// Radeon HD 2900
    R600,
}

impl ChipFamily {
    /// Register table for this family
    pub fn register_table(self) -> Result<RegisterTable> {
        match self {
            f if f >= Self::R600 => Err(CsError::UnsupportedFamily(f)),
            f if f >= Self::R300 => Ok(RegisterTable::r300()),
            _ => Ok(RegisterTable::r100()),
        }
    }

    /// Completion emitter for this family
    pub fn emitter(self) -> Result<CompletionEmitter> {
        match self {
            f if f >= Self::R600 => Err(CsError::UnsupportedFamily(f)),
            f if f >= Self::Rv280 => Ok(CompletionEmitter::R300),
            _ => Ok(CompletionEmitter::R100),
        }
    }
}

// =============================================================================
// SERVICE CONFIGURATION
// =============================================================================

/// Command stream service configuration
#[derive(Debug, Clone)]
pub struct CsConfig {
    /// Detected chip family
    pub family: ChipFamily,
    /// Log every decoded packet at trace level
    pub trace_packets: bool,
}

impl Default for CsConfig {
    fn default() -> Self {
        Self {
            family: ChipFamily::R300,
            trace_packets: cfg!(feature = "debug"),
        }
    }
}

impl CsConfig {
    /// Configuration for a detected family
    pub fn for_family(family: ChipFamily) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }
}

/// Everything selected once per device from its family
#[derive(Debug)]
pub struct Generation {
    /// Chip family the selection was made for
    pub family: ChipFamily,
    /// Register permission table
    pub table: RegisterTable,
    /// Completion emitter variant
    pub emitter: CompletionEmitter,
}

impl Generation {
    /// Select table and emitter for `family`
    pub fn select(family: ChipFamily) -> Result<Self> {
        let emitter = family.emitter()?;
        let table = family.register_table()?;
        log::info!(
            "radeon cs: {:?} uses {} registers, {:?} emitter",
            family,
            table.name(),
            emitter
        );
        Ok(Self {
            family,
            table,
            emitter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_selection() {
        assert_eq!(ChipFamily::R100.emitter(), Ok(CompletionEmitter::R100));
        assert_eq!(ChipFamily::Rv250.emitter(), Ok(CompletionEmitter::R100));
        assert_eq!(ChipFamily::Rv280.emitter(), Ok(CompletionEmitter::R300));
        assert_eq!(ChipFamily::R580.emitter(), Ok(CompletionEmitter::R300));
        assert_eq!(
            ChipFamily::R600.emitter(),
            Err(CsError::UnsupportedFamily(ChipFamily::R600))
        );
    }

    #[test]
    fn test_table_selection() {
        assert_eq!(ChipFamily::Rv280.register_table().map(|t| t.name()), Ok("r100"));
        assert_eq!(ChipFamily::R300.register_table().map(|t| t.name()), Ok("r300"));
        assert!(ChipFamily::R600.register_table().is_err());
    }

    #[test]
    fn test_generation_select() {
        let generation = Generation::select(ChipFamily::R420).unwrap();
        assert_eq!(generation.family, ChipFamily::R420);
        assert_eq!(generation.emitter, CompletionEmitter::R300);
        assert_eq!(generation.table.name(), "r300");
        assert!(Generation::select(ChipFamily::R600).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = CsConfig::for_family(ChipFamily::Rv200);
        assert_eq!(config.family, ChipFamily::Rv200);
    }
}

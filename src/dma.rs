//! DMA addressing capability negotiated from MAC_HW_Feature1.

use memory_addr::PhysAddr;

use crate::error::ConfigError;

/// Width of the addresses the DMA engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWidth {
    Bits32,
    Bits40,
    Bits48,
}

impl AddressWidth {
    /// Decodes the ADDR64 feature field.
    pub fn from_feature(code: u32) -> Result<Self, ConfigError> {
        match code {
            0 => Ok(Self::Bits32),
            1 => Ok(Self::Bits40),
            2 => Ok(Self::Bits48),
            _ => Err(ConfigError::UnknownAddressWidth(code)),
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            Self::Bits32 => 32,
            Self::Bits40 => 40,
            Self::Bits48 => 48,
        }
    }

    /// Highest physical address a buffer may occupy.
    pub const fn max_physical_address(self) -> PhysAddr {
        PhysAddr::from_usize(((1u64 << self.bits()) - 1) as usize)
    }
}

/// DMA profile handed to queue engines and the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaCapability {
    pub width: AddressWidth,
    pub max_physical_address: PhysAddr,
    /// Scatter/gather lists may carry addresses above 4 GiB.
    pub sg64: bool,
}

impl DmaCapability {
    pub fn negotiate(address_width_code: u32) -> Result<Self, ConfigError> {
        let width = AddressWidth::from_feature(address_width_code)?;
        Ok(Self {
            width,
            max_physical_address: width.max_physical_address(),
            sg64: width != AddressWidth::Bits32,
        })
    }
}

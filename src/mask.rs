//! Interrupt-wanted mask and its mirror in the hardware enable registers.

use bitflags::bitflags;

use crate::regs::{ChannelInterrupts, MacInterrupts, RegisterFile};

bitflags! {
    /// Interrupt classes the driver currently wants delivered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InterruptsWanted: u8 {
        /// Link status, abnormal summary and fatal bus error.
        const STATE = 1 << 0;
        /// Channel 0 receive.
        const RX = 1 << 1;
        /// Channel 0 transmit.
        const TX = 1 << 2;
    }
}

impl InterruptsWanted {
    /// MAC_Interrupt_Enable value for this mask.
    pub fn mac_enable(self) -> MacInterrupts {
        let mut enable = MacInterrupts::empty();
        enable.set(MacInterrupts::LINK_STATUS, self.contains(Self::STATE));
        enable
    }

    /// DMA_CH0_Interrupt_Enable value for this mask. The normal summary bit
    /// gates every normal source and stays on.
    pub fn channel_enable(self) -> ChannelInterrupts {
        let mut enable = ChannelInterrupts::NORMAL_SUMMARY;
        enable.set(ChannelInterrupts::RX, self.contains(Self::RX));
        enable.set(ChannelInterrupts::TX, self.contains(Self::TX));
        enable.set(ChannelInterrupts::FATAL_BUS_ERROR, self.contains(Self::STATE));
        enable.set(ChannelInterrupts::ABNORMAL_SUMMARY, self.contains(Self::STATE));
        enable
    }
}

/// Authoritative interrupt-wanted mask.
///
/// Lives inside the subscription lock; holding `&mut InterruptMask` is the
/// proof that the lock is held.
#[derive(Debug, Default)]
pub struct InterruptMask {
    wanted: InterruptsWanted,
}

impl InterruptMask {
    pub const fn new() -> Self {
        Self {
            wanted: InterruptsWanted::empty(),
        }
    }

    pub fn wanted(&self) -> InterruptsWanted {
        self.wanted
    }

    /// Adds `bits` to the mask. Returns whether hardware was reprogrammed.
    pub fn enable(&mut self, regs: &RegisterFile, bits: InterruptsWanted) -> bool {
        self.update(regs, self.wanted | bits)
    }

    /// Removes `bits` from the mask. Returns whether hardware was reprogrammed.
    pub fn disable(&mut self, regs: &RegisterFile, bits: InterruptsWanted) -> bool {
        self.update(regs, self.wanted - bits)
    }

    fn update(&mut self, regs: &RegisterFile, new: InterruptsWanted) -> bool {
        let old = self.wanted;
        if old == new {
            return false;
        }
        self.wanted = new;
        regs.set_mac_interrupt_enable(new.mac_enable());
        regs.set_channel_interrupt_enable(new.channel_enable());
        trace!("interrupts wanted {:?} -> {:?}", old, new);
        true
    }
}

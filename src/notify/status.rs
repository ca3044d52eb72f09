//! Event buffer between the immediate handler and the deferred processor.
//!
//! Exactly one producer (the immediate handler) ORs observed status bits in;
//! exactly one consumer (the deferred processor) swaps the word with zero.
//! Both operations are single atomic instructions, so the handler never
//! waits on the consumer.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::regs::ChannelInterrupts;

/// Synthetic flag for a MAC link status event. Bit 31 of DMA_CH0_Status is
/// reserved, so it never collides with a channel bit.
pub const LINK_EVENT: u32 = 1 << 31;

/// A drained status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStatus(u32);

impl PendingStatus {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn channel(self) -> ChannelInterrupts {
        ChannelInterrupts::from_bits_retain(self.0 & !LINK_EVENT)
    }

    pub const fn link(self) -> bool {
        self.0 & LINK_EVENT != 0
    }

    /// Abnormal summary or fatal bus error reported.
    pub fn is_fault(self) -> bool {
        self.channel()
            .intersects(ChannelInterrupts::ABNORMAL_SUMMARY | ChannelInterrupts::FATAL_BUS_ERROR)
    }
}

/// Coalesced-but-unprocessed interrupt status.
#[derive(Debug, Default)]
pub struct InterruptStatusWord(AtomicU32);

impl InterruptStatusWord {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Merges newly observed status into the word (atomic OR).
    ///
    /// Returns the previous raw value.
    #[inline]
    pub fn accumulate(&self, channel: ChannelInterrupts, link: bool) -> u32 {
        let bits = (channel.bits() & !LINK_EVENT) | if link { LINK_EVENT } else { 0 };
        self.0.fetch_or(bits, Ordering::Release)
    }

    /// Atomically reads and clears the word. `None` when nothing is pending.
    #[inline]
    pub fn take(&self) -> Option<PendingStatus> {
        match self.0.swap(0, Ordering::AcqRel) {
            0 => None,
            raw => Some(PendingStatus(raw)),
        }
    }

    /// Current value without clearing it.
    #[inline]
    pub fn peek(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }
}

//! Diagnostic counters and the MMC statistics snapshot.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::regs::{self, RegisterFile};

/// Interrupt servicing counters.
///
/// Updated with relaxed atomics from the immediate handler and the deferred
/// processor; read only for diagnostics.
#[derive(Debug, Default)]
pub struct InterruptStats {
    pub isr_handled: AtomicU64,
    pub isr_ignored: AtomicU64,
    pub dpc_link_state: AtomicU64,
    pub dpc_rx: AtomicU64,
    pub dpc_tx: AtomicU64,
    pub dpc_abnormal_status: AtomicU64,
    pub dpc_fatal_bus_error: AtomicU64,
}

/// Plain copy of [`InterruptStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterruptStatsSnapshot {
    pub isr_handled: u64,
    pub isr_ignored: u64,
    pub dpc_link_state: u64,
    pub dpc_rx: u64,
    pub dpc_tx: u64,
    pub dpc_abnormal_status: u64,
    pub dpc_fatal_bus_error: u64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl InterruptStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_handled(&self) {
        bump(&self.isr_handled)
    }

    #[inline]
    pub fn record_ignored(&self) {
        bump(&self.isr_ignored)
    }

    #[inline]
    pub fn record_link_state(&self) {
        bump(&self.dpc_link_state)
    }

    #[inline]
    pub fn record_rx(&self) {
        bump(&self.dpc_rx)
    }

    #[inline]
    pub fn record_tx(&self) {
        bump(&self.dpc_tx)
    }

    #[inline]
    pub fn record_abnormal_status(&self) {
        bump(&self.dpc_abnormal_status)
    }

    #[inline]
    pub fn record_fatal_bus_error(&self) {
        bump(&self.dpc_fatal_bus_error)
    }

    pub fn snapshot(&self) -> InterruptStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        InterruptStatsSnapshot {
            isr_handled: load(&self.isr_handled),
            isr_ignored: load(&self.isr_ignored),
            dpc_link_state: load(&self.dpc_link_state),
            dpc_rx: load(&self.dpc_rx),
            dpc_tx: load(&self.dpc_tx),
            dpc_abnormal_status: load(&self.dpc_abnormal_status),
            dpc_fatal_bus_error: load(&self.dpc_fatal_bus_error),
        }
    }
}

/// MMC counters worth keeping from a controller about to be reset.
const MMC_COUNTERS: &[(&str, usize)] = &[
    ("tx_packets_good_bad", regs::MMC_TX_PACKET_COUNT_GOOD_BAD),
    ("tx_packets_good", regs::MMC_TX_PACKET_COUNT_GOOD),
    ("tx_underflow_errors", regs::MMC_TX_UNDERFLOW_ERROR_PACKETS),
    ("tx_carrier_errors", regs::MMC_TX_CARRIER_ERROR_PACKETS),
    ("tx_pause", regs::MMC_TX_PAUSE_PACKETS),
    ("rx_packets_good_bad", regs::MMC_RX_PACKET_COUNT_GOOD_BAD),
    ("rx_crc_errors", regs::MMC_RX_CRC_ERROR_PACKETS),
    ("rx_length_errors", regs::MMC_RX_LENGTH_ERROR_PACKETS),
    ("rx_pause", regs::MMC_RX_PAUSE_PACKETS),
    ("rx_fifo_overflow", regs::MMC_RX_FIFO_OVERFLOW_PACKETS),
    ("rx_watchdog_errors", regs::MMC_RX_WATCHDOG_ERROR_PACKETS),
];

/// Logs the interrupt counters and the hardware MMC counters.
pub fn log_final_statistics(stats: &InterruptStats, regs: &RegisterFile) {
    let s = stats.snapshot();
    info!(
        "isr handled={} ignored={}; dpc link={} rx={} tx={} abnormal={} fatal_bus={}",
        s.isr_handled,
        s.isr_ignored,
        s.dpc_link_state,
        s.dpc_rx,
        s.dpc_tx,
        s.dpc_abnormal_status,
        s.dpc_fatal_bus_error
    );
    for &(name, offset) in MMC_COUNTERS {
        info!("mmc {name}={}", regs.read(offset));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = InterruptStats::new();
        stats.record_handled();
        stats.record_handled();
        stats.record_ignored();
        stats.record_fatal_bus_error();

        let s = stats.snapshot();
        assert_eq!(s.isr_handled, 2);
        assert_eq!(s.isr_ignored, 1);
        assert_eq!(s.dpc_fatal_bus_error, 1);
        assert_eq!(s.dpc_rx, 0);
    }
}

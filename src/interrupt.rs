//! Two-phase interrupt servicing.
//!
//! The immediate handler runs in interrupt context: it samples and clears the
//! hardware status, folds it into the [`InterruptStatusWord`] and schedules
//! the deferred processor. It never takes the subscription lock.
//!
//! The deferred processor drains the status word until it reads zero, which
//! guarantees that every bit accumulated before a drain started is handled by
//! that drain or a later one.

use alloc::sync::Arc;

use crate::link::LinkStateTracker;
use crate::mask::InterruptsWanted;
use crate::notify::{Direction, InterruptStatusWord, NotificationGate, PendingStatus};
use crate::platform::DeferredQueue;
use crate::regs::{ChannelInterrupts, MacInterrupts, RegisterFile};
use crate::stats::InterruptStats;

pub struct InterruptPipeline {
    regs: RegisterFile,
    status: InterruptStatusWord,
    gate: Arc<NotificationGate>,
    link: LinkStateTracker,
    deferred: Arc<dyn DeferredQueue>,
    stats: InterruptStats,
}

impl InterruptPipeline {
    pub fn new(
        regs: RegisterFile,
        gate: Arc<NotificationGate>,
        link: LinkStateTracker,
        deferred: Arc<dyn DeferredQueue>,
    ) -> Self {
        Self {
            regs,
            status: InterruptStatusWord::new(),
            gate,
            link,
            deferred,
            stats: InterruptStats::new(),
        }
    }

    pub fn stats(&self) -> &InterruptStats {
        &self.stats
    }

    pub fn link(&self) -> &LinkStateTracker {
        &self.link
    }

    /// Raw status word, for diagnostics.
    pub fn pending(&self) -> u32 {
        self.status.peek()
    }

    /// Immediate handler.
    ///
    /// Returns `false` when the device had nothing pending (shared line,
    /// not ours).
    pub fn handle_interrupt(&self) -> bool {
        let mac = self.regs.mac_interrupt_status();
        let channel = self.regs.channel_status();
        let link = mac.contains(MacInterrupts::LINK_STATUS);

        if !link && channel.is_empty() {
            self.stats.record_ignored();
            return false;
        }

        if link {
            // Reading PHYIF status is what clears MAC link status.
            let _ = self.regs.take_phy_if_status();
        }
        if !channel.is_empty() {
            self.regs.ack_channel_status(channel);
        }

        self.status.accumulate(channel, link);
        self.deferred.schedule();
        self.stats.record_handled();
        true
    }

    /// Deferred processor. Runs until the status word reads zero.
    pub fn run_deferred(&self) {
        while let Some(pending) = self.status.take() {
            self.process(pending);
        }
    }

    fn process(&self, pending: PendingStatus) {
        let channel = pending.channel();

        if pending.is_fault() {
            // Reported only; the controller is left as it is.
            if channel.contains(ChannelInterrupts::ABNORMAL_SUMMARY) {
                self.stats.record_abnormal_status();
            }
            if channel.contains(ChannelInterrupts::FATAL_BUS_ERROR) {
                self.stats.record_fatal_bus_error();
            }
            error!("abnormal interrupt status {:#010x}", pending.raw());
        } else {
            trace!("interrupt status {:#010x}", pending.raw());
        }

        if pending.link() {
            self.stats.record_link_state();
            self.link.refresh();
        }

        let rx = channel.contains(ChannelInterrupts::RX);
        let tx = channel.contains(ChannelInterrupts::TX);
        if !rx && !tx {
            return;
        }

        let mut wanted = InterruptsWanted::empty();
        wanted.set(InterruptsWanted::RX, rx);
        wanted.set(InterruptsWanted::TX, tx);

        let mut sub = self.gate.lock();
        sub.disable(wanted);
        if rx && sub.consume_and_notify(Direction::Rx) {
            self.stats.record_rx();
        }
        if tx && sub.consume_and_notify(Direction::Tx) {
            self.stats.record_tx();
        }
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::filter::ReceiveFilterCapabilities;
    use crate::link::LinkState;
    use crate::mac::MacAddress;
    use crate::platform::{AdapterReporter, DatapathCapabilities, PacketQueue};
    use crate::regs::fake::FakeRegisters;
    use crate::regs::{DMA_CH0_STATUS, MAC_INTERRUPT_STATUS};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Counter {
        fn get(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl DeferredQueue for Counter {
        fn schedule(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl PacketQueue for Counter {
        fn notify_more_available(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl AdapterReporter for Counter {
        fn set_link_state(&self, _: LinkState) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn set_current_address(&self, _: MacAddress) {}
        fn set_permanent_address(&self, _: MacAddress) {}
        fn set_link_layer_capabilities(&self, _: u64, _: u64) {}
        fn set_datapath_capabilities(&self, _: DatapathCapabilities) {}
        fn set_receive_filter_capabilities(&self, _: ReceiveFilterCapabilities) {}
    }

    struct Harness {
        fake: Arc<FakeRegisters>,
        dpc: Arc<Counter>,
        links: Arc<Counter>,
        gate: Arc<NotificationGate>,
        pipeline: InterruptPipeline,
    }

    fn harness() -> Harness {
        let fake = Arc::new(FakeRegisters::default());
        let regs = RegisterFile::new(fake.clone());
        let dpc = Arc::new(Counter::default());
        let links = Arc::new(Counter::default());
        let gate = Arc::new(NotificationGate::new(regs.clone()));
        let link = LinkStateTracker::new(regs.clone(), links.clone());
        let pipeline = InterruptPipeline::new(regs, gate.clone(), link, dpc.clone());
        Harness {
            fake,
            dpc,
            links,
            gate,
            pipeline,
        }
    }

    #[test]
    fn test_nothing_pending_is_ignored() {
        let h = harness();
        assert!(!h.pipeline.handle_interrupt());
        assert_eq!(h.dpc.get(), 0);
        assert_eq!(h.fake.write_count(), 0);
        assert_eq!(h.pipeline.stats().snapshot().isr_ignored, 1);
    }

    #[test]
    fn test_handler_acks_and_schedules() {
        let h = harness();
        let status = ChannelInterrupts::RX | ChannelInterrupts::NORMAL_SUMMARY;
        h.fake.set(DMA_CH0_STATUS, status.bits());

        assert!(h.pipeline.handle_interrupt());
        assert_eq!(h.fake.writes_to(DMA_CH0_STATUS), [status.bits()]);
        assert_eq!(h.dpc.get(), 1);
        assert_eq!(h.pipeline.pending(), status.bits());
        assert_eq!(h.pipeline.stats().snapshot().isr_handled, 1);
    }

    #[test]
    fn test_link_event_refreshes_link() {
        let h = harness();
        h.fake.set(MAC_INTERRUPT_STATUS, MacInterrupts::LINK_STATUS.bits());

        assert!(h.pipeline.handle_interrupt());
        // No channel bits: the W1C register is left alone.
        assert!(h.fake.writes_to(DMA_CH0_STATUS).is_empty());

        h.pipeline.run_deferred();
        assert_eq!(h.links.get(), 1);
        assert_eq!(h.pipeline.stats().snapshot().dpc_link_state, 1);
        assert_eq!(h.pipeline.pending(), 0);
    }

    #[test]
    fn test_rx_notifies_registered_queue_once() {
        let h = harness();
        let queue = Arc::new(Counter::default());
        h.gate.register_rx_queue(queue.clone());

        h.fake.set(DMA_CH0_STATUS, ChannelInterrupts::RX.bits());
        h.pipeline.handle_interrupt();
        h.pipeline.handle_interrupt();
        h.pipeline.run_deferred();

        assert_eq!(queue.get(), 1);
        assert!(!h.gate.is_armed(Direction::Rx));
        assert!(!h.gate.wanted().contains(InterruptsWanted::RX));

        // Another event with nobody armed.
        h.pipeline.handle_interrupt();
        h.pipeline.run_deferred();
        assert_eq!(queue.get(), 1);
        assert_eq!(h.pipeline.stats().snapshot().dpc_rx, 1);
    }

    #[test]
    fn test_fault_counted_not_recovered() {
        let h = harness();
        h.gate.enable(InterruptsWanted::STATE);
        h.fake.set(
            DMA_CH0_STATUS,
            (ChannelInterrupts::ABNORMAL_SUMMARY | ChannelInterrupts::FATAL_BUS_ERROR).bits(),
        );

        h.pipeline.handle_interrupt();
        h.pipeline.run_deferred();

        let s = h.pipeline.stats().snapshot();
        assert_eq!(s.dpc_abnormal_status, 1);
        assert_eq!(s.dpc_fatal_bus_error, 1);
        assert_eq!(h.gate.wanted(), InterruptsWanted::STATE);
    }
}

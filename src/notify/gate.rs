//! Subscription state: interrupt-wanted mask plus one notification slot per
//! direction, all behind a single short-hold lock.
//!
//! # Protocol
//!
//! ```text
//!             arm(dir, q)                  deferred: consume_and_notify(dir)
//! ┌──────────┐ ─────────────> ┌────────┐ ─────────────────────────────────┐
//! │ Disarmed │                │ Armed  │   disable(dir); q.notify(); clear │
//! └──────────┘ <───────────── └────────┘ <────────────────────────────────┘
//!              disarm(dir)                  (back to Disarmed)
//! ```
//!
//! Arming enables the direction's interrupt and disarming disables it, in
//! the same critical section that stores or clears the handle. A consumer is
//! told at most once per arming and must arm again once it has drained its
//! work.

use alloc::sync::Arc;

use spin::{Mutex, MutexGuard};

use crate::mask::{InterruptMask, InterruptsWanted};
use crate::platform::PacketQueue;
use crate::regs::RegisterFile;

/// Data direction of a packet queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

impl Direction {
    pub const fn interrupts(self) -> InterruptsWanted {
        match self {
            Self::Rx => InterruptsWanted::RX,
            Self::Tx => InterruptsWanted::TX,
        }
    }
}

#[derive(Default)]
struct Subscription {
    mask: InterruptMask,
    rx: Option<Arc<dyn PacketQueue>>,
    tx: Option<Arc<dyn PacketQueue>>,
}

impl Subscription {
    fn slot(&mut self, direction: Direction) -> &mut Option<Arc<dyn PacketQueue>> {
        match direction {
            Direction::Rx => &mut self.rx,
            Direction::Tx => &mut self.tx,
        }
    }
}

/// Mediates the at-most-one-outstanding-notification handshake between the
/// deferred processor and the packet queues.
pub struct NotificationGate {
    regs: RegisterFile,
    inner: Mutex<Subscription>,
}

/// The subscription lock, held.
///
/// Every mask or slot operation goes through this guard, so holding the lock
/// is a precondition the compiler checks.
pub struct SubscriptionGuard<'a> {
    regs: &'a RegisterFile,
    inner: MutexGuard<'a, Subscription>,
}

impl NotificationGate {
    pub fn new(regs: RegisterFile) -> Self {
        Self {
            regs,
            inner: Mutex::new(Subscription::default()),
        }
    }

    /// Acquires the subscription lock.
    pub fn lock(&self) -> SubscriptionGuard<'_> {
        SubscriptionGuard {
            regs: &self.regs,
            inner: self.inner.lock(),
        }
    }

    pub fn register_rx_queue(&self, queue: Arc<dyn PacketQueue>) {
        self.lock().arm(Direction::Rx, queue)
    }

    pub fn clear_rx_queue(&self) {
        self.lock().disarm(Direction::Rx);
    }

    pub fn register_tx_queue(&self, queue: Arc<dyn PacketQueue>) {
        self.lock().arm(Direction::Tx, queue)
    }

    pub fn clear_tx_queue(&self) {
        self.lock().disarm(Direction::Tx);
    }

    /// Enables interrupt classes. Returns whether hardware was reprogrammed.
    pub fn enable(&self, bits: InterruptsWanted) -> bool {
        self.lock().enable(bits)
    }

    /// Disables interrupt classes. Returns whether hardware was reprogrammed.
    pub fn disable(&self, bits: InterruptsWanted) -> bool {
        self.lock().disable(bits)
    }

    pub fn wanted(&self) -> InterruptsWanted {
        self.lock().wanted()
    }

    pub fn is_armed(&self, direction: Direction) -> bool {
        self.lock().is_armed(direction)
    }
}

impl SubscriptionGuard<'_> {
    pub fn wanted(&self) -> InterruptsWanted {
        self.inner.mask.wanted()
    }

    pub fn enable(&mut self, bits: InterruptsWanted) -> bool {
        self.inner.mask.enable(self.regs, bits)
    }

    pub fn disable(&mut self, bits: InterruptsWanted) -> bool {
        self.inner.mask.disable(self.regs, bits)
    }

    pub fn is_armed(&self, direction: Direction) -> bool {
        match direction {
            Direction::Rx => self.inner.rx.is_some(),
            Direction::Tx => self.inner.tx.is_some(),
        }
    }

    /// Stores `queue` for `direction` and enables that direction's interrupt.
    /// Replaces any queue already armed.
    pub fn arm(&mut self, direction: Direction, queue: Arc<dyn PacketQueue>) {
        if self.inner.slot(direction).replace(queue).is_some() {
            debug!("{direction:?} queue re-armed while still armed");
        }
        self.enable(direction.interrupts());
    }

    /// Clears `direction`'s slot and disables its interrupt.
    pub fn disarm(&mut self, direction: Direction) -> Option<Arc<dyn PacketQueue>> {
        let queue = self.inner.slot(direction).take();
        self.disable(direction.interrupts());
        queue
    }

    /// If a queue is armed for `direction`: disables the direction, tells the
    /// queue more work is available, then clears the slot.
    ///
    /// Returns whether a notification was delivered.
    pub fn consume_and_notify(&mut self, direction: Direction) -> bool {
        let Some(queue) = self.inner.slot(direction).clone() else {
            return false;
        };
        self.disable(direction.interrupts());
        queue.notify_more_available();
        *self.inner.slot(direction) = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::regs::fake::FakeRegisters;

    #[derive(Default)]
    struct CountingQueue(AtomicUsize);

    impl PacketQueue for CountingQueue {
        fn notify_more_available(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gate() -> (Arc<FakeRegisters>, NotificationGate) {
        let fake = Arc::new(FakeRegisters::default());
        (fake.clone(), NotificationGate::new(RegisterFile::new(fake)))
    }

    #[test]
    fn test_register_enables_clear_disables() {
        let (_fake, gate) = gate();
        let queue = Arc::new(CountingQueue::default());

        gate.register_rx_queue(queue.clone());
        assert!(gate.is_armed(Direction::Rx));
        assert_eq!(gate.wanted(), InterruptsWanted::RX);

        gate.clear_rx_queue();
        assert!(!gate.is_armed(Direction::Rx));
        assert!(!gate.wanted().contains(InterruptsWanted::RX));
        assert_eq!(queue.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_consume_notifies_once() {
        let (_fake, gate) = gate();
        let queue = Arc::new(CountingQueue::default());
        gate.register_tx_queue(queue.clone());

        {
            let mut sub = gate.lock();
            assert!(sub.consume_and_notify(Direction::Tx));
            assert!(!sub.is_armed(Direction::Tx));
            assert!(!sub.wanted().contains(InterruptsWanted::TX));
            // Second event before re-arming: nobody to tell.
            assert!(!sub.consume_and_notify(Direction::Tx));
        }
        assert_eq!(queue.0.load(Ordering::SeqCst), 1);

        gate.register_tx_queue(queue.clone());
        assert!(gate.lock().consume_and_notify(Direction::Tx));
        assert_eq!(queue.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_directions_are_independent() {
        let (_fake, gate) = gate();
        let rx = Arc::new(CountingQueue::default());
        let tx = Arc::new(CountingQueue::default());
        gate.register_rx_queue(rx.clone());
        gate.register_tx_queue(tx.clone());

        assert!(gate.lock().consume_and_notify(Direction::Rx));
        assert_eq!(gate.wanted(), InterruptsWanted::TX);
        assert!(gate.is_armed(Direction::Tx));
        assert_eq!(rx.0.load(Ordering::SeqCst), 1);
        assert_eq!(tx.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_consume_without_queue_leaves_mask() {
        let (fake, gate) = gate();
        gate.enable(InterruptsWanted::STATE);
        let writes = fake.write_count();

        assert!(!gate.lock().consume_and_notify(Direction::Rx));
        assert_eq!(gate.wanted(), InterruptsWanted::STATE);
        assert_eq!(fake.write_count(), writes);
    }
}

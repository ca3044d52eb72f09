//! Seams between the control core and its host environment.
//!
//! The core never touches OS services directly: mapping, interrupt wiring,
//! delays and entropy come from a [`Platform`]; everything the network stack
//! should learn about goes out through an [`AdapterReporter`]; packet queues
//! plug in through [`QueueFactory`] and [`PacketQueue`].

use alloc::sync::Arc;

use axerrno::AxResult;
use memory_addr::PhysAddr;

use crate::dma::DmaCapability;
use crate::filter::ReceiveFilterCapabilities;
use crate::link::LinkState;
use crate::mac::MacAddress;
use crate::notify::NotificationGate;
use crate::regs::{RegisterFile, RegisterIo};

/// One entry of the host-provided resource list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwResource {
    Memory { start: PhysAddr, len: usize },
    Interrupt { vector: u32 },
    /// Anything else the firmware describes (DMA channels, I/O ports, ...).
    Other { kind: u8 },
}

/// Runs the deferred processor some time after [`schedule`](Self::schedule).
///
/// Scheduling while already scheduled must coalesce into a single run.
pub trait DeferredQueue: Send + Sync {
    fn schedule(&self);
}

/// Host services used during bring-up and tear-down.
pub trait Platform: Send + Sync {
    /// Maps `len` bytes of device memory at `start`, uncached.
    fn map_registers(&self, start: PhysAddr, len: usize) -> AxResult<Arc<dyn RegisterIo>>;

    /// Undoes [`map_registers`](Self::map_registers).
    fn unmap_registers(&self, start: PhysAddr, len: usize);

    /// Wires `vector` to the device's immediate handler and returns the queue
    /// used to schedule its deferred processor.
    fn connect_interrupt(&self, vector: u32) -> AxResult<Arc<dyn DeferredQueue>>;

    /// Undoes [`connect_interrupt`](Self::connect_interrupt).
    fn disconnect_interrupt(&self, vector: u32);

    /// Busy-waits for `us` microseconds.
    fn stall_us(&self, us: u32);

    /// Fills `buf` from a cryptographically secure source.
    fn fill_random(&self, buf: &mut [u8]);
}

/// A packet-queue consumer that wants to hear about completed work.
pub trait PacketQueue: Send + Sync {
    /// More work may be available. Edge-triggered: called at most once per
    /// arming. Runs with the subscription lock held, so it must not call
    /// back into the [`NotificationGate`].
    fn notify_more_available(&self);
}

/// Everything a queue engine needs to drive its DMA channel.
#[derive(Clone)]
pub struct QueueResources {
    pub regs: RegisterFile,
    pub channel: usize,
    pub dma: DmaCapability,
    /// Used by the queue to arm and disarm its notification.
    pub gate: Arc<NotificationGate>,
}

/// Creates descriptor-ring engines on request of the network stack.
pub trait QueueFactory {
    fn create(&self, resources: QueueResources) -> AxResult<Arc<dyn PacketQueue>>;
}

/// Data path limits published to the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatapathCapabilities {
    pub dma: DmaCapability,
    pub mtu: u32,
    pub max_transfer: usize,
}

/// Sink for what the core tells the network stack about the adapter.
pub trait AdapterReporter: Send + Sync {
    fn set_link_state(&self, state: LinkState);
    fn set_current_address(&self, addr: MacAddress);
    fn set_permanent_address(&self, addr: MacAddress);
    /// Maximum transmit and receive link speeds, in bits per second.
    fn set_link_layer_capabilities(&self, max_tx_bps: u64, max_rx_bps: u64);
    fn set_datapath_capabilities(&self, caps: DatapathCapabilities);
    fn set_receive_filter_capabilities(&self, caps: ReceiveFilterCapabilities);
}

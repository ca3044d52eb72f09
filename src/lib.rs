#![cfg_attr(not(test), no_std)]

//! # EQoS Controller Core
//!
//! Control core of a driver for the Synopsys DesignWare Ethernet QoS MAC. It
//! is designed for `no_std` environments and uses the `alloc` crate for
//! shared ownership.
//!
//! ## Architecture
//!
//! The crate is organized into layers, leaves first:
//!
//! ### Hardware Access
//! - [`RegisterFile`]: Typed accessors over the memory-mapped registers, with
//!   dedicated calls for clear-on-read and write-one-to-clear registers
//! - [`InterruptMask`]: Interrupt-wanted mask mirrored into the enable registers
//!
//! ### Event Delivery
//! - [`NotificationGate`]: Edge-triggered, at-most-once notification of packet queues
//! - [`LinkStateTracker`]: Keeps MAC speed/duplex in step with the PHY
//! - [`InterruptPipeline`]: Lock-free immediate handler plus deferred processor
//!
//! ### Lifecycle
//! - [`EqosDevice`]: Resource acquisition, power transitions and release
//! - [`DeviceConfig`]: Host-supplied settings
//!
//! Descriptor rings, PHY management and packet buffers live outside this
//! crate and plug in through the traits in [`platform`].
//!
//! ## Examples
//!
//! ```rust,ignore
//! use eqos::{DeviceConfig, EqosDevice, HwResource};
//!
//! let mut dev = EqosDevice::new(platform, adapter, DeviceConfig::default());
//! dev.acquire_resources(&[
//!     HwResource::Memory { start: base, len: 0x10000 },
//!     HwResource::Interrupt { vector: 40 },
//! ])?;
//!
//! // Hand the pipeline to the host's interrupt glue.
//! let pipeline = dev.interrupt_pipeline().unwrap();
//! // isr:  pipeline.handle_interrupt()
//! // dpc:  pipeline.run_deferred()
//!
//! dev.power_on()?;
//! let rx = dev.create_rx_queue(&ring_factory)?;
//! // ...
//! dev.power_off()?;
//! dev.release_resources()?;
//! ```

extern crate alloc;
#[macro_use]
extern crate log;

mod config;
mod device;
mod dma;
mod error;
mod filter;
mod interrupt;
mod lifecycle;
mod link;
mod mac;
mod mask;
mod notify;
pub mod platform;
pub mod regs;
mod reset;
mod stats;

pub use config::DeviceConfig;
pub use device::{DeviceState, EqosDevice, HwFeatures};
pub use dma::{AddressWidth, DmaCapability};
pub use error::{ConfigError, EqosError, EqosResult};
pub use filter::{MAX_MULTICAST, PacketFilterFlags, ReceiveFilter, ReceiveFilterCapabilities};
pub use interrupt::InterruptPipeline;
pub use lifecycle::{LifecyclePhase, PhaseCell};
pub use link::{ConnectState, Duplex, LinkState, LinkStateTracker};
pub use mac::{MacAddress, MacSource, resolve_current_address};
pub use mask::{InterruptMask, InterruptsWanted};
pub use notify::{
    Direction, InterruptStatusWord, LINK_EVENT, NotificationGate, PendingStatus,
    SubscriptionGuard,
};
pub use platform::{
    AdapterReporter, DatapathCapabilities, DeferredQueue, HwResource, PacketQueue, Platform,
    QueueFactory, QueueResources,
};
pub use regs::{MmioRegisters, RegisterFile, RegisterIo};
pub use reset::poll_with_retry;
pub use stats::{InterruptStats, InterruptStatsSnapshot};

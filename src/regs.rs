//! Typed view over the EQoS memory-mapped control registers.
//!
//! Only the registers the control core touches are modeled. Offsets and bit
//! layouts follow the Synopsys DesignWare Ethernet QoS 5.x register map.
//!
//! Most registers are plain read/write. A few have side effects on access and
//! are listed in [`SIDE_EFFECT_REGISTERS`]; those get dedicated accessors on
//! [`RegisterFile`] (`take_*` / `ack_*`) so call sites never confuse a
//! destructive read with an ordinary one.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;
use memory_addr::VirtAddr;

use crate::mac::MacAddress;

// ---------------------------------------------------------------------------
// Offsets
// ---------------------------------------------------------------------------

pub const MAC_CONFIGURATION: usize = 0x0000;
pub const MAC_PACKET_FILTER: usize = 0x0008;
pub const MAC_TX_FLOW_CTRL: usize = 0x0070;
pub const MAC_RX_FLOW_CTRL: usize = 0x0090;
pub const MAC_RX_CTRL0: usize = 0x00A0;
pub const MAC_INTERRUPT_STATUS: usize = 0x00B0;
pub const MAC_INTERRUPT_ENABLE: usize = 0x00B4;
pub const MAC_1US_TIC_COUNTER: usize = 0x00DC;
/// Clear-on-read: reading clears the pending link status interrupt.
pub const MAC_PHYIF_CONTROL_STATUS: usize = 0x00F8;
pub const MAC_VERSION: usize = 0x0110;
pub const MAC_HW_FEATURE0: usize = 0x011C;
pub const MAC_HW_FEATURE1: usize = 0x0120;
pub const MAC_HW_FEATURE2: usize = 0x0124;
pub const MAC_HW_FEATURE3: usize = 0x0128;
const MAC_ADDRESS_BASE: usize = 0x0300;

pub const MMC_CONTROL: usize = 0x0700;
pub const MMC_TX_PACKET_COUNT_GOOD_BAD: usize = 0x0718;
pub const MMC_TX_UNDERFLOW_ERROR_PACKETS: usize = 0x0748;
pub const MMC_TX_CARRIER_ERROR_PACKETS: usize = 0x0760;
pub const MMC_TX_PACKET_COUNT_GOOD: usize = 0x0768;
pub const MMC_TX_PAUSE_PACKETS: usize = 0x0770;
pub const MMC_RX_PACKET_COUNT_GOOD_BAD: usize = 0x0780;
pub const MMC_RX_CRC_ERROR_PACKETS: usize = 0x0794;
pub const MMC_RX_LENGTH_ERROR_PACKETS: usize = 0x07C8;
pub const MMC_RX_PAUSE_PACKETS: usize = 0x07D0;
pub const MMC_RX_FIFO_OVERFLOW_PACKETS: usize = 0x07D4;
pub const MMC_RX_WATCHDOG_ERROR_PACKETS: usize = 0x07DC;

const MTL_QUEUE_BASE: usize = 0x0D00;
const MTL_QUEUE_STRIDE: usize = 0x40;
const MTL_TX_OPERATION_MODE: usize = 0x00;
const MTL_RX_OPERATION_MODE: usize = 0x30;

/// Self-clearing software reset lives in bit 0.
pub const DMA_MODE: usize = 0x1000;
pub const DMA_SYSBUS_MODE: usize = 0x1004;

const DMA_CHANNEL_BASE: usize = 0x1100;
const DMA_CHANNEL_STRIDE: usize = 0x80;
const DMA_CH_CONTROL: usize = 0x00;
const DMA_CH_INTERRUPT_ENABLE: usize = 0x34;
/// Write-one-to-clear.
const DMA_CH_STATUS: usize = 0x60;

/// Size of the register window the core needs mapped (MAC, MTL, DMA channel 0).
pub const REGISTER_FILE_SIZE: usize = 0x1200;

/// Number of MAC address slots addressable through the low register bank.
pub const MAC_ADDRESS_SLOTS: usize = 32;

/// Software reset request / in-progress bit of [`DMA_MODE`].
pub const DMA_MODE_SOFTWARE_RESET: u32 = 1 << 0;

/// Offset of a DMA channel register block.
#[inline]
pub const fn dma_channel(channel: usize) -> usize {
    DMA_CHANNEL_BASE + channel * DMA_CHANNEL_STRIDE
}

/// Offset of an MTL queue register block.
#[inline]
pub const fn mtl_queue(queue: usize) -> usize {
    MTL_QUEUE_BASE + queue * MTL_QUEUE_STRIDE
}

/// Offset of the high half of MAC address slot `index`.
#[inline]
pub const fn mac_address_high(index: usize) -> usize {
    MAC_ADDRESS_BASE + index * 8
}

/// Offset of the low half of MAC address slot `index`.
#[inline]
pub const fn mac_address_low(index: usize) -> usize {
    MAC_ADDRESS_BASE + index * 8 + 4
}

pub const DMA_CH0_CONTROL: usize = dma_channel(0) + DMA_CH_CONTROL;
pub const DMA_CH0_INTERRUPT_ENABLE: usize = dma_channel(0) + DMA_CH_INTERRUPT_ENABLE;
pub const DMA_CH0_STATUS: usize = dma_channel(0) + DMA_CH_STATUS;
pub const MTL_TXQ0_OPERATION_MODE: usize = mtl_queue(0) + MTL_TX_OPERATION_MODE;
pub const MTL_RXQ0_OPERATION_MODE: usize = mtl_queue(0) + MTL_RX_OPERATION_MODE;

// ---------------------------------------------------------------------------
// Access side effects
// ---------------------------------------------------------------------------

/// What an access does to hardware state besides transferring the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearSemantics {
    /// Reading clears the pending condition the register reports.
    OnRead,
    /// Writing a one to a bit clears it.
    WriteOneToClear,
    /// A written one starts an operation that hardware clears on completion.
    SelfClearing,
}

/// One entry of the side-effect table.
#[derive(Debug, Clone, Copy)]
pub struct RegisterDesc {
    pub name: &'static str,
    pub offset: usize,
    pub width: u8,
    pub clear: ClearSemantics,
}

/// Registers whose accesses have side effects. Every other modeled register
/// is a plain read/write location.
pub const SIDE_EFFECT_REGISTERS: &[RegisterDesc] = &[
    RegisterDesc {
        name: "MAC_PHYIF_Control_Status",
        offset: MAC_PHYIF_CONTROL_STATUS,
        width: 32,
        clear: ClearSemantics::OnRead,
    },
    RegisterDesc {
        name: "DMA_CH0_Status",
        offset: DMA_CH0_STATUS,
        width: 32,
        clear: ClearSemantics::WriteOneToClear,
    },
    RegisterDesc {
        name: "DMA_Mode",
        offset: DMA_MODE,
        width: 32,
        clear: ClearSemantics::SelfClearing,
    },
];

/// Looks up the side-effect entry for `offset`, if the register has one.
pub fn side_effects(offset: usize) -> Option<&'static RegisterDesc> {
    SIDE_EFFECT_REGISTERS.iter().find(|d| d.offset == offset)
}

// ---------------------------------------------------------------------------
// Raw access
// ---------------------------------------------------------------------------

/// Primitive 32-bit register access.
///
/// Each call is one uncached bus transaction; implementations must not batch,
/// cache or reorder accesses across calls.
pub trait RegisterIo: Send + Sync {
    fn read32(&self, offset: usize) -> u32;
    fn write32(&self, offset: usize, value: u32);
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")] {
        #[inline(always)]
        fn io_barrier() {
            // SAFETY: a data synchronization barrier has no memory-safety effects.
            unsafe { core::arch::asm!("dsb sy", options(nostack, preserves_flags)) }
        }
    } else if #[cfg(target_arch = "riscv64")] {
        #[inline(always)]
        fn io_barrier() {
            // SAFETY: fence only orders device and memory accesses.
            unsafe { core::arch::asm!("fence iorw, iorw", options(nostack, preserves_flags)) }
        }
    } else {
        #[inline(always)]
        fn io_barrier() {
            core::sync::atomic::fence(Ordering::SeqCst);
        }
    }
}

/// [`RegisterIo`] over a mapped MMIO window.
pub struct MmioRegisters {
    base: VirtAddr,
    len: usize,
}

// SAFETY: the window is device memory; every access is a volatile load/store
// that the hardware serializes.
unsafe impl Send for MmioRegisters {}
unsafe impl Sync for MmioRegisters {}

impl MmioRegisters {
    /// Wraps an already mapped, uncached register window.
    ///
    /// # Safety
    ///
    /// `base..base + len` must stay mapped as device memory for the lifetime
    /// of the returned value and must be 4-byte aligned.
    pub unsafe fn new(base: VirtAddr, len: usize) -> Self {
        Self { base, len }
    }

    #[inline]
    fn ptr(&self, offset: usize) -> *mut u32 {
        debug_assert!(offset % 4 == 0 && offset + 4 <= self.len);
        (self.base.as_usize() + offset) as *mut u32
    }
}

impl RegisterIo for MmioRegisters {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: the mapping contract of `new` covers `offset`.
        let value = unsafe { core::ptr::read_volatile(self.ptr(offset)) };
        io_barrier();
        value
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        io_barrier();
        // SAFETY: the mapping contract of `new` covers `offset`.
        unsafe { core::ptr::write_volatile(self.ptr(offset), value) }
    }
}

// ---------------------------------------------------------------------------
// Register values
// ---------------------------------------------------------------------------

#[inline]
const fn field(value: u32, shift: u32, width: u32) -> u32 {
    (value >> shift) & ((1 << width) - 1)
}

#[inline]
const fn with_field(value: u32, shift: u32, width: u32, field: u32) -> u32 {
    let mask = ((1 << width) - 1) << shift;
    (value & !mask) | ((field << shift) & mask)
}

#[inline]
const fn with_bit(value: u32, bit: u32, set: bool) -> u32 {
    with_field(value, bit, 1, set as u32)
}

bitflags! {
    /// MAC_Interrupt_Status. Shares its layout with MAC_Interrupt_Enable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MacInterrupts: u32 {
        /// RGMII/SGMII link status change (RGSMIIIS / RGSMIIIE).
        const LINK_STATUS = 1 << 0;
    }
}

bitflags! {
    /// DMA_CHx_Status. Shares its layout with DMA_CHx_Interrupt_Enable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelInterrupts: u32 {
        const TX = 1 << 0;
        const TX_STOPPED = 1 << 1;
        const TX_BUFFER_UNAVAILABLE = 1 << 2;
        const RX = 1 << 6;
        const RX_BUFFER_UNAVAILABLE = 1 << 7;
        const RX_STOPPED = 1 << 8;
        const RX_WATCHDOG = 1 << 9;
        const EARLY_TX = 1 << 10;
        const EARLY_RX = 1 << 11;
        const FATAL_BUS_ERROR = 1 << 12;
        const CONTEXT_DESCRIPTOR_ERROR = 1 << 13;
        const ABNORMAL_SUMMARY = 1 << 14;
        const NORMAL_SUMMARY = 1 << 15;
        // Error bits and reserved bits are carried through untouched.
        const _ = !0;
    }
}

bitflags! {
    /// MAC_Packet_Filter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MacPacketFilter: u32 {
        const PROMISCUOUS = 1 << 0;
        const PASS_ALL_MULTICAST = 1 << 4;
        const DISABLE_BROADCAST = 1 << 5;
    }
}

/// Port select encoding of MAC_Configuration bits PS:FES.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PortSelectSpeed {
    Speed1000M = 0b00,
    Speed10M = 0b10,
    Speed100M = 0b11,
}

/// MAC_Configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacConfiguration(pub u32);

impl MacConfiguration {
    pub const fn receiver_enable(self) -> bool {
        field(self.0, 0, 1) != 0
    }
    pub const fn with_receiver_enable(self, on: bool) -> Self {
        Self(with_bit(self.0, 0, on))
    }
    pub const fn transmitter_enable(self) -> bool {
        field(self.0, 1, 1) != 0
    }
    pub const fn with_transmitter_enable(self, on: bool) -> Self {
        Self(with_bit(self.0, 1, on))
    }
    pub const fn with_disable_carrier_sense_during_transmit(self, on: bool) -> Self {
        Self(with_bit(self.0, 9, on))
    }
    pub const fn full_duplex(self) -> bool {
        field(self.0, 13, 1) != 0
    }
    pub const fn with_full_duplex(self, on: bool) -> Self {
        Self(with_bit(self.0, 13, on))
    }
    /// Raw PS:FES field.
    pub const fn port_select(self) -> u32 {
        field(self.0, 14, 2)
    }
    pub const fn with_port_select(self, speed: PortSelectSpeed) -> Self {
        Self(with_field(self.0, 14, 2, speed as u32))
    }
    pub const fn with_packet_burst_enable(self, on: bool) -> Self {
        Self(with_bit(self.0, 18, on))
    }
}

/// MAC_PHYIF_Control_Status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhyIfControlStatus(pub u32);

impl PhyIfControlStatus {
    pub const fn full_duplex(self) -> bool {
        field(self.0, 16, 1) != 0
    }
    /// LNKSPEED: 0 = 2.5 MHz, 1 = 25 MHz, 2 = 125 MHz.
    pub const fn speed_code(self) -> u32 {
        field(self.0, 17, 2)
    }
    pub const fn link_up(self) -> bool {
        field(self.0, 19, 1) != 0
    }
}

/// MAC_Version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacVersion(pub u32);

impl MacVersion {
    pub const fn snps_version(self) -> u8 {
        field(self.0, 0, 8) as u8
    }
    pub const fn user_version(self) -> u8 {
        field(self.0, 8, 8) as u8
    }
}

/// MAC_HW_Feature0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HwFeature0(pub u32);

impl HwFeature0 {
    /// 1000 Mb/s GMII/RGMII interface present.
    pub const fn gmii(self) -> bool {
        field(self.0, 1, 1) != 0
    }
    /// Number of MAC address slots, including slot 0.
    pub const fn mac_addr_count(self) -> u32 {
        field(self.0, 18, 5)
    }
}

/// MAC_HW_Feature1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HwFeature1(pub u32);

impl HwFeature1 {
    /// Encoded as `128 << n` bytes.
    pub const fn rx_fifo_size(self) -> u32 {
        field(self.0, 0, 5)
    }
    /// Encoded as `128 << n` bytes.
    pub const fn tx_fifo_size(self) -> u32 {
        field(self.0, 6, 5)
    }
    /// ADDR64: 0 = 32 bit, 1 = 40 bit, 2 = 48 bit.
    pub const fn address_width(self) -> u32 {
        field(self.0, 14, 2)
    }
}

/// MAC_Tx_Flow_Ctrl (queue 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacTxFlowCtrl(pub u32);

impl MacTxFlowCtrl {
    pub const fn with_flow_control_enable(self, on: bool) -> Self {
        Self(with_bit(self.0, 1, on))
    }
    pub const fn with_pause_time(self, time: u16) -> Self {
        Self(with_field(self.0, 16, 16, time as u32))
    }
}

/// MTL_TxQ0_Operation_Mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MtlTxOperationMode(pub u32);

impl MtlTxOperationMode {
    const QUEUE_ENABLED: u32 = 2;

    pub const fn with_store_and_forward(self, on: bool) -> Self {
        Self(with_bit(self.0, 1, on))
    }
    pub const fn with_queue_enabled(self) -> Self {
        Self(with_field(self.0, 2, 2, Self::QUEUE_ENABLED))
    }
    pub const fn queue_size(self) -> u32 {
        field(self.0, 16, 9)
    }
    /// Queue size in 256-byte blocks minus one.
    pub const fn with_queue_size(self, blocks: u32) -> Self {
        Self(with_field(self.0, 16, 9, blocks))
    }
}

/// MTL_RxQ0_Operation_Mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MtlRxOperationMode(pub u32);

impl MtlRxOperationMode {
    pub const fn with_forward_undersized_good_packets(self, on: bool) -> Self {
        Self(with_bit(self.0, 3, on))
    }
    pub const fn with_forward_error_packets(self, on: bool) -> Self {
        Self(with_bit(self.0, 4, on))
    }
    pub const fn with_store_and_forward(self, on: bool) -> Self {
        Self(with_bit(self.0, 5, on))
    }
    pub const fn with_hardware_flow_control(self, on: bool) -> Self {
        Self(with_bit(self.0, 7, on))
    }
    /// RFA: flow control activates at `full - (n + 1) / 2 KB`.
    pub const fn with_flow_control_activate(self, n: u32) -> Self {
        Self(with_field(self.0, 8, 6, n))
    }
    /// RFD: flow control deactivates at `full - (n + 1) / 2 KB`.
    pub const fn with_flow_control_deactivate(self, n: u32) -> Self {
        Self(with_field(self.0, 14, 6, n))
    }
    pub const fn queue_size(self) -> u32 {
        field(self.0, 20, 10)
    }
    pub const fn with_queue_size(self, blocks: u32) -> Self {
        Self(with_field(self.0, 20, 10, blocks))
    }
}

/// DMA_SysBus_Mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DmaSysBusMode(pub u32);

impl DmaSysBusMode {
    pub const fn with_fixed_burst(self, on: bool) -> Self {
        Self(with_bit(self.0, 0, on))
    }
    pub const fn with_burst_length_4(self, on: bool) -> Self {
        Self(with_bit(self.0, 1, on))
    }
    pub const fn with_burst_length_8(self, on: bool) -> Self {
        Self(with_bit(self.0, 2, on))
    }
    pub const fn with_burst_length_16(self, on: bool) -> Self {
        Self(with_bit(self.0, 3, on))
    }
    pub const fn with_mixed_burst(self, on: bool) -> Self {
        Self(with_bit(self.0, 14, on))
    }
    pub const fn with_axi_max_read_outstanding(self, n: u32) -> Self {
        Self(with_field(self.0, 16, 4, n))
    }
    pub const fn with_axi_max_write_outstanding(self, n: u32) -> Self {
        Self(with_field(self.0, 24, 4, n))
    }
}

/// DMA_CHx_Control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelDmaControl(pub u32);

impl ChannelDmaControl {
    pub const fn with_pbl_x8(self, on: bool) -> Self {
        Self(with_bit(self.0, 16, on))
    }
    /// Gap between descriptors, in bus-width units.
    pub const fn with_descriptor_skip_length(self, n: u32) -> Self {
        Self(with_field(self.0, 18, 3, n))
    }
}

// ---------------------------------------------------------------------------
// Register file
// ---------------------------------------------------------------------------

/// Typed register accessors over a [`RegisterIo`].
///
/// Cloning shares the same mapping. The mapping itself is owned by the
/// lifecycle code, which retires every clone before unmapping.
#[derive(Clone)]
pub struct RegisterFile {
    io: Arc<dyn RegisterIo>,
    mapped: Arc<AtomicBool>,
}

impl RegisterFile {
    pub fn new(io: Arc<dyn RegisterIo>) -> Self {
        Self {
            io,
            mapped: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Marks the mapping as gone. Later accesses trip a debug assertion.
    pub(crate) fn retire(&self) {
        self.mapped.store(false, Ordering::Release);
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped.load(Ordering::Acquire)
    }

    /// Plain read. Do not use for registers listed in [`SIDE_EFFECT_REGISTERS`]
    /// unless the side effect is intended.
    #[inline]
    pub fn read(&self, offset: usize) -> u32 {
        debug_assert!(self.is_mapped(), "register read {offset:#x} after unmap");
        self.io.read32(offset)
    }

    #[inline]
    pub fn write(&self, offset: usize, value: u32) {
        debug_assert!(self.is_mapped(), "register write {offset:#x} after unmap");
        self.io.write32(offset, value)
    }

    pub fn mac_configuration(&self) -> MacConfiguration {
        MacConfiguration(self.read(MAC_CONFIGURATION))
    }

    pub fn set_mac_configuration(&self, config: MacConfiguration) {
        self.write(MAC_CONFIGURATION, config.0)
    }

    pub fn mac_interrupt_status(&self) -> MacInterrupts {
        MacInterrupts::from_bits_retain(self.read(MAC_INTERRUPT_STATUS))
    }

    pub fn set_mac_interrupt_enable(&self, enable: MacInterrupts) {
        self.write(MAC_INTERRUPT_ENABLE, enable.bits())
    }

    /// Reads MAC_PHYIF_Control_Status. The read clears a pending link status
    /// interrupt, so the returned value is the only observation of it.
    pub fn take_phy_if_status(&self) -> PhyIfControlStatus {
        PhyIfControlStatus(self.read(MAC_PHYIF_CONTROL_STATUS))
    }

    /// Reads DMA_CH0_Status without clearing it.
    pub fn channel_status(&self) -> ChannelInterrupts {
        ChannelInterrupts::from_bits_retain(self.read(DMA_CH0_STATUS))
    }

    /// Clears the given DMA_CH0_Status bits (write-one-to-clear).
    pub fn ack_channel_status(&self, status: ChannelInterrupts) {
        self.write(DMA_CH0_STATUS, status.bits())
    }

    pub fn set_channel_interrupt_enable(&self, enable: ChannelInterrupts) {
        self.write(DMA_CH0_INTERRUPT_ENABLE, enable.bits())
    }

    pub fn set_channel_dma_control(&self, control: ChannelDmaControl) {
        self.write(DMA_CH0_CONTROL, control.0)
    }

    /// Requests a software reset of the whole controller. Completion is
    /// reported by [`reset_in_progress`](Self::reset_in_progress).
    pub fn start_software_reset(&self) {
        self.write(DMA_MODE, DMA_MODE_SOFTWARE_RESET)
    }

    pub fn reset_in_progress(&self) -> bool {
        self.read(DMA_MODE) & DMA_MODE_SOFTWARE_RESET != 0
    }

    pub fn sys_bus_mode(&self) -> DmaSysBusMode {
        DmaSysBusMode(self.read(DMA_SYSBUS_MODE))
    }

    pub fn set_sys_bus_mode(&self, mode: DmaSysBusMode) {
        self.write(DMA_SYSBUS_MODE, mode.0)
    }

    pub fn version(&self) -> MacVersion {
        MacVersion(self.read(MAC_VERSION))
    }

    pub fn hw_feature0(&self) -> HwFeature0 {
        HwFeature0(self.read(MAC_HW_FEATURE0))
    }

    pub fn hw_feature1(&self) -> HwFeature1 {
        HwFeature1(self.read(MAC_HW_FEATURE1))
    }

    pub fn hw_feature2(&self) -> u32 {
        self.read(MAC_HW_FEATURE2)
    }

    pub fn hw_feature3(&self) -> u32 {
        self.read(MAC_HW_FEATURE3)
    }

    /// Reads MAC address slot `index`. Returns the address and the raw
    /// (low, high) register words.
    pub fn mac_address(&self, index: usize) -> (MacAddress, u32, u32) {
        let hi = self.read(mac_address_high(index));
        let lo = self.read(mac_address_low(index));
        let lo_bytes = lo.to_le_bytes();
        let hi_bytes = hi.to_le_bytes();
        let addr = MacAddress::new([
            lo_bytes[0], lo_bytes[1], lo_bytes[2], lo_bytes[3], hi_bytes[0], hi_bytes[1],
        ]);
        (addr, lo, hi)
    }

    /// Programs MAC address slot `index`. The high half goes first; hardware
    /// latches the pair on the low write.
    pub fn set_mac_address(&self, index: usize, addr: &MacAddress, enable: bool) {
        let b = addr.octets();
        let hi = u32::from_le_bytes([b[4], b[5], 0, 0]) | ((enable as u32) << 31);
        let lo = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        self.write(mac_address_high(index), hi);
        self.write(mac_address_low(index), lo);
        trace!("mac slot {index}: hi={hi:#010x} lo={lo:#010x}");
    }

    pub fn set_packet_filter(&self, filter: MacPacketFilter) {
        self.write(MAC_PACKET_FILTER, filter.bits())
    }

    pub fn set_tx_flow_ctrl(&self, ctrl: MacTxFlowCtrl) {
        self.write(MAC_TX_FLOW_CTRL, ctrl.0)
    }

    pub fn set_mtl_tx_operation_mode(&self, mode: MtlTxOperationMode) {
        self.write(MTL_TXQ0_OPERATION_MODE, mode.0)
    }

    pub fn set_mtl_rx_operation_mode(&self, mode: MtlRxOperationMode) {
        self.write(MTL_RXQ0_OPERATION_MODE, mode.0)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Minimal register bank for unit tests: plain memory plus a write log.

    use alloc::collections::BTreeMap;
    use alloc::vec::Vec;

    use spin::Mutex;

    use super::RegisterIo;

    #[derive(Default)]
    pub struct FakeRegisters {
        values: Mutex<BTreeMap<usize, u32>>,
        writes: Mutex<Vec<(usize, u32)>>,
    }

    impl FakeRegisters {
        pub fn set(&self, offset: usize, value: u32) {
            self.values.lock().insert(offset, value);
        }

        pub fn get(&self, offset: usize) -> u32 {
            self.values.lock().get(&offset).copied().unwrap_or(0)
        }

        pub fn writes_to(&self, offset: usize) -> Vec<u32> {
            self.writes
                .lock()
                .iter()
                .filter(|(o, _)| *o == offset)
                .map(|(_, v)| *v)
                .collect()
        }

        pub fn writes(&self) -> Vec<(usize, u32)> {
            self.writes.lock().clone()
        }

        pub fn write_count(&self) -> usize {
            self.writes.lock().len()
        }
    }

    impl RegisterIo for FakeRegisters {
        fn read32(&self, offset: usize) -> u32 {
            self.get(offset)
        }

        fn write32(&self, offset: usize, value: u32) {
            self.writes.lock().push((offset, value));
            self.set(offset, value);
        }
    }
}

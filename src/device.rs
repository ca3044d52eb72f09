use alloc::sync::Arc;

use axerrno::AxResult;
use memory_addr::PhysAddr;

use crate::config::DeviceConfig;
use crate::dma::DmaCapability;
use crate::error::{ConfigError, EqosError, EqosResult};
use crate::filter::{self, ReceiveFilter, ReceiveFilterCapabilities};
use crate::interrupt::InterruptPipeline;
use crate::lifecycle::{LifecyclePhase, PhaseCell};
use crate::link::{LinkState, LinkStateTracker};
use crate::mac::{MacAddress, MacSource, resolve_current_address};
use crate::mask::InterruptsWanted;
use crate::notify::{Direction, NotificationGate};
use crate::platform::{
    AdapterReporter, DatapathCapabilities, DeferredQueue, HwResource, PacketQueue, Platform,
    QueueFactory, QueueResources,
};
use crate::regs::{
    self, ChannelDmaControl, HwFeature0, HwFeature1, MacConfiguration, MacTxFlowCtrl, MacVersion,
    MtlRxOperationMode, MtlTxOperationMode, REGISTER_FILE_SIZE, RegisterFile,
};
use crate::reset::software_reset;
use crate::stats::log_final_statistics;

use LifecyclePhase::*;

/// MAC_Rx_Flow_Ctrl: receive flow control plus unicast pause detect.
const RX_FLOW_CTRL_ENABLE: u32 = 0x3;
/// MAC_RxQ_Ctrl0: receive queue 0 enabled for generic traffic.
const RX_QUEUE0_ENABLE_GENERIC: u32 = 0x2;
/// MMC_Control: reset all counters.
const MMC_COUNTERS_RESET: u32 = 0x1;
/// RFA: assert flow control at full minus 2 KB.
const RX_FLOW_CONTROL_ACTIVATE: u32 = 2;
/// RFD: release flow control at full minus 6 KB.
const RX_FLOW_CONTROL_DEACTIVATE: u32 = 10;
/// Pause time carried in transmitted pause frames.
const TX_PAUSE_TIME: u16 = 0xFFFF;

/// MTL queue size field for a FIFO size feature code: the whole FIFO, in
/// 256-byte blocks minus one.
fn fifo_blocks(code: u32) -> u32 {
    ((128u64 << code) / 256).saturating_sub(1) as u32
}

/// Hardware identification read during attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwFeatures {
    pub version: MacVersion,
    pub feature0: HwFeature0,
    pub feature1: HwFeature1,
    pub feature2: u32,
    pub feature3: u32,
}

/// Everything that exists between a successful attach and release.
pub struct DeviceState {
    regs: RegisterFile,
    region: PhysAddr,
    vector: u32,
    dma: DmaCapability,
    features: HwFeatures,
    filter_caps: ReceiveFilterCapabilities,
    permanent_mac: MacAddress,
    current_mac: MacAddress,
    mac_source: MacSource,
    gate: Arc<NotificationGate>,
    pipeline: Arc<InterruptPipeline>,
}

impl DeviceState {
    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn vector(&self) -> u32 {
        self.vector
    }

    pub fn dma(&self) -> DmaCapability {
        self.dma
    }

    pub fn features(&self) -> &HwFeatures {
        &self.features
    }

    pub fn receive_filter_capabilities(&self) -> ReceiveFilterCapabilities {
        self.filter_caps
    }

    pub fn permanent_address(&self) -> MacAddress {
        self.permanent_mac
    }

    pub fn current_address(&self) -> MacAddress {
        self.current_mac
    }

    pub fn address_source(&self) -> MacSource {
        self.mac_source
    }

    pub fn gate(&self) -> &Arc<NotificationGate> {
        &self.gate
    }

    pub fn pipeline(&self) -> &Arc<InterruptPipeline> {
        &self.pipeline
    }

    fn queue_resources(&self) -> QueueResources {
        QueueResources {
            regs: self.regs.clone(),
            channel: 0,
            dma: self.dma,
            gate: self.gate.clone(),
        }
    }
}

/// Resources picked from the host's list.
struct Selected {
    region: PhysAddr,
    vector: u32,
}

fn select_resources(resources: &[HwResource]) -> Result<Selected, ConfigError> {
    let mut region = None;
    let mut vector = None;
    let mut interrupts = 0usize;

    for res in resources {
        match *res {
            HwResource::Memory { start, len } => {
                if region.is_some() {
                    warn!(
                        "unexpected memory resource {:#x}, already have registers",
                        start.as_usize()
                    );
                } else if len < REGISTER_FILE_SIZE {
                    warn!(
                        "memory resource {:#x} too small: {len:#x} bytes",
                        start.as_usize()
                    );
                } else {
                    debug!("register region {:#x} len {len:#x}", start.as_usize());
                    region = Some(start);
                }
            }
            HwResource::Interrupt { vector: v } => {
                match interrupts {
                    0 => {
                        debug!("interrupt {v}: main");
                        vector = Some(v);
                    }
                    1 => debug!("interrupt {v}: wake, ignored"),
                    _ => warn!("unexpected interrupt resource {v}"),
                }
                interrupts += 1;
            }
            HwResource::Other { kind } => warn!("unexpected resource kind {kind}"),
        }
    }

    let region = region.ok_or_else(|| {
        error!("no register region");
        ConfigError::NoRegisterRegion
    })?;
    let vector = vector.ok_or_else(|| {
        error!("no interrupt");
        ConfigError::NoInterrupt
    })?;
    Ok(Selected { region, vector })
}

/// One EQoS controller driven through its lifecycle.
pub struct EqosDevice {
    platform: Arc<dyn Platform>,
    adapter: Arc<dyn AdapterReporter>,
    config: DeviceConfig,
    phase: PhaseCell,
    state: Option<Arc<DeviceState>>,
}

impl EqosDevice {
    pub fn new(
        platform: Arc<dyn Platform>,
        adapter: Arc<dyn AdapterReporter>,
        config: DeviceConfig,
    ) -> Self {
        Self {
            platform,
            adapter,
            config,
            phase: PhaseCell::new(),
            state: None,
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase.get()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// State of the attached controller, `None` unless resources are held.
    pub fn state(&self) -> Option<&Arc<DeviceState>> {
        self.state.as_ref()
    }

    /// The interrupt pipeline the host's handler and deferred routine call
    /// into.
    pub fn interrupt_pipeline(&self) -> Option<Arc<InterruptPipeline>> {
        self.state.as_ref().map(|s| s.pipeline.clone())
    }

    fn attached(&self, allowed: &[LifecyclePhase]) -> EqosResult<&Arc<DeviceState>> {
        let actual = self.phase.expect(allowed)?;
        self.state.as_ref().ok_or(EqosError::InvalidPhase {
            expected: ResourcesAcquired,
            actual,
        })
    }

    /// Takes ownership of the controller described by `resources`.
    ///
    /// Maps the registers, connects the interrupt, identifies the hardware,
    /// publishes adapter capabilities, resets the controller and initializes
    /// the bus and DMA engine. On failure everything is given back and the
    /// device stays [`Unattached`](LifecyclePhase::Unattached).
    pub fn acquire_resources(&mut self, resources: &[HwResource]) -> EqosResult {
        self.phase.expect(&[Unattached, ResourcesReleased])?;

        let result = self.attach(resources);
        match result {
            Ok(state) => {
                self.state = Some(Arc::new(state));
                self.phase.transition(&[Unattached, ResourcesReleased], ResourcesAcquired)?;
                info!("resources acquired");
                Ok(())
            }
            Err(e) => {
                error!("acquire resources failed: {e}");
                self.phase.force(Unattached);
                Err(e)
            }
        }
    }

    fn attach(&self, resources: &[HwResource]) -> EqosResult<DeviceState> {
        let Selected { region, vector } = select_resources(resources)?;

        let io = self
            .platform
            .map_registers(region, REGISTER_FILE_SIZE)
            .map_err(ConfigError::MapFailed)?;
        let regs = RegisterFile::new(io);

        let deferred = match self.platform.connect_interrupt(vector) {
            Ok(q) => q,
            Err(e) => {
                regs.retire();
                self.platform.unmap_registers(region, REGISTER_FILE_SIZE);
                return Err(ConfigError::InterruptConnectFailed(e).into());
            }
        };

        self.bring_up(&regs, region, vector, deferred).inspect_err(|_| {
            self.platform.disconnect_interrupt(vector);
            regs.retire();
            self.platform.unmap_registers(region, REGISTER_FILE_SIZE);
        })
    }

    fn bring_up(
        &self,
        regs: &RegisterFile,
        region: PhysAddr,
        vector: u32,
        deferred: Arc<dyn DeferredQueue>,
    ) -> EqosResult<DeviceState> {
        // Slot 0 must be read before the reset reloads it.
        let (permanent_mac, _, _) = regs.mac_address(0);
        let (current_mac, mac_source) = resolve_current_address(
            self.config.mac_address.as_deref(),
            permanent_mac,
            |buf| self.platform.fill_random(buf),
        );

        let features = HwFeatures {
            version: regs.version(),
            feature0: regs.hw_feature0(),
            feature1: regs.hw_feature1(),
            feature2: regs.hw_feature2(),
            feature3: regs.hw_feature3(),
        };
        let (snps, user) = (
            features.version.snps_version(),
            features.version.user_version(),
        );
        info!(
            "version snps={snps:#x} user={user:#x} features {:#010x} {:#010x} {:#010x} {:#010x}, \
             permanent {permanent_mac} current {current_mac}",
            features.feature0.0, features.feature1.0, features.feature2, features.feature3
        );
        if snps < self.config.min_snps_version || user > self.config.max_user_version {
            return Err(ConfigError::UnsupportedVersion { snps, user }.into());
        }

        let dma = DmaCapability::negotiate(features.feature1.address_width())?;
        let filter_caps = ReceiveFilterCapabilities::from_feature(features.feature0);
        self.publish_capabilities(permanent_mac, current_mac, &features, dma, filter_caps);

        software_reset(regs, self.platform.as_ref(), &self.config, &current_mac)?;
        self.init_after_reset(regs);

        let gate = Arc::new(NotificationGate::new(regs.clone()));
        let link = LinkStateTracker::new(regs.clone(), self.adapter.clone());
        let pipeline = Arc::new(InterruptPipeline::new(
            regs.clone(),
            gate.clone(),
            link,
            deferred,
        ));

        Ok(DeviceState {
            regs: regs.clone(),
            region,
            vector,
            dma,
            features,
            filter_caps,
            permanent_mac,
            current_mac,
            mac_source,
            gate,
            pipeline,
        })
    }

    fn publish_capabilities(
        &self,
        permanent: MacAddress,
        current: MacAddress,
        features: &HwFeatures,
        dma: DmaCapability,
        filter_caps: ReceiveFilterCapabilities,
    ) {
        self.adapter.set_current_address(current);
        self.adapter.set_permanent_address(permanent);
        self.adapter.set_link_state(LinkState::disconnected());

        let max_speed = if features.feature0.gmii() {
            1_000_000_000
        } else {
            100_000_000
        };
        self.adapter.set_link_layer_capabilities(max_speed, max_speed);
        self.adapter.set_datapath_capabilities(DatapathCapabilities {
            dma,
            mtu: self.config.mtu,
            max_transfer: self.config.max_dma_transfer,
        });
        self.adapter.set_receive_filter_capabilities(filter_caps);
    }

    /// Bus, tick counter, channel 0 DMA and MMC setup that a reset undoes.
    fn init_after_reset(&self, regs: &RegisterFile) {
        let bus = regs
            .sys_bus_mode()
            .with_mixed_burst(true)
            .with_fixed_burst(false)
            .with_axi_max_write_outstanding(self.config.axi_max_write_outstanding)
            .with_axi_max_read_outstanding(self.config.axi_max_read_outstanding)
            .with_burst_length_16(true)
            .with_burst_length_8(true)
            .with_burst_length_4(true);
        regs.set_sys_bus_mode(bus);

        regs.write(
            regs::MAC_1US_TIC_COUNTER,
            (self.config.csr_rate_hz / 1_000_000).saturating_sub(1),
        );

        regs.set_channel_dma_control(
            ChannelDmaControl::default()
                .with_descriptor_skip_length(self.config.descriptor_skip_length())
                .with_pbl_x8(self.config.pbl_x8),
        );

        regs.write(regs::MMC_CONTROL, MMC_COUNTERS_RESET);
    }

    /// Starts the data path and enables state interrupts.
    pub fn power_on(&mut self) -> EqosResult {
        let state = self.attached(&[ResourcesAcquired, PoweredOff])?;
        let regs = &state.regs;
        let feature1 = state.features.feature1;

        regs.set_tx_flow_ctrl(
            MacTxFlowCtrl::default()
                .with_flow_control_enable(true)
                .with_pause_time(TX_PAUSE_TIME),
        );
        regs.set_mtl_tx_operation_mode(
            MtlTxOperationMode::default()
                .with_store_and_forward(true)
                .with_queue_enabled()
                .with_queue_size(fifo_blocks(feature1.tx_fifo_size())),
        );

        regs.write(regs::MAC_RX_FLOW_CTRL, RX_FLOW_CTRL_ENABLE);
        regs.write(regs::MAC_RX_CTRL0, RX_QUEUE0_ENABLE_GENERIC);
        regs.set_mtl_rx_operation_mode(
            MtlRxOperationMode::default()
                .with_store_and_forward(true)
                .with_forward_error_packets(true)
                .with_forward_undersized_good_packets(true)
                .with_queue_size(fifo_blocks(feature1.rx_fifo_size()))
                .with_hardware_flow_control(true)
                .with_flow_control_activate(RX_FLOW_CONTROL_ACTIVATE)
                .with_flow_control_deactivate(RX_FLOW_CONTROL_DEACTIVATE),
        );

        regs.set_mac_configuration(
            MacConfiguration::default()
                .with_disable_carrier_sense_during_transmit(true)
                .with_packet_burst_enable(true)
                .with_receiver_enable(true)
                .with_transmitter_enable(true),
        );

        state.pipeline.link().refresh();
        let stale = regs.channel_status();
        if !stale.is_empty() {
            regs.ack_channel_status(stale);
        }
        state.gate.enable(InterruptsWanted::STATE);

        self.phase.transition(&[ResourcesAcquired, PoweredOff], Active)?;
        info!("powered on");
        Ok(())
    }

    /// Masks every interrupt and stops the MAC transmitter and receiver.
    ///
    /// Packet queues must have cleared their registrations beforehand.
    pub fn power_off(&mut self) -> EqosResult {
        let state = self.attached(&[Active])?;

        {
            let mut sub = state.gate.lock();
            sub.disable(InterruptsWanted::all());
            let registered = sub.is_armed(Direction::Rx) || sub.is_armed(Direction::Tx);
            if registered {
                error!("packet queue still registered at power off");
            }
            debug_assert!(!registered, "packet queue still registered at power off");
        }

        let config = state
            .regs
            .mac_configuration()
            .with_receiver_enable(false)
            .with_transmitter_enable(false);
        state.regs.set_mac_configuration(config);

        self.phase.transition(&[Active], PoweredOff)?;
        info!("powered off");
        Ok(())
    }

    /// Gives the controller back: logs statistics, resets it to its
    /// permanent address, disconnects the interrupt and unmaps the registers.
    pub fn release_resources(&mut self) -> EqosResult {
        let actual = self.phase.expect(&[ResourcesAcquired, PoweredOff])?;
        let Some(state) = self.state.take() else {
            return Err(EqosError::InvalidPhase {
                expected: ResourcesAcquired,
                actual,
            });
        };

        state.gate.disable(InterruptsWanted::all());
        log_final_statistics(state.pipeline.stats(), &state.regs);

        if let Err(e) = software_reset(
            &state.regs,
            self.platform.as_ref(),
            &self.config,
            &state.permanent_mac,
        ) {
            warn!("reset on release failed: {e}");
        }

        self.platform.disconnect_interrupt(state.vector);
        state.regs.retire();
        self.platform.unmap_registers(state.region, REGISTER_FILE_SIZE);

        self.phase.transition(&[ResourcesAcquired, PoweredOff], ResourcesReleased)?;
        info!("resources released");
        Ok(())
    }

    fn create_queue(
        &self,
        direction: Direction,
        factory: &dyn QueueFactory,
    ) -> AxResult<Arc<dyn PacketQueue>> {
        let state = self.attached(&[Active])?;
        debug_assert!(
            !state.gate.is_armed(direction),
            "{direction:?} queue already registered"
        );
        let queue = factory.create(state.queue_resources())?;
        debug!("{direction:?} queue created");
        Ok(queue)
    }

    /// Creates the receive queue engine for channel 0.
    pub fn create_rx_queue(&self, factory: &dyn QueueFactory) -> AxResult<Arc<dyn PacketQueue>> {
        self.create_queue(Direction::Rx, factory)
    }

    /// Creates the transmit queue engine for channel 0.
    pub fn create_tx_queue(&self, factory: &dyn QueueFactory) -> AxResult<Arc<dyn PacketQueue>> {
        self.create_queue(Direction::Tx, factory)
    }

    /// Programs the receive filter.
    pub fn set_receive_filter(&self, filter: &ReceiveFilter) -> EqosResult {
        let state = self.attached(&[ResourcesAcquired, Active, PoweredOff])?;
        filter::apply(&state.regs, &state.filter_caps, &state.current_mac, filter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_blocks() {
        // 2 KB FIFO (128 << 4) is 8 blocks.
        assert_eq!(fifo_blocks(4), 7);
        assert_eq!(fifo_blocks(1), 0);
        assert_eq!(fifo_blocks(0), 0);
        assert_eq!(fifo_blocks(11), 1023);
    }

    #[test]
    fn test_select_first_adequate_region() {
        let small = PhysAddr::from_usize(0x1000);
        let good = PhysAddr::from_usize(0x10_0000);
        let extra = PhysAddr::from_usize(0x20_0000);
        let selected = select_resources(&[
            HwResource::Other { kind: 7 },
            HwResource::Memory {
                start: small,
                len: 0x100,
            },
            HwResource::Memory {
                start: good,
                len: 0x10000,
            },
            HwResource::Memory {
                start: extra,
                len: 0x10000,
            },
            HwResource::Interrupt { vector: 40 },
            HwResource::Interrupt { vector: 41 },
            HwResource::Interrupt { vector: 42 },
        ])
        .unwrap();
        assert_eq!(selected.region, good);
        assert_eq!(selected.vector, 40);
    }

    #[test]
    fn test_select_missing() {
        let mem = HwResource::Memory {
            start: PhysAddr::from_usize(0x10_0000),
            len: REGISTER_FILE_SIZE,
        };
        assert!(matches!(
            select_resources(&[HwResource::Interrupt { vector: 1 }]),
            Err(ConfigError::NoRegisterRegion)
        ));
        assert!(matches!(
            select_resources(&[mem]),
            Err(ConfigError::NoInterrupt)
        ));
    }
}

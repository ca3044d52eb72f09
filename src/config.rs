use alloc::vec::Vec;

/// Host-supplied settings for one controller.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Station address override from the host's configuration store, raw bytes.
    pub mac_address: Option<Vec<u8>>,
    /// Polls of the software reset bit before giving up.
    pub reset_attempts: u32,
    /// Stall before each reset poll, in microseconds.
    pub reset_stall_us: u32,
    /// AXI write requests in flight.
    pub axi_max_write_outstanding: u32,
    /// AXI read requests in flight.
    pub axi_max_read_outstanding: u32,
    /// CSR clock feeding the 1 us tick counter.
    pub csr_rate_hz: u32,
    /// Link layer MTU reported to the adapter.
    pub mtu: u32,
    /// Largest single DMA transfer.
    pub max_dma_transfer: usize,
    /// Descriptor size used by the queue engines, in bytes.
    pub descriptor_size: usize,
    /// Program DMA bursts as PBL x8.
    pub pbl_x8: bool,
    /// Oldest supported Synopsys core version.
    pub min_snps_version: u8,
    /// Newest supported vendor (user) version.
    pub max_user_version: u8,
}

impl DeviceConfig {
    /// Bus width of the AXI master, in bytes.
    pub const BUS_BYTES: usize = 8;
    /// Smallest descriptor the DMA engine understands.
    pub const MIN_DESCRIPTOR_SIZE: usize = 16;

    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `mac` as the configured station address override.
    pub fn with_mac_address(mut self, mac: &[u8]) -> Self {
        self.mac_address = Some(mac.to_vec());
        self
    }

    /// Descriptor skip length for DMA_CH0_Control, in bus-width units.
    pub fn descriptor_skip_length(&self) -> u32 {
        (self.descriptor_size.saturating_sub(Self::MIN_DESCRIPTOR_SIZE) / Self::BUS_BYTES) as u32
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mac_address: None,
            reset_attempts: 1000,
            reset_stall_us: 20,
            axi_max_write_outstanding: 4,
            axi_max_read_outstanding: 8,
            csr_rate_hz: 125_000_000,
            mtu: 1500,
            max_dma_transfer: 16384,
            descriptor_size: Self::MIN_DESCRIPTOR_SIZE,
            pbl_x8: true,
            min_snps_version: 0x51,
            max_user_version: 0x52,
        }
    }
}

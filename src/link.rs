//! Link state decoding and publication.

use alloc::sync::Arc;

use crate::platform::AdapterReporter;
use crate::regs::{MacConfiguration, PhyIfControlStatus, PortSelectSpeed, RegisterFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplex {
    Half,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Disconnected,
    Connected,
}

/// Snapshot of the link as last read from the PHY interface register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState {
    /// Bits per second, 0 when the speed code is unrecognized.
    pub speed_bps: u64,
    pub duplex: Duplex,
    pub connect: ConnectState,
}

impl LinkState {
    /// Reported before the first refresh.
    pub const fn disconnected() -> Self {
        Self {
            speed_bps: 0,
            duplex: Duplex::Half,
            connect: ConnectState::Disconnected,
        }
    }

    pub const fn is_up(&self) -> bool {
        matches!(self.connect, ConnectState::Connected)
    }
}

/// Decodes LNKSPEED into a link speed and the matching MAC port select.
///
/// Reserved codes yield a speed of 0 and `None`: the port select is left as
/// it is.
pub const fn decode_speed(code: u32) -> (u64, Option<PortSelectSpeed>) {
    match code {
        0 => (10_000_000, Some(PortSelectSpeed::Speed10M)),
        1 => (100_000_000, Some(PortSelectSpeed::Speed100M)),
        2 => (1_000_000_000, Some(PortSelectSpeed::Speed1000M)),
        _ => (0, None),
    }
}

/// Folds a PHY interface status into the MAC configuration and link state.
pub fn apply_phy_status(
    status: PhyIfControlStatus,
    config: MacConfiguration,
) -> (MacConfiguration, LinkState) {
    let (speed_bps, port_select) = decode_speed(status.speed_code());
    let mut new_config = config.with_full_duplex(status.full_duplex());
    if let Some(ps) = port_select {
        new_config = new_config.with_port_select(ps);
    }

    let state = LinkState {
        speed_bps,
        duplex: if status.full_duplex() {
            Duplex::Full
        } else {
            Duplex::Half
        },
        connect: if status.link_up() {
            ConnectState::Connected
        } else {
            ConnectState::Disconnected
        },
    };
    (new_config, state)
}

/// Keeps MAC speed/duplex in step with the PHY and reports the link.
pub struct LinkStateTracker {
    regs: RegisterFile,
    reporter: Arc<dyn AdapterReporter>,
}

impl LinkStateTracker {
    pub fn new(regs: RegisterFile, reporter: Arc<dyn AdapterReporter>) -> Self {
        Self { regs, reporter }
    }

    /// Reads the PHY interface status (clearing a pending link interrupt),
    /// updates MAC_Configuration if speed or duplex changed, and publishes
    /// the resulting link state.
    pub fn refresh(&self) -> LinkState {
        let status = self.regs.take_phy_if_status();
        let old = self.regs.mac_configuration();
        let (new, state) = apply_phy_status(status, old);

        if new != old {
            self.regs.set_mac_configuration(new);
        }

        info!(
            "link {}: {} bps, {:?} duplex",
            if state.is_up() { "up" } else { "down" },
            state.speed_bps,
            state.duplex
        );
        self.reporter.set_link_state(state);
        state
    }
}

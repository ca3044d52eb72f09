//! Receive filtering: packet filter flags and the perfect-match address slots.

use arrayvec::ArrayVec;
use bitflags::bitflags;

use crate::mac::MacAddress;
use crate::regs::{HwFeature0, MAC_ADDRESS_SLOTS, MacPacketFilter, RegisterFile};

bitflags! {
    /// Receive filter modes requested by the network stack.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PacketFilterFlags: u32 {
        /// Frames addressed to the current station address.
        const DIRECTED = 1 << 0;
        /// Frames addressed to a multicast address in the list.
        const MULTICAST = 1 << 1;
        const ALL_MULTICAST = 1 << 2;
        const BROADCAST = 1 << 3;
        const PROMISCUOUS = 1 << 4;
    }
}

/// Multicast addresses that fit in the perfect-match slots after slot 0.
pub const MAX_MULTICAST: usize = MAC_ADDRESS_SLOTS - 1;

/// What the hardware can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveFilterCapabilities {
    pub supported: PacketFilterFlags,
    pub max_multicast: usize,
}

impl ReceiveFilterCapabilities {
    pub fn from_feature(feature: HwFeature0) -> Self {
        let slots = (feature.mac_addr_count() as usize).clamp(1, MAC_ADDRESS_SLOTS);
        let max_multicast = slots - 1;
        let mut supported = PacketFilterFlags::DIRECTED
            | PacketFilterFlags::ALL_MULTICAST
            | PacketFilterFlags::BROADCAST
            | PacketFilterFlags::PROMISCUOUS;
        supported.set(PacketFilterFlags::MULTICAST, max_multicast != 0);
        Self {
            supported,
            max_multicast,
        }
    }
}

/// A requested receive filter.
#[derive(Debug, Clone, Default)]
pub struct ReceiveFilter {
    pub flags: PacketFilterFlags,
    multicast: ArrayVec<MacAddress, MAX_MULTICAST>,
}

impl ReceiveFilter {
    pub fn new(flags: PacketFilterFlags) -> Self {
        Self {
            flags,
            multicast: ArrayVec::new(),
        }
    }

    /// Builds a filter from a multicast list. Addresses past
    /// [`MAX_MULTICAST`] are dropped with a warning.
    pub fn with_multicast(flags: PacketFilterFlags, addrs: &[MacAddress]) -> Self {
        let mut filter = Self::new(flags);
        for addr in addrs {
            if filter.multicast.try_push(*addr).is_err() {
                warn!(
                    "multicast list has {} entries, keeping {}",
                    addrs.len(),
                    MAX_MULTICAST
                );
                break;
            }
        }
        filter
    }

    pub fn multicast(&self) -> &[MacAddress] {
        &self.multicast
    }
}

/// Programs the packet filter and the address slots.
///
/// Promiscuous mode overrides everything else and leaves the slots alone.
/// Otherwise slot 0 holds `current` (enabled only for directed traffic),
/// slots `1..slots` hold the multicast list, and unused slots are zeroed and
/// disabled.
pub fn apply(
    regs: &RegisterFile,
    caps: &ReceiveFilterCapabilities,
    current: &MacAddress,
    filter: &ReceiveFilter,
) {
    if filter.flags.contains(PacketFilterFlags::PROMISCUOUS) {
        debug!("receive filter: promiscuous");
        regs.set_packet_filter(MacPacketFilter::PROMISCUOUS);
        return;
    }

    let mut packet_filter = MacPacketFilter::empty();
    packet_filter.set(
        MacPacketFilter::PASS_ALL_MULTICAST,
        filter.flags.contains(PacketFilterFlags::ALL_MULTICAST),
    );
    packet_filter.set(
        MacPacketFilter::DISABLE_BROADCAST,
        !filter.flags.contains(PacketFilterFlags::BROADCAST),
    );

    regs.set_mac_address(
        0,
        current,
        filter.flags.contains(PacketFilterFlags::DIRECTED),
    );

    let use_list = filter.flags.contains(PacketFilterFlags::MULTICAST);
    let list = filter.multicast();
    if use_list && list.len() > caps.max_multicast {
        warn!(
            "multicast list has {} entries, hardware holds {}",
            list.len(),
            caps.max_multicast
        );
    }
    for slot in 1..=caps.max_multicast {
        match list.get(slot - 1) {
            Some(addr) if use_list => regs.set_mac_address(slot, addr, true),
            _ => regs.set_mac_address(slot, &MacAddress::ZERO, false),
        }
    }
    // Filter mode last, once the slot table is complete.
    regs.set_packet_filter(packet_filter);
    debug!(
        "receive filter: {:?}, {} multicast entries",
        filter.flags,
        list.len().min(caps.max_multicast)
    );
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use super::*;
    use crate::regs::fake::FakeRegisters;
    use crate::regs::{MAC_PACKET_FILTER, mac_address_high, mac_address_low};

    fn feature(count: u32) -> HwFeature0 {
        HwFeature0(count << 18)
    }

    fn setup() -> (Arc<FakeRegisters>, RegisterFile) {
        let fake = Arc::new(FakeRegisters::default());
        (fake.clone(), RegisterFile::new(fake))
    }

    const CURRENT: MacAddress = MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

    #[test]
    fn test_capabilities() {
        let caps = ReceiveFilterCapabilities::from_feature(feature(4));
        assert_eq!(caps.max_multicast, 3);
        assert!(caps.supported.contains(PacketFilterFlags::MULTICAST));

        let caps = ReceiveFilterCapabilities::from_feature(feature(1));
        assert_eq!(caps.max_multicast, 0);
        assert!(!caps.supported.contains(PacketFilterFlags::MULTICAST));
        assert!(caps.supported.contains(PacketFilterFlags::DIRECTED));
    }

    #[test]
    fn test_promiscuous_only_touches_filter() {
        let (fake, regs) = setup();
        let caps = ReceiveFilterCapabilities::from_feature(feature(4));
        let filter = ReceiveFilter::new(PacketFilterFlags::PROMISCUOUS | PacketFilterFlags::DIRECTED);

        apply(&regs, &caps, &CURRENT, &filter);
        assert_eq!(fake.get(MAC_PACKET_FILTER), MacPacketFilter::PROMISCUOUS.bits());
        assert_eq!(fake.write_count(), 1);
    }

    #[test]
    fn test_directed_and_multicast() {
        let (fake, regs) = setup();
        let caps = ReceiveFilterCapabilities::from_feature(feature(4));
        let group = MacAddress::new([0x01, 0x00, 0x5E, 0x00, 0x00, 0x01]);
        let filter = ReceiveFilter::with_multicast(
            PacketFilterFlags::DIRECTED | PacketFilterFlags::MULTICAST,
            &[group],
        );

        apply(&regs, &caps, &CURRENT, &filter);

        let pf = MacPacketFilter::from_bits_retain(fake.get(MAC_PACKET_FILTER));
        assert_eq!(pf, MacPacketFilter::DISABLE_BROADCAST);
        assert_eq!(fake.get(mac_address_high(0)) >> 31, 1);
        assert_eq!(fake.get(mac_address_high(1)) >> 31, 1);
        assert_eq!(fake.get(mac_address_low(1)), 0x005E_0001);
        for slot in 2..=3 {
            assert_eq!(fake.get(mac_address_high(slot)), 0);
            assert_eq!(fake.get(mac_address_low(slot)), 0);
        }
        // Slots past the hardware count are never written.
        assert!(fake.writes_to(mac_address_high(4)).is_empty());
    }

    #[test]
    fn test_broadcast_all_multicast_without_directed() {
        let (fake, regs) = setup();
        let caps = ReceiveFilterCapabilities::from_feature(feature(2));
        let filter =
            ReceiveFilter::new(PacketFilterFlags::BROADCAST | PacketFilterFlags::ALL_MULTICAST);

        apply(&regs, &caps, &CURRENT, &filter);

        let pf = MacPacketFilter::from_bits_retain(fake.get(MAC_PACKET_FILTER));
        assert_eq!(pf, MacPacketFilter::PASS_ALL_MULTICAST);
        // Slot 0 keeps the address but does not match on it.
        assert_eq!(fake.get(mac_address_high(0)) >> 31, 0);
        assert_eq!(fake.get(mac_address_low(0)), 0x0000_0002);
    }

    #[test]
    fn test_filter_mode_written_after_slots() {
        let (fake, regs) = setup();
        let caps = ReceiveFilterCapabilities::from_feature(feature(4));
        let group = MacAddress::new([0x01, 0x00, 0x5E, 0x00, 0x00, 0x03]);

        apply(
            &regs,
            &caps,
            &CURRENT,
            &ReceiveFilter::new(PacketFilterFlags::PROMISCUOUS),
        );
        let before = fake.write_count();

        let filter = ReceiveFilter::with_multicast(
            PacketFilterFlags::DIRECTED | PacketFilterFlags::MULTICAST,
            &[group],
        );
        apply(&regs, &caps, &CURRENT, &filter);

        let writes = fake.writes();
        let writes = &writes[before..];
        let (last, _) = writes[writes.len() - 1];
        assert_eq!(last, MAC_PACKET_FILTER);
        assert_eq!(
            writes.iter().filter(|(o, _)| *o == MAC_PACKET_FILTER).count(),
            1
        );
        // Every slot lands before the filter mode leaves promiscuous.
        for slot in 0..=3 {
            assert!(writes.iter().any(|(o, _)| *o == mac_address_high(slot)));
        }
    }

    #[test]
    fn test_list_ignored_without_multicast_flag() {
        let (fake, regs) = setup();
        let caps = ReceiveFilterCapabilities::from_feature(feature(3));
        let group = MacAddress::new([0x01, 0x00, 0x5E, 0x00, 0x00, 0x02]);
        let filter = ReceiveFilter::with_multicast(PacketFilterFlags::DIRECTED, &[group]);

        apply(&regs, &caps, &CURRENT, &filter);
        assert_eq!(fake.get(mac_address_high(1)), 0);
    }

    #[test]
    fn test_oversized_list_truncated() {
        let addrs: Vec<MacAddress> = (0..40u8)
            .map(|i| MacAddress::new([0x01, 0x00, 0x5E, 0x00, 0x00, i]))
            .collect();
        let filter = ReceiveFilter::with_multicast(PacketFilterFlags::MULTICAST, &addrs);
        assert_eq!(filter.multicast().len(), MAX_MULTICAST);
        assert_eq!(filter.multicast()[0], addrs[0]);
    }
}

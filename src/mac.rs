//! Station address type and current-address resolution.

use core::fmt;

/// A 48-bit Ethernet station address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress([u8; MacAddress::LEN]);

impl MacAddress {
    pub const LEN: usize = 6;
    pub const ZERO: Self = Self([0; Self::LEN]);
    pub const BROADCAST: Self = Self([0xFF; Self::LEN]);

    /// First two octets of a synthesized address: locally administered, unicast.
    pub const SYNTHESIZED_PREFIX: [u8; 2] = [0xF2, 0x00];

    pub const fn new(octets: [u8; Self::LEN]) -> Self {
        Self(octets)
    }

    /// Parses a raw link-layer address; `None` unless exactly six bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; Self::LEN]>::try_from(bytes).ok().map(Self)
    }

    pub const fn octets(&self) -> [u8; Self::LEN] {
        self.0
    }

    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub const fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

/// Where the current station address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacSource {
    /// Externally configured override.
    Configured,
    /// Permanent address read from slot 0.
    Permanent,
    /// Permanent address with the multicast bit cleared.
    PermanentUnicast,
    /// Permanent address was blank; a random local address was generated.
    Synthesized,
}

/// Chooses the current station address.
///
/// A configured address wins when it is six bytes long and neither multicast
/// nor broadcast. Otherwise the permanent address is used, replaced by a
/// random locally administered address when it reads as all-zero or all-ones,
/// or with the multicast bit cleared when that bit is set.
pub fn resolve_current_address<F>(
    configured: Option<&[u8]>,
    permanent: MacAddress,
    fill_random: F,
) -> (MacAddress, MacSource)
where
    F: FnOnce(&mut [u8]),
{
    if let Some(raw) = configured {
        match MacAddress::from_slice(raw) {
            None => warn!("configured MAC address has bad length {}", raw.len()),
            Some(addr) if addr.is_multicast() || addr.is_broadcast() => {
                warn!("configured MAC address {addr} is not a unicast address");
            }
            Some(addr) => {
                info!("using configured MAC address {addr}");
                return (addr, MacSource::Configured);
            }
        }
    }

    if permanent.is_zero() || permanent.is_broadcast() {
        warn!("permanent MAC address {permanent} is blank, synthesizing one");
        let mut octets = [0u8; MacAddress::LEN];
        octets[..2].copy_from_slice(&MacAddress::SYNTHESIZED_PREFIX);
        fill_random(&mut octets[2..]);
        return (MacAddress::new(octets), MacSource::Synthesized);
    }

    if permanent.is_multicast() {
        warn!("permanent MAC address {permanent} has the multicast bit set, clearing it");
        let mut octets = permanent.octets();
        octets[0] &= !0x01;
        return (MacAddress::new(octets), MacSource::PermanentUnicast);
    }

    (permanent, MacSource::Permanent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_random(_: &mut [u8]) {
        panic!("random source must not be used");
    }

    fn fixed_random(buf: &mut [u8]) {
        buf.fill(0xA5);
    }

    #[test]
    fn test_all_ones_is_synthesized() {
        let (addr, source) = resolve_current_address(None, MacAddress::BROADCAST, fixed_random);
        assert_eq!(source, MacSource::Synthesized);
        assert_eq!(addr.octets(), [0xF2, 0x00, 0xA5, 0xA5, 0xA5, 0xA5]);
        assert!(addr.is_locally_administered());
        assert!(!addr.is_multicast());
    }

    #[test]
    fn test_all_zero_is_synthesized() {
        let (addr, source) = resolve_current_address(None, MacAddress::ZERO, fixed_random);
        assert_eq!(source, MacSource::Synthesized);
        assert_eq!(&addr.octets()[..2], &MacAddress::SYNTHESIZED_PREFIX);
    }

    #[test]
    fn test_multicast_bit_cleared() {
        let permanent = MacAddress::new([0x03, 0x10, 0x20, 0x30, 0x40, 0x50]);
        let (addr, source) = resolve_current_address(None, permanent, no_random);
        assert_eq!(source, MacSource::PermanentUnicast);
        assert_eq!(addr.octets(), [0x02, 0x10, 0x20, 0x30, 0x40, 0x50]);
    }

    #[test]
    fn test_configured_override_used_verbatim() {
        let permanent = MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let configured = [0x02, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        let (addr, source) = resolve_current_address(Some(&configured), permanent, no_random);
        assert_eq!(source, MacSource::Configured);
        assert_eq!(addr.octets(), configured);
    }

    #[test]
    fn test_bad_configured_falls_back() {
        let permanent = MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

        let multicast = [0x01, 0x00, 0x5E, 0x00, 0x00, 0x01];
        let (addr, source) = resolve_current_address(Some(&multicast), permanent, no_random);
        assert_eq!((addr, source), (permanent, MacSource::Permanent));

        let broadcast = [0xFF; 6];
        let (addr, _) = resolve_current_address(Some(&broadcast), permanent, no_random);
        assert_eq!(addr, permanent);

        let short = [0x02, 0x00, 0x00];
        let (addr, _) = resolve_current_address(Some(&short), permanent, no_random);
        assert_eq!(addr, permanent);
    }

    #[test]
    fn test_display() {
        let addr = MacAddress::new([0xF2, 0x00, 0x0A, 0xBC, 0xDE, 0x01]);
        assert_eq!(alloc::format!("{addr}"), "f2:00:0a:bc:de:01");
    }
}

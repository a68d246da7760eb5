use byteorder::{ByteOrder, NetworkEndian};

use core::fmt::{Display, Formatter, Result as FmtResult};
use core::str::FromStr;

use crate::utils::checksum::{internet_checksum, PseudoHeader};
use crate::{Error, Result};

// https://en.wikipedia.org/wiki/IPv4
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 4]);

impl Address {
    pub const UNSPECIFIED: Address = Address([0; 4]);
    pub const BROADCAST: Address = Address([255; 4]);

    pub const fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    pub fn from_bytes(addr: &[u8]) -> Result<Address> {
        if addr.len() != 4 {
            return Err(Error::Malformed);
        }

        let mut bytes = [0; 4];
        bytes.copy_from_slice(addr);
        Ok(Address(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [255; 4]
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

// NOTE: str must be in format "A.B.C.D"
impl FromStr for Address {
    type Err = Error;

    fn from_str(addr: &str) -> Result<Address> {
        let mut bytes = [0u8; 4];
        let mut tokens = addr.split('.');

        for byte in bytes.iter_mut() {
            let token = tokens.next().ok_or(Error::Malformed)?;
            *byte = token.parse::<u8>().map_err(|_| Error::Malformed)?;
        }

        if tokens.next().is_some() {
            return Err(Error::Malformed);
        }

        Ok(Address(bytes))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Icmp,
    Tcp,
    Udp,
    Unknown(u8),
}

impl From<u8> for Protocol {
    fn from(value: u8) -> Self {
        match value {
            1 => Protocol::Icmp,
            6 => Protocol::Tcp,
            17 => Protocol::Udp,
            other => Protocol::Unknown(other),
        }
    }
}

impl From<Protocol> for u8 {
    fn from(value: Protocol) -> Self {
        match value {
            Protocol::Icmp => 1,
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
            Protocol::Unknown(other) => other,
        }
    }
}

pub mod flags {
    pub const DONT_FRAGMENT: u16 = 0x4000;
}

mod field {
    use core::ops::Range;

    pub const VER_IHL: usize = 0;
    pub const DSCP: usize = 1;
    pub const LENGTH: Range<usize> = 2..4;
    pub const IDENT: Range<usize> = 4..6;
    pub const FLAGS_FRAG: Range<usize> = 6..8;
    pub const TTL: usize = 8;
    pub const PROTOCOL: usize = 9;
    pub const CHECKSUM: Range<usize> = 10..12;
    pub const SRC: Range<usize> = 12..16;
    pub const DST: Range<usize> = 16..20;
}

/// IPv4 header view. The buffer starts at the IP header (the Ethernet payload).
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const HEADER_LEN: usize = 20; // 5 * 4 bytes, no options

    pub fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    // header must be complete and the total length must fit in the buffer
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Packet { buffer };
        let len = packet.buffer.as_ref().len();

        if len < Self::HEADER_LEN {
            return Err(Error::Malformed);
        }
        if packet.version() != 4 {
            return Err(Error::Unsupported);
        }
        let header_len = packet.header_len();
        let total_len = packet.total_len() as usize;
        if header_len < Self::HEADER_LEN || total_len < header_len || total_len > len {
            return Err(Error::Malformed);
        }

        Ok(packet)
    }

    pub fn version(&self) -> u8 {
        self.buffer.as_ref()[field::VER_IHL] >> 4
    }

    pub fn header_len(&self) -> usize {
        ((self.buffer.as_ref()[field::VER_IHL] & 0x0F) as usize) * 4
    }

    pub fn dscp(&self) -> u8 {
        self.buffer.as_ref()[field::DSCP]
    }

    pub fn total_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::LENGTH])
    }

    pub fn ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::IDENT])
    }

    pub fn flags_frag(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::FLAGS_FRAG])
    }

    pub fn ttl(&self) -> u8 {
        self.buffer.as_ref()[field::TTL]
    }

    pub fn protocol(&self) -> Protocol {
        Protocol::from(self.buffer.as_ref()[field::PROTOCOL])
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::CHECKSUM])
    }

    pub fn src_addr(&self) -> Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.buffer.as_ref()[field::SRC]);
        Address(bytes)
    }

    pub fn dst_addr(&self) -> Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.buffer.as_ref()[field::DST]);
        Address(bytes)
    }

    pub fn payload_len(&self) -> usize {
        self.total_len() as usize - self.header_len()
    }

    // transport payload, padding after total_len excluded
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[self.header_len()..self.total_len() as usize]
    }

    pub fn verify_checksum(&self) -> bool {
        internet_checksum(
            &self.buffer.as_ref()[..self.header_len()],
            PseudoHeader::None,
        ) == 0
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_version_and_header_len(&mut self, version: u8, header_len: usize) {
        self.buffer.as_mut()[field::VER_IHL] = (version << 4) | ((header_len / 4) as u8 & 0x0F);
    }

    pub fn set_dscp(&mut self, value: u8) {
        self.buffer.as_mut()[field::DSCP] = value;
    }

    pub fn set_total_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::LENGTH], value);
    }

    pub fn set_ident(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::IDENT], value);
    }

    pub fn set_flags_frag(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::FLAGS_FRAG], value);
    }

    pub fn set_ttl(&mut self, value: u8) {
        self.buffer.as_mut()[field::TTL] = value;
    }

    pub fn set_protocol(&mut self, value: Protocol) {
        self.buffer.as_mut()[field::PROTOCOL] = value.into();
    }

    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::CHECKSUM], value);
    }

    pub fn set_src_addr(&mut self, addr: Address) {
        self.buffer.as_mut()[field::SRC].copy_from_slice(addr.as_bytes());
    }

    pub fn set_dst_addr(&mut self, addr: Address) {
        self.buffer.as_mut()[field::DST].copy_from_slice(addr.as_bytes());
    }

    // reply in place: back to the sender, from `our_addr`
    pub fn swap_addrs(&mut self, our_addr: Address) {
        let src = self.src_addr();
        self.set_dst_addr(src);
        self.set_src_addr(our_addr);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let range = self.header_len()..self.total_len() as usize;
        &mut self.buffer.as_mut()[range]
    }

    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let header_len = self.header_len();
        let checksum = internet_checksum(&self.buffer.as_ref()[..header_len], PseudoHeader::None);
        self.set_checksum(checksum);
    }

    /// Computes the UDP or TCP checksum of the payload, pseudo-header
    /// included, and stores it at offset `checksum_at` within the payload.
    /// The checksum field is zeroed first; total length must already be final.
    pub fn fill_transport_checksum(&mut self, kind: PseudoHeader, checksum_at: usize) {
        let at = self.header_len() + checksum_at;
        let total_len = self.total_len() as usize;

        self.buffer.as_mut()[at..at + 2].fill(0);
        // source address, destination address, then the transport segment
        let checksum = match internet_checksum(&self.buffer.as_ref()[field::SRC.start..total_len], kind) {
            // zero on the wire means "no checksum" for UDP
            0 if kind == PseudoHeader::Udp => 0xFFFF,
            checksum => checksum,
        };
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[at..at + 2], checksum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_quad() {
        assert_eq!("192.168.1.153".parse::<Address>(), Ok(Address([192, 168, 1, 153])));
        assert_eq!("192.168.1".parse::<Address>(), Err(Error::Malformed));
        assert_eq!("192.168.1.1.1".parse::<Address>(), Err(Error::Malformed));
        assert_eq!("192.168.1.256".parse::<Address>(), Err(Error::Malformed));
    }

    #[test]
    fn protocol_numbers() {
        assert_eq!(Protocol::from(17), Protocol::Udp);
        assert_eq!(u8::from(Protocol::Tcp), 6);
        assert_eq!(Protocol::from(89), Protocol::Unknown(89));
    }

    #[test]
    fn filled_header_checksum_verifies() {
        let mut bytes = [0u8; 28];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        packet.set_version_and_header_len(4, 20);
        packet.set_total_len(28);
        packet.set_ident(2);
        packet.set_flags_frag(flags::DONT_FRAGMENT);
        packet.set_ttl(128);
        packet.set_protocol(Protocol::Udp);
        packet.set_src_addr(Address([192, 168, 1, 153]));
        packet.set_dst_addr(Address([192, 168, 1, 1]));
        packet.fill_checksum();

        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert!(packet.verify_checksum());
        assert_eq!(packet.header_len(), 20);
        assert_eq!(packet.payload_len(), 8);
        assert_eq!(packet.protocol(), Protocol::Udp);
    }

    #[test]
    fn total_len_past_buffer_is_malformed() {
        let mut bytes = [0u8; 24];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        packet.set_version_and_header_len(4, 20);
        packet.set_total_len(60);
        assert_eq!(Packet::new_checked(&bytes[..]).err(), Some(Error::Malformed));
    }

    #[test]
    fn padding_is_not_payload() {
        let mut bytes = [0u8; 46];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        packet.set_version_and_header_len(4, 20);
        packet.set_total_len(24);
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.payload().len(), 4);
    }
}

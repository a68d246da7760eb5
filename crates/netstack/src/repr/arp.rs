use byteorder::{ByteOrder, NetworkEndian};

use super::{EthernetAddress, Ipv4Address};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Request,
    Reply,
    Unknown(u16),
}

impl From<u16> for Operation {
    fn from(value: u16) -> Self {
        match value {
            0x0001 => Operation::Request,
            0x0002 => Operation::Reply,
            other => Operation::Unknown(other),
        }
    }
}

impl From<Operation> for u16 {
    fn from(value: Operation) -> Self {
        match value {
            Operation::Request => 0x0001,
            Operation::Reply => 0x0002,
            Operation::Unknown(other) => other,
        }
    }
}

#[allow(non_snake_case)]
pub mod Hardware {
    pub const ETHERNET: u16 = 0x0001;
}

#[allow(non_snake_case)]
pub mod Protocols {
    pub const IPV4: u16 = 0x0800;
}

mod field {
    use core::ops::Range;

    pub const HW_TYPE: Range<usize> = 0..2;
    pub const PROTO_TYPE: Range<usize> = 2..4;
    pub const HW_LEN: usize = 4;
    pub const PROTO_LEN: usize = 5;
    pub const OPER: Range<usize> = 6..8;
    pub const SHA: Range<usize> = 8..14;
    pub const SPA: Range<usize> = 14..18;
    pub const THA: Range<usize> = 18..24;
    pub const TPA: Range<usize> = 24..28;
}

/// ARP message view over the Ethernet payload. Only Ethernet/IPv4 is spoken.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const PACKET_LEN: usize = 28;

    pub fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Packet { buffer };
        if packet.buffer.as_ref().len() < Self::PACKET_LEN {
            return Err(Error::Malformed);
        }
        if packet.hardware_type() != Hardware::ETHERNET
            || packet.protocol_type() != Protocols::IPV4
            || packet.buffer.as_ref()[field::HW_LEN] != 6
            || packet.buffer.as_ref()[field::PROTO_LEN] != 4
        {
            return Err(Error::Unsupported);
        }
        Ok(packet)
    }

    pub fn hardware_type(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::HW_TYPE])
    }

    pub fn protocol_type(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::PROTO_TYPE])
    }

    pub fn operation(&self) -> Operation {
        Operation::from(NetworkEndian::read_u16(&self.buffer.as_ref()[field::OPER]))
    }

    pub fn source_hw_addr(&self) -> EthernetAddress {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&self.buffer.as_ref()[field::SHA]);
        EthernetAddress(bytes)
    }

    pub fn source_proto_addr(&self) -> Ipv4Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.buffer.as_ref()[field::SPA]);
        Ipv4Address(bytes)
    }

    pub fn target_hw_addr(&self) -> EthernetAddress {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&self.buffer.as_ref()[field::THA]);
        EthernetAddress(bytes)
    }

    pub fn target_proto_addr(&self) -> Ipv4Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.buffer.as_ref()[field::TPA]);
        Ipv4Address(bytes)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    // Ethernet/IPv4 fixed fields
    pub fn set_ethernet_ipv4(&mut self) {
        let buffer = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut buffer[field::HW_TYPE], Hardware::ETHERNET);
        NetworkEndian::write_u16(&mut buffer[field::PROTO_TYPE], Protocols::IPV4);
        buffer[field::HW_LEN] = 6;
        buffer[field::PROTO_LEN] = 4;
    }

    pub fn set_operation(&mut self, op: Operation) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::OPER], op.into());
    }

    pub fn set_source_hw_addr(&mut self, addr: EthernetAddress) {
        self.buffer.as_mut()[field::SHA].copy_from_slice(addr.as_bytes());
    }

    pub fn set_source_proto_addr(&mut self, addr: Ipv4Address) {
        self.buffer.as_mut()[field::SPA].copy_from_slice(addr.as_bytes());
    }

    pub fn set_target_hw_addr(&mut self, addr: EthernetAddress) {
        self.buffer.as_mut()[field::THA].copy_from_slice(addr.as_bytes());
    }

    pub fn set_target_proto_addr(&mut self, addr: Ipv4Address) {
        self.buffer.as_mut()[field::TPA].copy_from_slice(addr.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static REQUEST: [u8; 28] = [
        0, 1, // ethernet
        8, 0, // ipv4
        6, 4, // address lengths
        0, 1, // request
        0x10, 0x20, 0x30, 0x40, 0x50, 0x60, // sender mac
        192, 168, 1, 10, // sender ip
        0, 0, 0, 0, 0, 0, // target mac
        192, 168, 1, 153, // target ip
    ];

    #[test]
    fn reads_request() {
        let packet = Packet::new_checked(&REQUEST[..]).unwrap();
        assert_eq!(packet.operation(), Operation::Request);
        assert_eq!(
            packet.source_hw_addr(),
            EthernetAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x60])
        );
        assert_eq!(packet.source_proto_addr(), Ipv4Address([192, 168, 1, 10]));
        assert_eq!(packet.target_hw_addr(), EthernetAddress::ZERO);
        assert_eq!(packet.target_proto_addr(), Ipv4Address([192, 168, 1, 153]));
    }

    #[test]
    fn rejects_non_ethernet_hardware() {
        let mut bytes = REQUEST;
        bytes[1] = 6; // IEEE 802
        assert_eq!(Packet::new_checked(&bytes[..]).err(), Some(Error::Unsupported));
        assert_eq!(Packet::new_checked(&REQUEST[..27]).err(), Some(Error::Malformed));
    }

    #[test]
    fn writes_fields_in_place() {
        let mut bytes = [0u8; 28];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        packet.set_ethernet_ipv4();
        packet.set_operation(Operation::Request);
        packet.set_source_hw_addr(EthernetAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]));
        packet.set_source_proto_addr(Ipv4Address([192, 168, 1, 10]));
        packet.set_target_hw_addr(EthernetAddress::ZERO);
        packet.set_target_proto_addr(Ipv4Address([192, 168, 1, 153]));
        assert_eq!(bytes, REQUEST);
    }
}

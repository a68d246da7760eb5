/*
+-------------------+-------------------+-------------------+
| Destination MAC (6B) | Source MAC (6B) | EtherType (2B)     |
+-------------------+-------------------+-------------------+
|                  Payload (46 - 1500B)                     |
+-----------------------------------------------------------+
the controller strips and appends the FCS itself
*/

use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 6]);

impl Address {
    pub const BROADCAST: Address = Address([0xFF; 6]);
    pub const ZERO: Address = Address([0; 6]);

    pub fn from_bytes(data: &[u8]) -> Result<Address> {
        if data.len() != 6 {
            return Err(Error::Malformed);
        }
        let mut bytes = [0; 6];
        bytes.copy_from_slice(data);
        Ok(Address(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == Self::BROADCAST.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

#[allow(non_snake_case)]
pub mod EtherType {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
}

mod field {
    use core::ops::{Range, RangeFrom};

    pub const DST: Range<usize> = 0..6;
    pub const SRC: Range<usize> = 6..12;
    pub const ETHERTYPE: Range<usize> = 12..14;
    pub const PAYLOAD: RangeFrom<usize> = 14..;
}

/// Ethernet II header view over a frame buffer.
#[derive(Debug)]
pub struct Frame<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Frame<T> {
    pub const HEADER_LEN: usize = 14;

    pub fn new_unchecked(buffer: T) -> Frame<T> {
        Frame { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<Frame<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN {
            return Err(Error::Malformed);
        }
        Ok(Frame { buffer })
    }

    pub fn dst_addr(&self) -> Address {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&self.buffer.as_ref()[field::DST]);
        Address(bytes)
    }

    pub fn src_addr(&self) -> Address {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&self.buffer.as_ref()[field::SRC]);
        Address(bytes)
    }

    pub fn ethertype(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::ETHERTYPE])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[field::PAYLOAD]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Frame<T> {
    pub fn set_dst_addr(&mut self, addr: Address) {
        self.buffer.as_mut()[field::DST].copy_from_slice(addr.as_bytes());
    }

    pub fn set_src_addr(&mut self, addr: Address) {
        self.buffer.as_mut()[field::SRC].copy_from_slice(addr.as_bytes());
    }

    pub fn set_ethertype(&mut self, ethertype: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::ETHERTYPE], ethertype);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[field::PAYLOAD]
    }

    // reply in place: send back to whoever sent this, from `our_addr`
    pub fn swap_addrs(&mut self, our_addr: Address) {
        let src = self.src_addr();
        self.set_dst_addr(src);
        self.set_src_addr(our_addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_fields() {
        let bytes = [
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0xa0, 0xc9, 0x14, 0xc8, 0x01, 0x08, 0x06,
            0xAA,
        ];
        let frame = Frame::new_checked(&bytes[..]).unwrap();
        assert!(frame.dst_addr().is_broadcast());
        assert_eq!(frame.src_addr(), Address([0x00, 0xa0, 0xc9, 0x14, 0xc8, 0x01]));
        assert_eq!(frame.ethertype(), EtherType::ARP);
        assert_eq!(frame.payload(), &[0xAA]);
    }

    #[test]
    fn short_frame_is_malformed() {
        assert_eq!(Frame::new_checked(&[0u8; 13][..]).err(), Some(Error::Malformed));
    }

    #[test]
    fn swap_addrs_answers_the_sender() {
        let mut bytes = [0u8; 14];
        let peer = Address([2, 0, 0, 0, 0, 9]);
        let us = Address([2, 0, 0, 0, 0, 1]);
        let mut frame = Frame::new_checked(&mut bytes[..]).unwrap();
        frame.set_dst_addr(us);
        frame.set_src_addr(peer);
        frame.swap_addrs(us);
        assert_eq!(frame.dst_addr(), peer);
        assert_eq!(frame.src_addr(), us);
    }

    #[test]
    fn display_is_colon_hex() {
        let addr = Address([0, 0xa0, 0xc9, 0x14, 0xc8, 0]);
        assert_eq!(std::format!("{}", addr), "00:A0:C9:14:C8:00");
    }
}

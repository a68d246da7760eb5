use byteorder::{ByteOrder, NetworkEndian};

use crate::{Error, Result};

mod field {
    use core::ops::Range;

    pub const SRC_PORT: Range<usize> = 0..2;
    pub const DST_PORT: Range<usize> = 2..4;
    pub const LENGTH: Range<usize> = 4..6;
    pub const CHECKSUM: Range<usize> = 6..8;
}

/// UDP datagram view, starting at the UDP header.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const HEADER_LEN: usize = 8;
    pub const CHECKSUM_OFFSET: usize = field::CHECKSUM.start;

    pub fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    // the length field must cover the header and fit in the buffer
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Packet { buffer };
        let len = packet.buffer.as_ref().len();
        if len < Self::HEADER_LEN {
            return Err(Error::Malformed);
        }
        let field_len = packet.len() as usize;
        if field_len < Self::HEADER_LEN || field_len > len {
            return Err(Error::Malformed);
        }
        Ok(packet)
    }

    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::SRC_PORT])
    }

    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::DST_PORT])
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::LENGTH])
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::CHECKSUM])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[Self::HEADER_LEN..self.len() as usize]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::SRC_PORT], value);
    }

    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::DST_PORT], value);
    }

    pub fn set_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::LENGTH], value);
    }

    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::CHECKSUM], value);
    }

    pub fn swap_ports(&mut self) {
        let (src, dst) = (self.src_port(), self.dst_port());
        self.set_src_port(dst);
        self.set_dst_port(src);
    }

    // everything after the header, up to the end of the buffer
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[Self::HEADER_LEN..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_bounded_by_length_field() {
        let bytes = [0x04, 0xB0, 0x00, 0x35, 0x00, 0x0A, 0x00, 0x00, b'h', b'i', 0, 0];
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.src_port(), 1200);
        assert_eq!(packet.dst_port(), 53);
        assert_eq!(packet.payload(), b"hi");
    }

    #[test]
    fn length_field_past_buffer_is_malformed() {
        let bytes = [0, 1, 0, 2, 0x00, 0x20, 0, 0, 1, 2];
        assert_eq!(Packet::new_checked(&bytes[..]).err(), Some(Error::Malformed));
        let bytes = [0, 1, 0, 2, 0x00, 0x04, 0, 0];
        assert_eq!(Packet::new_checked(&bytes[..]).err(), Some(Error::Malformed));
    }

    #[test]
    fn swap_ports_in_place() {
        let mut bytes = [0x04, 0xB0, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        packet.swap_ports();
        assert_eq!(packet.src_port(), 53);
        assert_eq!(packet.dst_port(), 1200);
    }
}

use byteorder::{ByteOrder, NetworkEndian};

use crate::{Error, Result};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TcpFlags: u8 {
        const FIN = 0x01;
        const SYN = 0x02;
        const RST = 0x04;
        const PSH = 0x08;
        const ACK = 0x10;
        const URG = 0x20;
        const ECE = 0x40;
        const CWR = 0x80;
    }
}

pub mod option {
    pub const END: u8 = 0;
    pub const NOP: u8 = 1;
    pub const MSS: u8 = 2;
    pub const MSS_LEN: usize = 4;
}

mod field {
    use core::ops::Range;

    pub const SRC_PORT: Range<usize> = 0..2;
    pub const DST_PORT: Range<usize> = 2..4;
    pub const SEQ_NUM: Range<usize> = 4..8;
    pub const ACK_NUM: Range<usize> = 8..12;
    pub const DATA_OFF: usize = 12; // high nibble; low nibble holds NS + reserved
    pub const FLAGS: usize = 13;
    pub const WIN_SIZE: Range<usize> = 14..16;
    pub const CHECKSUM: Range<usize> = 16..18;
    pub const URGENT: Range<usize> = 18..20;
}

/// TCP segment view. The buffer starts at the TCP header and ends where the
/// IP total length says the segment ends.
///
/// Sequence and acknowledgement numbers are exposed both as raw big-endian
/// bytes, which is what [`add32`](crate::utils::checksum::add32) advances,
/// and as `u32`.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const HEADER_LEN: usize = 20;
    pub const CHECKSUM_OFFSET: usize = field::CHECKSUM.start;

    pub fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Packet { buffer };
        let len = packet.buffer.as_ref().len();
        if len < Self::HEADER_LEN {
            return Err(Error::Malformed);
        }
        let header_len = packet.header_len();
        if header_len < Self::HEADER_LEN || header_len > len {
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

    pub fn seq_bytes(&self) -> [u8; 4] {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.buffer.as_ref()[field::SEQ_NUM]);
        bytes
    }

    pub fn ack_bytes(&self) -> [u8; 4] {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.buffer.as_ref()[field::ACK_NUM]);
        bytes
    }

    pub fn seq_number(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[field::SEQ_NUM])
    }

    pub fn ack_number(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[field::ACK_NUM])
    }

    // data offset is in 32 bit words
    pub fn header_len(&self) -> usize {
        ((self.buffer.as_ref()[field::DATA_OFF] >> 4) as usize) * 4
    }

    pub fn flags(&self) -> TcpFlags {
        TcpFlags::from_bits_retain(self.buffer.as_ref()[field::FLAGS])
    }

    pub fn window_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::WIN_SIZE])
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::CHECKSUM])
    }

    pub fn urgent_at(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::URGENT])
    }

    pub fn options(&self) -> &[u8] {
        &self.buffer.as_ref()[Self::HEADER_LEN..self.header_len()]
    }

    /// Value of the MSS option, if the peer sent one.
    pub fn max_segment_size(&self) -> Option<u16> {
        let mut options = self.options();
        while let [kind, rest @ ..] = options {
            match *kind {
                option::END => return None,
                option::NOP => options = rest,
                _ => {
                    let len = *rest.first()? as usize;
                    if len < 2 || len > options.len() {
                        return None;
                    }
                    if *kind == option::MSS && len == option::MSS_LEN {
                        return Some(NetworkEndian::read_u16(&options[2..4]));
                    }
                    options = &options[len..];
                }
            }
        }
        None
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[self.header_len()..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::SRC_PORT], value);
    }

    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::DST_PORT], value);
    }

    pub fn set_seq_bytes(&mut self, value: [u8; 4]) {
        self.buffer.as_mut()[field::SEQ_NUM].copy_from_slice(&value);
    }

    pub fn set_ack_bytes(&mut self, value: [u8; 4]) {
        self.buffer.as_mut()[field::ACK_NUM].copy_from_slice(&value);
    }

    pub fn set_seq_number(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.buffer.as_mut()[field::SEQ_NUM], value);
    }

    pub fn set_ack_number(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.buffer.as_mut()[field::ACK_NUM], value);
    }

    // clears NS and the reserved bits
    pub fn set_header_len(&mut self, len: usize) {
        self.buffer.as_mut()[field::DATA_OFF] = ((len / 4) as u8) << 4;
    }

    pub fn set_flags(&mut self, flags: TcpFlags) {
        self.buffer.as_mut()[field::FLAGS] = flags.bits();
    }

    pub fn set_window_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::WIN_SIZE], value);
    }

    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::CHECKSUM], value);
    }

    pub fn set_urgent_at(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::URGENT], value);
    }

    pub fn swap_ports(&mut self) {
        let (src, dst) = (self.src_port(), self.dst_port());
        self.set_src_port(dst);
        self.set_dst_port(src);
    }

    pub fn swap_seq_ack(&mut self) {
        let (seq, ack) = (self.seq_bytes(), self.ack_bytes());
        self.set_seq_bytes(ack);
        self.set_ack_bytes(seq);
    }

    /// Writes a single MSS option right after the fixed header. The data
    /// offset must be set separately.
    pub fn write_mss_option(&mut self, mss: u16) {
        let at = Self::HEADER_LEN;
        let buffer = self.buffer.as_mut();
        buffer[at] = option::MSS;
        buffer[at + 1] = option::MSS_LEN as u8;
        NetworkEndian::write_u16(&mut buffer[at + 2..at + 4], mss);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let header_len = self.header_len();
        &mut self.buffer.as_mut()[header_len..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SYN from 192.168.1.10:50000 to port 80, seq 0x01020304, MSS 1460
    static SYN: [u8; 24] = [
        0xC3, 0x50, 0x00, 0x50, 0x01, 0x02, 0x03, 0x04, 0x00, 0x00, 0x00, 0x00, 0x60, 0x02, 0xFA,
        0xF0, 0x00, 0x00, 0x00, 0x00, 0x02, 0x04, 0x05, 0xB4,
    ];

    #[test]
    fn reads_syn() {
        let packet = Packet::new_checked(&SYN[..]).unwrap();
        assert_eq!(packet.src_port(), 50000);
        assert_eq!(packet.dst_port(), 80);
        assert_eq!(packet.seq_number(), 0x01020304);
        assert_eq!(packet.header_len(), 24);
        assert_eq!(packet.flags(), TcpFlags::SYN);
        assert_eq!(packet.window_len(), 64240);
        assert_eq!(packet.max_segment_size(), Some(1460));
        assert!(packet.payload().is_empty());
    }

    #[test]
    fn data_offset_past_buffer_is_malformed() {
        let mut bytes = [0u8; 20];
        bytes[12] = 0x60;
        assert_eq!(Packet::new_checked(&bytes[..]).err(), Some(Error::Malformed));
        bytes[12] = 0x40;
        assert_eq!(Packet::new_checked(&bytes[..]).err(), Some(Error::Malformed));
    }

    #[test]
    fn mss_option_after_nops() {
        let mut bytes = [0u8; 28];
        bytes[12] = 0x70;
        bytes[20..28].copy_from_slice(&[1, 1, 4, 2, 2, 4, 0x01, 0x2C]);
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(packet.max_segment_size(), Some(300));
    }

    #[test]
    fn swaps_in_place() {
        let mut bytes = SYN;
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        packet.set_ack_number(0xAABBCCDD);
        packet.swap_ports();
        packet.swap_seq_ack();
        assert_eq!(packet.src_port(), 80);
        assert_eq!(packet.dst_port(), 50000);
        assert_eq!(packet.seq_number(), 0xAABBCCDD);
        assert_eq!(packet.ack_bytes(), [1, 2, 3, 4]);
    }

    #[test]
    fn writes_mss_and_flags() {
        let mut bytes = [0u8; 24];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        packet.set_header_len(24);
        packet.set_flags(TcpFlags::SYN | TcpFlags::ACK);
        packet.write_mss_option(512);
        assert_eq!(bytes[12], 0x60);
        assert_eq!(bytes[13], 0x12);
        assert_eq!(&bytes[20..24], &[2, 4, 0x02, 0x00]);
    }
}

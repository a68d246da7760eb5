use crate::repr::Ipv4Protocol;

/// Which pseudo-header, if any, the summed span starts with.
///
/// For [`PseudoHeader::Udp`] and [`PseudoHeader::Tcp`] the span must begin at
/// the source address field of the IPv4 header, so the two addresses are
/// summed in place; the protocol number and the transport length
/// (`len - 8`) are added up front.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PseudoHeader {
    None,
    Udp,
    Tcp,
}

// internet checksum based on RFC 1071
pub fn internet_checksum(buffer: &[u8], kind: PseudoHeader) -> u16 {
    let len = buffer.len();

    let mut sum: u64 = match kind {
        PseudoHeader::None => 0,
        PseudoHeader::Udp => u8::from(Ipv4Protocol::Udp) as u64 + len.saturating_sub(8) as u64,
        PseudoHeader::Tcp => u8::from(Ipv4Protocol::Tcp) as u64 + len.saturating_sub(8) as u64,
    };

    let mut i = 0;
    while i + 1 < len {
        let word = ((buffer[i] as u64) << 8) | (buffer[i + 1] as u64);
        sum += word;
        i += 2;
    }

    if len % 2 != 0 {
        sum += (buffer[len - 1] as u64) << 8;
    }

    // fold carry bits into lower 16
    while (sum >> 16) > 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// Adds `op16` to the big-endian 32 bit number in `op32`, carrying from the
/// least significant byte upwards. Wraps at 2^32 like sequence numbers do.
pub fn add32(op32: &mut [u8; 4], op16: u16) {
    let [hi, lo] = op16.to_be_bytes();
    let mut carry = 0u16;

    for (index, operand) in [(3, lo), (2, hi), (1, 0), (0, 0)] {
        let sum = op32[index] as u16 + operand as u16 + carry;
        op32[index] = sum as u8;
        carry = sum >> 8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_filled_header_verifies_to_zero() {
        // IPv4 header from RFC 1071 discussions, checksum zeroed
        let mut header = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        let checksum = internet_checksum(&header, PseudoHeader::None);
        assert_eq!(checksum, 0xb861);

        header[10..12].copy_from_slice(&checksum.to_be_bytes());
        assert_eq!(internet_checksum(&header, PseudoHeader::None), 0);
    }

    #[test]
    fn odd_length_pads_last_byte_high() {
        assert_eq!(internet_checksum(&[0x12], PseudoHeader::None), !0x1200);
        assert_eq!(
            internet_checksum(&[0xAB, 0xCD, 0x12], PseudoHeader::None),
            !(0xABCDu16 + 0x1200)
        );
    }

    #[test]
    fn odd_payload_still_verifies() {
        let mut data = [0u8; 11];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = (i as u8).wrapping_mul(37).wrapping_add(200);
        }
        // checksum slot in bytes 2..4
        data[2..4].fill(0);
        let checksum = internet_checksum(&data, PseudoHeader::None);
        data[2..4].copy_from_slice(&checksum.to_be_bytes());
        assert_eq!(internet_checksum(&data, PseudoHeader::None), 0);
    }

    #[test]
    fn pseudo_header_seeds_protocol_and_length() {
        // src 10.0.0.1, dst 10.0.0.2, UDP 1200 -> 53, len 8, no payload
        let span = [
            10, 0, 0, 1, 10, 0, 0, 2, 0x04, 0xB0, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00,
        ];
        let mut manual: u32 = 17 + 8;
        for pair in span.chunks(2) {
            manual += u16::from_be_bytes([pair[0], pair[1]]) as u32;
        }
        while manual >> 16 != 0 {
            manual = (manual & 0xFFFF) + (manual >> 16);
        }
        assert_eq!(internet_checksum(&span, PseudoHeader::Udp), !(manual as u16));
        assert_ne!(
            internet_checksum(&span, PseudoHeader::Udp),
            internet_checksum(&span, PseudoHeader::Tcp)
        );
    }

    #[test]
    fn add32_carries_into_third_byte() {
        let mut op = [0, 0, 0, 0xFF];
        add32(&mut op, 2);
        assert_eq!(op, [0, 0, 1, 0x01]);
    }

    #[test]
    fn add32_carries_through_every_byte() {
        let mut op = [0x00, 0xFF, 0xFF, 0xFF];
        add32(&mut op, 1);
        assert_eq!(op, [0x01, 0x00, 0x00, 0x00]);

        let mut op = [0x12, 0x34, 0xFF, 0x10];
        add32(&mut op, 0x01F0);
        assert_eq!(u32::from_be_bytes(op), 0x1234_FF10 + 0x01F0);
    }

    #[test]
    fn add32_wraps() {
        let mut op = [0xFF; 4];
        add32(&mut op, 0x0101);
        assert_eq!(op, [0, 0, 1, 0]);
    }
}

use byteorder::{ByteOrder, NetworkEndian};

use super::Ipv4Address;
use crate::{Error, Result};

pub const PORT: u16 = 53;

pub mod flags {
    pub const RESPONSE: u16 = 0x8000;
    pub const RECURSION_DESIRED: u16 = 0x0100;
    pub const RCODE_MASK: u16 = 0x000F;
}

pub mod rtype {
    pub const A: u16 = 1;
}

pub const CLASS_IN: u16 = 1;

// top two bits of a length byte mark a compression pointer
const POINTER_MASK: u8 = 0xC0;
const MAX_LABEL_LEN: usize = 63;

mod field {
    use core::ops::Range;

    pub const ID: Range<usize> = 0..2;
    pub const FLAGS: Range<usize> = 2..4;
    pub const QDCOUNT: Range<usize> = 4..6;
    pub const ANCOUNT: Range<usize> = 6..8;
    pub const NSCOUNT: Range<usize> = 8..10;
    pub const ARCOUNT: Range<usize> = 10..12;
}

/// DNS message header view. The buffer is the whole UDP payload, so the
/// question and answer sections follow at [`Header::HEADER_LEN`].
#[derive(Debug)]
pub struct Header<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Header<T> {
    pub const HEADER_LEN: usize = 12;

    pub fn new_unchecked(buffer: T) -> Header<T> {
        Header { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<Header<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN {
            return Err(Error::Malformed);
        }
        Ok(Header { buffer })
    }

    pub fn id(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::ID])
    }

    pub fn flags(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::FLAGS])
    }

    pub fn question_count(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::QDCOUNT])
    }

    pub fn answer_count(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::ANCOUNT])
    }

    pub fn authority_count(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::NSCOUNT])
    }

    pub fn additional_count(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::ARCOUNT])
    }

    pub fn is_response(&self) -> bool {
        self.flags() & flags::RESPONSE != 0
    }

    pub fn rcode(&self) -> u8 {
        (self.flags() & flags::RCODE_MASK) as u8
    }

    /// Address from the first A record of the answer section.
    ///
    /// Questions are skipped by walking their names, so the reply does not
    /// have to echo the query at the same offset.
    pub fn first_a_record(&self) -> Result<Ipv4Address> {
        let buffer = self.buffer.as_ref();
        let mut offset = Self::HEADER_LEN;

        for _ in 0..self.question_count() {
            offset = skip_name(buffer, offset)?;
            // QTYPE, QCLASS
            offset += 4;
        }

        for _ in 0..self.answer_count() {
            let record = parse_record(buffer, offset)?;
            if record.rtype == rtype::A && record.rdata.len() == 4 {
                return Ipv4Address::from_bytes(record.rdata);
            }
            offset = record.next;
        }

        Err(Error::NoAnswer)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Header<T> {
    pub fn set_id(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::ID], value);
    }

    pub fn set_flags(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::FLAGS], value);
    }

    pub fn set_question_count(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::QDCOUNT], value);
    }

    pub fn set_answer_count(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::ANCOUNT], value);
    }

    pub fn set_authority_count(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::NSCOUNT], value);
    }

    pub fn set_additional_count(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::ARCOUNT], value);
    }
}

/// Resource record as found in the answer section.
#[derive(Debug, PartialEq, Eq)]
pub struct Record<'a> {
    pub rtype: u16,
    pub rdata: &'a [u8],
    // offset of the record that follows
    pub next: usize,
}

pub fn parse_record(buffer: &[u8], offset: usize) -> Result<Record<'_>> {
    let offset = skip_name(buffer, offset)?;
    // TYPE, CLASS, TTL, RDLENGTH
    let fixed = buffer.get(offset..offset + 10).ok_or(Error::Malformed)?;
    let rdlength = NetworkEndian::read_u16(&fixed[8..10]) as usize;
    let start = offset + 10;
    let rdata = buffer.get(start..start + rdlength).ok_or(Error::Malformed)?;

    Ok(Record {
        rtype: NetworkEndian::read_u16(&fixed[0..2]),
        rdata,
        next: start + rdlength,
    })
}

/// Returns the offset just past the name starting at `offset`. A compression
/// pointer ends the name and takes two bytes; it is not followed.
pub fn skip_name(buffer: &[u8], mut offset: usize) -> Result<usize> {
    loop {
        let len = *buffer.get(offset).ok_or(Error::Malformed)?;
        if len & POINTER_MASK == POINTER_MASK {
            if offset + 2 > buffer.len() {
                return Err(Error::Malformed);
            }
            return Ok(offset + 2);
        }
        if len & POINTER_MASK != 0 {
            // 0x40 and 0x80 label types are obsolete
            return Err(Error::Unsupported);
        }
        offset += 1;
        if len == 0 {
            return Ok(offset);
        }
        offset += len as usize;
    }
}

/// Writes `name` in label encoding: every dot-separated label prefixed with
/// its length, terminated by the root label. Input ends at the first
/// backslash, if any. Returns the number of bytes written.
pub fn encode_name(name: &str, out: &mut [u8]) -> Result<usize> {
    let name = name.split('\\').next().unwrap_or("");
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() {
        return Err(Error::Malformed);
    }

    let mut at = 0;
    for label in name.split('.') {
        let label = label.as_bytes();
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(Error::Malformed);
        }
        let dst = out.get_mut(at..at + 1 + label.len()).ok_or(Error::Exhausted)?;
        dst[0] = label.len() as u8;
        dst[1..].copy_from_slice(label);
        at += 1 + label.len();
    }

    *out.get_mut(at).ok_or(Error::Exhausted)? = 0;
    Ok(at + 1)
}

/// Writes a recursive, single question query for the A record of `name`
/// into `out`, which must start at the DNS header. Returns the message
/// length.
pub fn write_query(out: &mut [u8], id: u16, name: &str) -> Result<usize> {
    let mut header = Header::new_checked(&mut *out).map_err(|_| Error::Exhausted)?;
    header.set_id(id);
    header.set_flags(flags::RECURSION_DESIRED);
    header.set_question_count(1);
    header.set_answer_count(0);
    header.set_authority_count(0);
    header.set_additional_count(0);

    let at = Header::<&[u8]>::HEADER_LEN;
    let at = at + encode_name(name, &mut out[at..])?;
    let question = out.get_mut(at..at + 4).ok_or(Error::Exhausted)?;
    NetworkEndian::write_u16(&mut question[0..2], rtype::A);
    NetworkEndian::write_u16(&mut question[2..4], CLASS_IN);
    Ok(at + 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_labels() {
        let mut out = [0xEEu8; 20];
        let len = encode_name("api.cosm.com", &mut out).unwrap();
        assert_eq!(&out[..len], b"\x03api\x04cosm\x03com\x00");
        assert_eq!(encode_name("api.cosm.com.", &mut out), Ok(14));
        assert_eq!(encode_name("api.cosm.com\\ignored", &mut out), Ok(14));
    }

    #[test]
    fn rejects_bad_names() {
        let mut out = [0u8; 100];
        assert_eq!(encode_name("", &mut out), Err(Error::Malformed));
        assert_eq!(encode_name("a..b", &mut out), Err(Error::Malformed));
        let long = [b'x'; 64];
        let long = core::str::from_utf8(&long).unwrap();
        assert_eq!(encode_name(long, &mut out), Err(Error::Malformed));
        assert_eq!(encode_name("api.cosm.com", &mut out[..13]), Err(Error::Exhausted));
    }

    #[test]
    fn query_ends_with_type_and_class() {
        let mut out = [0u8; 64];
        let len = write_query(&mut out, 0xBAAB, "api.cosm.com").unwrap();
        assert_eq!(len, 12 + 14 + 4);
        assert_eq!(&out[..4], &[0xBA, 0xAB, 0x01, 0x00]);
        assert_eq!(&out[4..12], &[0, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&out[26..30], &[0, 1, 0, 1]);
    }

    #[test]
    fn skips_pointers_and_labels() {
        let buffer = [3, b'c', b'o', b'm', 0, 0xC0, 0x0C, 0xFF];
        assert_eq!(skip_name(&buffer, 0), Ok(5));
        assert_eq!(skip_name(&buffer, 5), Ok(7));
        assert_eq!(skip_name(&buffer[..6], 5), Err(Error::Malformed));
        assert_eq!(skip_name(&[4, b'a'], 0), Err(Error::Malformed));
    }

    fn reply(answers: &[&[u8]]) -> ([u8; 128], usize) {
        let mut out = [0u8; 128];
        let mut len = write_query(&mut out, 0xBAAB, "a.io").unwrap();
        let mut header = Header::new_unchecked(&mut out[..]);
        header.set_flags(0x8180);
        header.set_answer_count(answers.len() as u16);
        for answer in answers {
            out[len..len + answer.len()].copy_from_slice(answer);
            len += answer.len();
        }
        (out, len)
    }

    #[test]
    fn first_a_record_skips_other_types() {
        // CNAME first, then the A record, both with compressed names
        let cname: &[u8] = &[0xC0, 0x0C, 0, 5, 0, 1, 0, 0, 0, 60, 0, 2, 0xC0, 0x0C];
        let a: &[u8] = &[0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 0x0E, 0x10, 0, 4, 216, 52, 233, 10];
        let (out, len) = reply(&[cname, a]);
        let header = Header::new_checked(&out[..len]).unwrap();
        assert!(header.is_response());
        assert_eq!(header.rcode(), 0);
        assert_eq!(header.first_a_record(), Ok(Ipv4Address([216, 52, 233, 10])));
    }

    #[test]
    fn no_a_record_or_truncated() {
        let cname: &[u8] = &[0xC0, 0x0C, 0, 5, 0, 1, 0, 0, 0, 60, 0, 2, 0xC0, 0x0C];
        let (out, len) = reply(&[cname]);
        assert_eq!(
            Header::new_checked(&out[..len]).unwrap().first_a_record(),
            Err(Error::NoAnswer)
        );

        let a: &[u8] = &[0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 0x0E, 0x10, 0, 4, 216, 52];
        let (out, len) = reply(&[a]);
        assert_eq!(
            Header::new_checked(&out[..len]).unwrap().first_a_record(),
            Err(Error::Malformed)
        );
    }
}

use core::fmt;
use core::ops::Deref;

use crate::{Error, Result};

// growable view over a fixed buffer; writes past the end fail instead of panicking
#[derive(Debug)]
pub struct Slice<'a> {
    buffer: &'a mut [u8],
    len: usize,
}

impl<'a> From<&'a mut [u8]> for Slice<'a> {
    fn from(buffer: &'a mut [u8]) -> Self {
        Slice { buffer, len: 0 }
    }
}

impl Deref for Slice<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

impl Slice<'_> {
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.len
    }

    // appends `data`, or leaves the slice untouched if it does not fit
    pub fn try_extend(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.remaining() {
            return Err(Error::Exhausted);
        }
        self.buffer[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }
}

impl fmt::Write for Slice<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.try_extend(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn formats_into_fixed_buffer() {
        let mut storage = [0u8; 16];
        let mut out = Slice::from(&mut storage[..]);
        write!(out, "{}-{}", 12, "ab").unwrap();
        assert_eq!(&*out, b"12-ab");
        assert_eq!(out.remaining(), 11);
    }

    #[test]
    fn overflow_is_rejected_whole() {
        let mut storage = [0u8; 4];
        let mut out = Slice::from(&mut storage[..]);
        out.try_extend(b"abc").unwrap();
        assert_eq!(out.try_extend(b"de"), Err(Error::Exhausted));
        assert_eq!(&*out, b"abc");
        assert!(write!(out, "xyz").is_err());
    }
}

pub mod checksum;
pub mod slice;

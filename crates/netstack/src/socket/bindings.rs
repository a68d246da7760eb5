use core::fmt::{Display, Formatter, Result as FmtResult};
use core::hash::Hash;

use crate::repr::Ipv4Address;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SocketAddr {
    pub addr: Ipv4Address,
    pub port: u16,
}

impl SocketAddr {
    pub const fn new(addr: Ipv4Address, port: u16) -> Self {
        SocketAddr { addr, port }
    }
}

impl Display for SocketAddr {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

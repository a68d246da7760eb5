//! A small polling TCP/IP stack for a microcontroller talking to an SPI
//! Ethernet controller.
//!
//! Every inbound frame goes through a single dispatcher
//! ([`Interface::get_packet`]) which answers ARP and ping requests on its
//! own, drives the one webserver/webclient exchange the stack can hold,
//! and hands UDP datagrams to the [`Application`]. Outbound frames always go
//! to the default gateway, whose MAC address is resolved once at
//! [`Interface::start`].
//!
//! The chip driver itself lives outside this crate and is reached through
//! the [`Device`] trait; wall-clock time for the bounded waits comes from a
//! [`Clock`].
#![no_std]

#[cfg(test)]
extern crate std;

pub mod app;
pub mod config;
pub mod iface;
pub mod repr;
pub mod socket;
pub mod utils;


use core::fmt;
use core::result::Result as CoreResult;

pub use app::{Application, DefaultApplication};
pub use config::{Config, MAX_PACKET_LEN};
pub use iface::{Clock, Interface, PacketBuffer};
pub use repr::{Device, EthernetAddress, Ipv4Address, Ipv4Protocol};
pub use socket::SocketAddr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    // no frame waiting in the controller
    NoData,
    // the controller aborted the transmission
    TransmitFailed,
    // bounded ARP/DNS wait ran out
    Timeout,
    // frame was handled (or dropped) but is not what the caller waits for
    ProtocolMismatch,
    // truncated or inconsistent packet
    Malformed,
    // bad IPv4 header checksum
    Checksum,
    // valid, but uses something we don't speak (IP options, non-ethernet ARP)
    Unsupported,
    // does not fit in the packet buffer
    Exhausted,
    LinkDown,
    // a webclient exchange is already in flight
    Busy,
    // DNS server answered with a non-zero RCODE
    DnsError(u8),
    // DNS reply carried no usable A record
    NoAnswer,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoData => write!(f, "no frame available"),
            Error::TransmitFailed => write!(f, "transmit aborted by controller"),
            Error::Timeout => write!(f, "timed out"),
            Error::ProtocolMismatch => write!(f, "protocol mismatch"),
            Error::Malformed => write!(f, "malformed packet"),
            Error::Checksum => write!(f, "bad checksum"),
            Error::Unsupported => write!(f, "unsupported packet"),
            Error::Exhausted => write!(f, "packet buffer exhausted"),
            Error::LinkDown => write!(f, "link is down"),
            Error::Busy => write!(f, "webclient busy"),
            Error::DnsError(rcode) => write!(f, "dns error (rcode {})", rcode),
            Error::NoAnswer => write!(f, "dns reply without A record"),
        }
    }
}

pub type Result<T> = CoreResult<T, Error>;

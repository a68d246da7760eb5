/* wire formats
*
* every header is a thin view over a byte buffer with big-endian accessors,
* so a received frame can be answered by rewriting it in place
*/

mod arp;
pub mod dev;
pub mod dns;
mod ethernet;
pub mod http;
mod icmp;
mod ipv4;
mod tcp;
mod udp;

pub use self::ethernet::{
    Address as EthernetAddress, EtherType as EthernetType, Frame as EthernetFrame,
};

pub use self::arp::{Operation as ArpOperation, Packet as ArpPacket};

pub use self::ipv4::{
    flags as Ipv4Flags, Address as Ipv4Address, Packet as Ipv4Packet, Protocol as Ipv4Protocol,
};

pub use self::icmp::{Message as IcmpMessage, Packet as IcmpPacket};

pub use self::udp::Packet as UdpPacket;

pub use self::tcp::{option as TcpOption, Packet as TcpPacket, TcpFlags};

pub use self::dns::Header as DnsHeader;

pub use self::http::{Method as HttpMethod, Request as HttpRequest, Response as HttpResponse};

pub use dev::Device;

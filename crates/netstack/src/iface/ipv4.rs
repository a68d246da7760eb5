use log::trace;

use crate::app::Application;
use crate::iface::{icmp, tcp, udp, Clock, Interface, PacketBuffer};
use crate::repr::{
    Device, EthernetFrame, EthernetType, Ipv4Address, Ipv4Flags, Ipv4Packet, Ipv4Protocol,
    TcpPacket, UdpPacket,
};
use crate::utils::checksum::PseudoHeader;
use crate::{Error, Result};

// ethernet + ip header, no options
pub const HEADERS_LEN: usize = EthernetFrame::<&[u8]>::HEADER_LEN + Ipv4Packet::<&[u8]>::HEADER_LEN;

/// Fills the Ethernet and IPv4 headers of a fresh outbound packet to `dst`
/// via the gateway. Total length and checksum are left to
/// [`finish_ip_packet`].
pub fn setup_basic_ip_packet<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut PacketBuffer,
    protocol: Ipv4Protocol,
    dst: Ipv4Address,
) {
    let ident = interface.next_ident();

    let mut frame = EthernetFrame::new_unchecked(&mut buf[..]);
    frame.set_ethertype(EthernetType::IPV4);
    frame.set_dst_addr(interface.gateway_mac);
    frame.set_src_addr(interface.ethernet_addr);

    let mut packet = Ipv4Packet::new_unchecked(frame.payload_mut());
    packet.set_version_and_header_len(4, Ipv4Packet::<&[u8]>::HEADER_LEN);
    packet.set_dscp(0);
    set_station_ip_fields(interface, &mut packet, ident);
    packet.set_protocol(protocol);
    packet.set_checksum(0);
    packet.set_src_addr(interface.ipv4_addr);
    packet.set_dst_addr(dst);
}

/// Ident, fragment flags and TTL as this station sends them. Replies built
/// over a received packet get them too, so nothing of the peer's header
/// leaks into ours.
pub fn set_station_ip_fields<D: Device, C: Clock, T: AsRef<[u8]> + AsMut<[u8]>>(
    interface: &Interface<D, C>,
    packet: &mut Ipv4Packet<T>,
    ident: u16,
) {
    let flags = if interface.config.dont_fragment {
        Ipv4Flags::DONT_FRAGMENT
    } else {
        0
    };
    packet.set_ident(ident);
    packet.set_flags_frag(flags);
    packet.set_ttl(interface.config.ttl);
}

/// Sets the total length for `transport_len` bytes after the IP header and
/// fills the checksums. The transport checksum is computed for UDP and TCP;
/// for anything else the caller has already done it. Returns the frame
/// length.
pub fn finish_ip_packet(buf: &mut [u8], transport_len: usize, kind: PseudoHeader) -> Result<usize> {
    let buf_len = buf.len();
    let mut frame = EthernetFrame::new_checked(&mut *buf)?;
    let mut packet = Ipv4Packet::new_unchecked(frame.payload_mut());
    let total_len = packet.header_len() + transport_len;
    if EthernetFrame::<&[u8]>::HEADER_LEN + total_len > buf_len {
        return Err(Error::Exhausted);
    }

    packet.set_total_len(total_len as u16);
    match kind {
        PseudoHeader::Udp => {
            packet.fill_transport_checksum(kind, UdpPacket::<&[u8]>::CHECKSUM_OFFSET)
        }
        PseudoHeader::Tcp => {
            packet.fill_transport_checksum(kind, TcpPacket::<&[u8]>::CHECKSUM_OFFSET)
        }
        PseudoHeader::None => {}
    }
    packet.fill_checksum();

    Ok(EthernetFrame::<&[u8]>::HEADER_LEN + total_len)
}

// classify by ip protocol; a reply, if any, is sent before the match check
pub fn recv_ip_packet<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut PacketBuffer,
    len: usize,
    wanted: Option<Ipv4Protocol>,
    app: &mut dyn Application,
) -> Result<usize> {
    let protocol = {
        let packet = Ipv4Packet::new_checked(&buf[EthernetFrame::<&[u8]>::HEADER_LEN..len])?;
        if !packet.verify_checksum() {
            return Err(Error::Checksum);
        }
        let dst = packet.dst_addr();
        if dst != interface.ipv4_addr && !dst.is_broadcast() {
            trace!("ip: not for us ({})", dst);
            return Err(Error::ProtocolMismatch);
        }
        packet.protocol()
    };

    let handled = match protocol {
        Ipv4Protocol::Icmp => icmp::recv_icmp_packet(interface, buf, len),
        Ipv4Protocol::Tcp => tcp::recv_tcp_packet(interface, buf, len, app),
        // a waiting caller gets the datagram before the application sees it
        Ipv4Protocol::Udp if wanted == Some(Ipv4Protocol::Udp) => return Ok(len),
        Ipv4Protocol::Udp => udp::recv_udp_packet(interface, buf, len, app),
        Ipv4Protocol::Unknown(_) => Err(Error::ProtocolMismatch),
    };
    match handled {
        Ok(()) | Err(Error::ProtocolMismatch) => {}
        Err(err) => return Err(err),
    }

    if wanted == Some(protocol) {
        Ok(len)
    } else {
        Err(Error::ProtocolMismatch)
    }
}

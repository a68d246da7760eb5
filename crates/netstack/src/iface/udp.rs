use log::debug;

use crate::app::Application;
use crate::config::MAX_PACKET_LEN;
use crate::iface::ipv4::{
    finish_ip_packet, set_station_ip_fields, setup_basic_ip_packet, HEADERS_LEN,
};
use crate::iface::{Clock, Interface, PacketBuffer};
use crate::repr::{Device, EthernetFrame, Ipv4Packet, Ipv4Protocol, UdpPacket};
use crate::socket::SocketAddr;
use crate::utils::checksum::PseudoHeader;
use crate::{Error, Result};

const ETH_LEN: usize = EthernetFrame::<&[u8]>::HEADER_LEN;
const UDP_LEN: usize = UdpPacket::<&[u8]>::HEADER_LEN;

/// Largest payload a datagram built by this stack can carry.
pub const MAX_PAYLOAD_LEN: usize = MAX_PACKET_LEN - HEADERS_LEN - UDP_LEN;

// where a reply's payload sits in the frame
const REPLY_DATA_AT: usize = HEADERS_LEN + UDP_LEN;

// fresh datagram from the configured local port
pub fn udp_send<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut PacketBuffer,
    target: SocketAddr,
    payload: &[u8],
) -> Result<()> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::Exhausted);
    }

    setup_basic_ip_packet(interface, buf, Ipv4Protocol::Udp, target.addr);

    let udp_len = UDP_LEN + payload.len();
    {
        let mut udp = UdpPacket::new_unchecked(&mut buf[HEADERS_LEN..HEADERS_LEN + udp_len]);
        udp.set_src_port(interface.config.udp_port);
        udp.set_dst_port(target.port);
        udp.set_len(udp_len as u16);
        udp.payload_mut().copy_from_slice(payload);
    }
    let frame_len = finish_ip_packet(buf, udp_len, PseudoHeader::Udp)?;

    debug!("udp: {} bytes to {}", payload.len(), target);
    interface.transmit(&buf[..frame_len])
}

/// Answers the datagram in `buf` with `payload`, in place. A payload that
/// does not fit in `buf` is refused before anything is modified.
pub fn udp_reply<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
    payload: &[u8],
) -> Result<()> {
    check_reply(buf, len, payload.len())?;
    buf[REPLY_DATA_AT..REPLY_DATA_AT + payload.len()].copy_from_slice(payload);
    send_reply(interface, buf, len, payload.len())
}

// the pseudo-header sum assumes the addresses end the IP header
fn check_reply(buf: &[u8], len: usize, payload_len: usize) -> Result<()> {
    let header_len = Ipv4Packet::new_checked(&buf[ETH_LEN..len])?.header_len();
    if header_len != Ipv4Packet::<&[u8]>::HEADER_LEN {
        return Err(Error::Unsupported);
    }
    if REPLY_DATA_AT + payload_len > buf.len() {
        return Err(Error::Exhausted);
    }
    Ok(())
}

// turns the headers around; the payload is already at REPLY_DATA_AT
fn send_reply<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
    payload_len: usize,
) -> Result<()> {
    let udp_len = UDP_LEN + payload_len;
    let frame_len = REPLY_DATA_AT + payload_len;
    let ident = interface.next_ident();

    {
        let mut frame = EthernetFrame::new_unchecked(&mut buf[..frame_len]);
        frame.swap_addrs(interface.ethernet_addr);

        let mut packet = Ipv4Packet::new_unchecked(frame.payload_mut());
        packet.swap_addrs(interface.ipv4_addr);
        packet.set_total_len((Ipv4Packet::<&[u8]>::HEADER_LEN + udp_len) as u16);
        set_station_ip_fields(interface, &mut packet, ident);
        {
            let mut udp = UdpPacket::new_unchecked(packet.payload_mut());
            udp.swap_ports();
            udp.set_len(udp_len as u16);
        }
        packet.fill_transport_checksum(PseudoHeader::Udp, UdpPacket::<&[u8]>::CHECKSUM_OFFSET);
        packet.fill_checksum();
    }

    debug!("udp: {} byte reply ({} received)", payload_len, len);
    interface.transmit(&buf[..frame_len])
}

/// Hands the datagram to the application and sends back whatever it
/// answers. The answer is written into the free tail of `buf`, behind the
/// received payload, and moved into place afterwards.
pub fn recv_udp_packet<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
    app: &mut dyn Application,
) -> Result<()> {
    check_reply(buf, len, 0)?;
    let (from, payload_len) = {
        let packet = Ipv4Packet::new_checked(&buf[ETH_LEN..len])?;
        let udp = UdpPacket::new_checked(packet.payload())?;
        (SocketAddr::new(packet.src_addr(), udp.src_port()), udp.payload().len())
    };

    let scratch_at = REPLY_DATA_AT + payload_len;
    let reply_len = {
        let (received, scratch) = buf.split_at_mut(scratch_at);
        app.process_udp(from, &received[REPLY_DATA_AT..], scratch)
    };

    match reply_len {
        Some(reply_len) if scratch_at + reply_len <= buf.len() => {
            buf.copy_within(scratch_at..scratch_at + reply_len, REPLY_DATA_AT);
            send_reply(interface, buf, len, reply_len)
        }
        Some(_) => Err(Error::Exhausted),
        None => Ok(()),
    }
}

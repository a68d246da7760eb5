use log::debug;

use crate::iface::ipv4::{
    finish_ip_packet, set_station_ip_fields, setup_basic_ip_packet, HEADERS_LEN,
};
use crate::iface::{Clock, Interface, PacketBuffer};
use crate::repr::{
    Device, EthernetFrame, IcmpMessage, IcmpPacket, Ipv4Address, Ipv4Packet, Ipv4Protocol,
};
use crate::utils::checksum::PseudoHeader;
use crate::{Error, Result};

pub const PING_IDENT: u16 = 1;
pub const PING_SEQ_NO: u16 = 76;
pub const PING_DATA_LEN: usize = 18;

pub fn recv_icmp_packet<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
) -> Result<()> {
    let msg_type = {
        let packet = Ipv4Packet::new_checked(&buf[EthernetFrame::<&[u8]>::HEADER_LEN..len])?;
        IcmpPacket::new_checked(packet.payload())?.msg_type()
    };

    match msg_type {
        IcmpMessage::EchoRequest => ping_reply(interface, buf, len),
        _ => Err(Error::ProtocolMismatch),
    }
}

/// Answers the echo request in `buf` in place and sends it back with the
/// length it arrived with.
pub fn ping_reply<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
) -> Result<()> {
    let ident = interface.next_ident();
    let mut frame = EthernetFrame::new_checked(&mut buf[..len])?;
    let mut packet = Ipv4Packet::new_checked(frame.payload_mut())?;
    {
        let mut icmp = IcmpPacket::new_checked(packet.payload_mut())?;
        if icmp.msg_type() != IcmpMessage::EchoRequest {
            return Err(Error::ProtocolMismatch);
        }
        icmp.set_msg_type(IcmpMessage::EchoReply);
        icmp.fill_checksum();
    }
    let peer = packet.src_addr();
    packet.swap_addrs(interface.ipv4_addr);
    set_station_ip_fields(interface, &mut packet, ident);
    packet.fill_checksum();
    frame.swap_addrs(interface.ethernet_addr);

    debug!("icmp: echo reply to {}", peer);
    interface.transmit(&buf[..len])
}

// echo request with 'A'.. filler, through the gateway
pub fn send_ping<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut PacketBuffer,
    target: Ipv4Address,
) -> Result<()> {
    setup_basic_ip_packet(interface, buf, Ipv4Protocol::Icmp, target);

    let icmp_len = IcmpPacket::<&[u8]>::HEADER_LEN + PING_DATA_LEN;
    {
        let mut icmp = IcmpPacket::new_unchecked(&mut buf[HEADERS_LEN..HEADERS_LEN + icmp_len]);
        icmp.set_msg_type(IcmpMessage::EchoRequest);
        icmp.set_msg_code(0);
        icmp.set_echo_ident(PING_IDENT);
        icmp.set_echo_seq_no(PING_SEQ_NO);
        for (byte, fill) in icmp.data_mut().iter_mut().zip(b'A'..) {
            *byte = fill;
        }
        icmp.fill_checksum();
    }
    let frame_len = finish_ip_packet(buf, icmp_len, PseudoHeader::None)?;

    debug!("icmp: echo request to {}", target);
    interface.transmit(&buf[..frame_len])
}

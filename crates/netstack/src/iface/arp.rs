use log::{debug, trace, warn};

use crate::iface::{Clock, Interface, PacketBuffer};
use crate::repr::{
    ArpOperation, ArpPacket, Device, EthernetAddress, EthernetFrame, EthernetType, Ipv4Address,
};
use crate::{Error, Result};

const ETH_LEN: usize = EthernetFrame::<&[u8]>::HEADER_LEN;
pub const ARP_FRAME_LEN: usize = ETH_LEN + ArpPacket::<&[u8]>::PACKET_LEN;

// broadcast who-has `target`
pub fn send_arp_request<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    target: Ipv4Address,
) -> Result<()> {
    let mut buf = [0u8; ARP_FRAME_LEN];

    let mut frame = EthernetFrame::new_unchecked(&mut buf[..]);
    frame.set_dst_addr(EthernetAddress::BROADCAST);
    frame.set_src_addr(interface.ethernet_addr);
    frame.set_ethertype(EthernetType::ARP);

    let mut packet = ArpPacket::new_unchecked(frame.payload_mut());
    packet.set_ethernet_ipv4();
    packet.set_operation(ArpOperation::Request);
    packet.set_source_hw_addr(interface.ethernet_addr);
    packet.set_source_proto_addr(interface.ipv4_addr);
    packet.set_target_hw_addr(EthernetAddress::ZERO);
    packet.set_target_proto_addr(target);

    debug!("arp: who has {}? tell {}", target, interface.ipv4_addr);
    interface.transmit(&buf)
}

/// Turns the request in `buf` into the reply and sends it. Requests for
/// other hosts are not answered and yield [`Error::ProtocolMismatch`].
pub fn reply_arp_request<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
) -> Result<()> {
    let (sender_mac, sender_ip) = {
        let packet = ArpPacket::new_checked(buf.get(ETH_LEN..len).ok_or(Error::Malformed)?)?;
        if packet.target_proto_addr() != interface.ipv4_addr {
            return Err(Error::ProtocolMismatch);
        }
        (packet.source_hw_addr(), packet.source_proto_addr())
    };

    let mut frame = EthernetFrame::new_unchecked(&mut buf[..len]);
    frame.swap_addrs(interface.ethernet_addr);

    let mut packet = ArpPacket::new_unchecked(frame.payload_mut());
    packet.set_operation(ArpOperation::Reply);
    packet.set_target_hw_addr(sender_mac);
    packet.set_target_proto_addr(sender_ip);
    packet.set_source_hw_addr(interface.ethernet_addr);
    packet.set_source_proto_addr(interface.ipv4_addr);

    debug!("arp: {} is at {}, told {}", interface.ipv4_addr, interface.ethernet_addr, sender_ip);
    // padding of the request is not echoed
    interface.transmit(&buf[..ARP_FRAME_LEN])
}

// only requests are answered; replies outside start-up are ignored
pub fn recv_arp_packet<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
) -> Result<()> {
    let payload = buf.get(ETH_LEN..len).ok_or(Error::Malformed)?;
    let operation = ArpPacket::new_checked(payload)?.operation();
    match operation {
        ArpOperation::Request => reply_arp_request(interface, buf, len),
        op => {
            trace!("arp: ignoring {:?}", op);
            Err(Error::ProtocolMismatch)
        }
    }
}

/// Asks for the gateway's MAC address once and waits up to
/// `config.arp_timeout` for the answer. Other traffic is discarded meanwhile.
pub fn resolve_gateway<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut PacketBuffer,
) -> Result<()> {
    let gateway = interface.config.gateway;
    send_arp_request(interface, gateway)?;

    let start = interface.clock.now();
    while !interface.expired(start, interface.config.arp_timeout) {
        let len = interface.dev.recv(&mut buf[..]).min(buf.len());
        if let Some(mac) = gateway_reply(&buf[..len], gateway) {
            debug!("arp: gateway {} is at {}", gateway, mac);
            interface.gateway_mac = mac;
            return Ok(());
        }
    }

    warn!("arp: no reply from gateway {}", gateway);
    Err(Error::Timeout)
}

fn gateway_reply(frame: &[u8], gateway: Ipv4Address) -> Option<EthernetAddress> {
    let frame = EthernetFrame::new_checked(frame).ok()?;
    if frame.ethertype() != EthernetType::ARP {
        return None;
    }
    let packet = ArpPacket::new_checked(frame.payload()).ok()?;
    if packet.operation() == ArpOperation::Reply && packet.source_proto_addr() == gateway {
        Some(packet.source_hw_addr())
    } else {
        None
    }
}

use log::{debug, trace, warn};

use crate::app::Application;
use crate::iface::ipv4::{finish_ip_packet, setup_basic_ip_packet, HEADERS_LEN};
use crate::iface::{Clock, Interface, PacketBuffer};
use crate::repr::dns;
use crate::repr::{Device, DnsHeader, EthernetFrame, Ipv4Address, Ipv4Packet, Ipv4Protocol, UdpPacket};
use crate::utils::checksum::PseudoHeader;
use crate::{Error, Result};

const UDP_LEN: usize = UdpPacket::<&[u8]>::HEADER_LEN;

/// Sends one A query for `host` and waits up to `config.dns_timeout` for
/// the answer. Frames arriving meanwhile are still dispatched, so ARP and
/// ping keep being answered during the wait.
pub fn dns_lookup<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut PacketBuffer,
    host: &str,
    app: &mut dyn Application,
) -> Result<Ipv4Address> {
    send_query(interface, buf, host)?;

    let start = interface.clock.now();
    while !interface.expired(start, interface.config.dns_timeout) {
        let len = match interface.get_packet(buf, Some(Ipv4Protocol::Udp), app) {
            Ok(len) => len,
            Err(_) => continue,
        };
        match parse_reply(interface, &buf[..len]) {
            Ok(Some(addr)) => {
                debug!("dns: {} is at {}", host, addr);
                interface.server_addr = addr;
                return Ok(addr);
            }
            // someone else's datagram
            Ok(None) => continue,
            Err(err) => {
                warn!("dns: lookup of {} failed: {}", host, err);
                return Err(err);
            }
        }
    }

    warn!("dns: no reply for {}", host);
    Err(Error::Timeout)
}

fn send_query<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut PacketBuffer,
    host: &str,
) -> Result<()> {
    let server = interface.config.dns_server;
    setup_basic_ip_packet(interface, buf, Ipv4Protocol::Udp, server);

    let msg_len = dns::write_query(&mut buf[HEADERS_LEN + UDP_LEN..], interface.config.dns_id, host)?;
    let udp_len = UDP_LEN + msg_len;
    {
        let mut udp = UdpPacket::new_unchecked(&mut buf[HEADERS_LEN..HEADERS_LEN + udp_len]);
        udp.set_src_port(interface.config.dns_port);
        udp.set_dst_port(dns::PORT);
        udp.set_len(udp_len as u16);
    }
    let frame_len = finish_ip_packet(buf, udp_len, PseudoHeader::Udp)?;

    debug!("dns: query for {} to {}", host, server);
    interface.transmit(&buf[..frame_len])
}

// Ok(None) when the datagram is not the answer to our query
fn parse_reply<D: Device, C: Clock>(
    interface: &Interface<D, C>,
    frame: &[u8],
) -> Result<Option<Ipv4Address>> {
    let packet = Ipv4Packet::new_checked(&frame[EthernetFrame::<&[u8]>::HEADER_LEN..])?;
    let udp = UdpPacket::new_checked(packet.payload())?;
    if udp.src_port() != dns::PORT || udp.dst_port() != interface.config.dns_port {
        trace!("dns: skipping datagram from port {}", udp.src_port());
        return Ok(None);
    }

    let header = DnsHeader::new_checked(udp.payload())?;
    if header.id() != interface.config.dns_id || !header.is_response() {
        trace!("dns: skipping message {:#06x}", header.id());
        return Ok(None);
    }

    match header.rcode() {
        0 => header.first_a_record().map(Some),
        rcode => Err(Error::DnsError(rcode)),
    }
}

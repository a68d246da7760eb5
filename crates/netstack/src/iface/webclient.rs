use log::{debug, warn};

use crate::app::Application;
use crate::iface::ipv4::{finish_ip_packet, setup_basic_ip_packet, HEADERS_LEN};
use crate::iface::tcp::{ack_tcp, write_next_segment, Segment};
use crate::iface::{Clock, Interface, PacketBuffer};
use crate::repr::{Device, EthernetFrame, Ipv4Packet, Ipv4Protocol, TcpFlags, TcpOption, TcpPacket};
use crate::socket::{ClientEvent, ClientState, SocketAddr};
use crate::utils::checksum::PseudoHeader;
use crate::{Error, Result};

// "HTTP/1.x NNN"
const MIN_REPLY_LEN: usize = 12;

pub fn web_client_send<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    query: &[u8],
) -> Result<()> {
    if !interface.dev.is_link_up() {
        return Err(Error::LinkDown);
    }
    let remote = SocketAddr::new(interface.server_addr, interface.config.remote_web_port);
    interface.client.request(remote, query)?;
    debug!(
        "webclient: {} byte query for {} from port {}",
        query.len(),
        remote,
        interface.client.port()
    );
    Ok(())
}

/// Opens the handshake: SYN with an MSS option from the client port.
pub fn send_syn<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut PacketBuffer,
) -> Result<()> {
    let remote = interface.client.remote();
    setup_basic_ip_packet(interface, buf, Ipv4Protocol::Tcp, remote.addr);

    let tcp_len = TcpPacket::<&[u8]>::HEADER_LEN + TcpOption::MSS_LEN;
    {
        let mut tcp = TcpPacket::new_unchecked(&mut buf[HEADERS_LEN..HEADERS_LEN + tcp_len]);
        tcp.set_src_port(interface.client.port());
        tcp.set_dst_port(remote.port);
        tcp.set_seq_number(interface.config.client_isn);
        tcp.set_ack_number(0);
        tcp.set_header_len(tcp_len);
        tcp.set_flags(TcpFlags::SYN);
        tcp.set_window_len(interface.config.client_window);
        tcp.set_urgent_at(0);
        tcp.write_mss_option(interface.config.client_mss);
    }
    let frame_len = finish_ip_packet(buf, tcp_len, PseudoHeader::Tcp)?;

    // a failed SYN stays requested and is retried on the next idle step
    interface.transmit(&buf[..frame_len])?;
    interface.client.advance(ClientEvent::SynTransmitted)?;
    debug!("webclient: SYN to {}", remote);
    Ok(())
}

/// Handshake finished: the ACK just sent in `buf` is followed by the queued
/// request, pushed in one segment.
pub fn browse_url<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
) -> Result<()> {
    let ident = interface.next_ident();
    let frame_len = write_next_segment(
        buf,
        ident,
        TcpFlags::PSH | TcpFlags::ACK,
        interface.client.query(),
    )?;
    debug!("webclient: sent {} byte query", interface.client.query().len());
    interface.transmit(&buf[..frame_len])
}

pub fn recv<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
    segment: Segment,
    app: &mut dyn Application,
) -> Result<()> {
    let flags = segment.flags;

    if flags.contains(TcpFlags::RST) {
        interface.client.advance(ClientEvent::ResetReceived)?;
        warn!("webclient: connection reset by {}", interface.client.remote());
        return Ok(());
    }

    if flags.contains(TcpFlags::SYN | TcpFlags::ACK) {
        interface.client.advance(ClientEvent::SynAckReceived)?;
        ack_tcp(interface, buf, len, TcpFlags::empty())?;
        return browse_url(interface, buf);
    }

    if interface.client.state() == ClientState::QuerySent && segment.payload_len >= MIN_REPLY_LEN {
        interface.client.advance(ClientEvent::DataReceived)?;
        let packet = Ipv4Packet::new_checked(&buf[EthernetFrame::<&[u8]>::HEADER_LEN..len])?;
        let accepted = app.process_reply(TcpPacket::new_checked(packet.payload())?.payload());
        debug!("webclient: reply {}", if accepted { "accepted" } else { "not accepted" });
    }

    if flags.contains(TcpFlags::FIN) {
        // a FIN seen again after closing means our FIN-ACK got lost
        if interface.client.state() != ClientState::Idle {
            interface.client.advance(ClientEvent::FinReceived)?;
            debug!("webclient: closed by {}", interface.client.remote());
        }
        return ack_tcp(interface, buf, len, TcpFlags::FIN);
    }

    if segment.payload_len > 0 && interface.client.state() != ClientState::Idle {
        return ack_tcp(interface, buf, len, TcpFlags::empty());
    }
    Err(Error::ProtocolMismatch)
}

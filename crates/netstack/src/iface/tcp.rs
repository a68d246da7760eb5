use log::{debug, trace};

use crate::app::Application;
use crate::iface::ipv4::{set_station_ip_fields, HEADERS_LEN};
use crate::iface::{webclient, webserver, Clock, Interface};
use crate::repr::{Device, EthernetFrame, Ipv4Packet, TcpFlags, TcpOption, TcpPacket};
use crate::utils::checksum::{add32, PseudoHeader};
use crate::{Error, Result};

const ETH_LEN: usize = EthernetFrame::<&[u8]>::HEADER_LEN;
const TCP_LEN: usize = TcpPacket::<&[u8]>::HEADER_LEN;

/// What the handlers need to know about a received segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub flags: TcpFlags,
    pub src_port: u16,
    pub dst_port: u16,
    // bytes after the TCP header, options excluded
    pub payload_len: usize,
}

impl Segment {
    pub fn parse(frame: &[u8]) -> Result<Segment> {
        let packet = Ipv4Packet::new_checked(frame.get(ETH_LEN..).ok_or(Error::Malformed)?)?;
        let tcp = TcpPacket::new_checked(packet.payload())?;
        Ok(Segment {
            flags: tcp.flags(),
            src_port: tcp.src_port(),
            dst_port: tcp.dst_port(),
            payload_len: tcp.payload().len(),
        })
    }
}

// route by port: the webserver, or the one webclient connection
pub fn recv_tcp_packet<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
    app: &mut dyn Application,
) -> Result<()> {
    let segment = Segment::parse(&buf[..len])?;
    let src_addr = Ipv4Packet::new_unchecked(&buf[ETH_LEN..len]).src_addr();
    trace!(
        "tcp: {}:{} -> {} {:?}, {} bytes",
        src_addr,
        segment.src_port,
        segment.dst_port,
        segment.flags,
        segment.payload_len
    );

    let remote = interface.client.remote();
    if segment.dst_port == interface.config.web_port {
        webserver::recv(interface, buf, len, segment, app)
    } else if segment.dst_port == interface.client.port()
        && src_addr == remote.addr
        && segment.src_port == remote.port
    {
        webclient::recv(interface, buf, len, segment, app)
    } else {
        Err(Error::ProtocolMismatch)
    }
}

/// Where [`respond`] expects the data of a reply without SYN.
pub const REPLY_DATA_AT: usize = HEADERS_LEN + TCP_LEN;

/// Answers the segment in `buf` with a bare acknowledgement. `reply` may
/// add SYN (with an MSS option), FIN, RST or PSH.
pub fn ack_tcp<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
    reply: TcpFlags,
) -> Result<()> {
    respond(interface, buf, len, reply, 0)
}

/// Rewrites the segment in `buf` into the reply to it and sends it. The
/// reply carries the `data_len` bytes the caller has already placed at
/// [`REPLY_DATA_AT`]; SYN replies carry none.
///
/// Addresses and ports are swapped and the received sequence number,
/// advanced past what it carried, becomes the acknowledgement number. SYN
/// and FIN each count as one byte on top of the payload.
pub fn respond<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
    reply: TcpFlags,
    data_len: usize,
) -> Result<()> {
    let received = Segment::parse(&buf[..len])?;
    // no room is made for IP options
    let ip_header_len = Ipv4Packet::new_unchecked(&buf[ETH_LEN..len]).header_len();
    if ip_header_len != Ipv4Packet::<&[u8]>::HEADER_LEN {
        return Err(Error::Unsupported);
    }

    let option_len = if reply.contains(TcpFlags::SYN) {
        if data_len > 0 {
            return Err(Error::Unsupported);
        }
        TcpOption::MSS_LEN
    } else {
        0
    };
    let segment_len = TCP_LEN + option_len + data_len;
    let frame_len = HEADERS_LEN + segment_len;
    if frame_len > buf.len() {
        return Err(Error::Exhausted);
    }

    let mut advance = received.payload_len as u16;
    if received.flags.intersects(TcpFlags::SYN | TcpFlags::FIN) {
        advance += 1;
    }
    let window = if received.dst_port == interface.config.web_port {
        interface.config.server_window
    } else {
        interface.config.client_window
    };
    let ident = interface.next_ident();

    let mut frame = EthernetFrame::new_unchecked(&mut buf[..frame_len]);
    frame.swap_addrs(interface.ethernet_addr);

    let mut packet = Ipv4Packet::new_unchecked(frame.payload_mut());
    packet.swap_addrs(interface.ipv4_addr);
    packet.set_total_len((Ipv4Packet::<&[u8]>::HEADER_LEN + segment_len) as u16);
    set_station_ip_fields(interface, &mut packet, ident);
    {
        let mut tcp = TcpPacket::new_unchecked(packet.payload_mut());
        tcp.swap_ports();
        tcp.swap_seq_ack();
        let mut ack = tcp.ack_bytes();
        add32(&mut ack, advance);
        tcp.set_ack_bytes(ack);

        tcp.set_header_len(TCP_LEN + option_len);
        if option_len > 0 {
            tcp.write_mss_option(interface.config.server_mss);
        }
        tcp.set_flags(
            TcpFlags::ACK
                | (reply & (TcpFlags::SYN | TcpFlags::FIN | TcpFlags::RST | TcpFlags::PSH)),
        );
        tcp.set_window_len(window);
        tcp.set_urgent_at(0);
    }
    packet.fill_transport_checksum(PseudoHeader::Tcp, TcpPacket::<&[u8]>::CHECKSUM_OFFSET);
    packet.fill_checksum();

    debug!("tcp: sent {:?} with {} bytes", TcpFlags::ACK | reply, data_len);
    interface.transmit(&buf[..frame_len])
}

/// Turns the outbound segment in `buf`, as left by [`respond`], into the
/// next one: same addresses and numbers, new `flags` and `data`. Returns the
/// frame length.
pub fn write_next_segment(buf: &mut [u8], ident: u16, flags: TcpFlags, data: &[u8]) -> Result<usize> {
    let segment_len = TCP_LEN + data.len();
    let frame_len = HEADERS_LEN + segment_len;
    if frame_len > buf.len() {
        return Err(Error::Exhausted);
    }

    let mut packet = Ipv4Packet::new_unchecked(&mut buf[ETH_LEN..frame_len]);
    packet.set_ident(ident);
    packet.set_total_len((Ipv4Packet::<&[u8]>::HEADER_LEN + segment_len) as u16);
    {
        let mut tcp = TcpPacket::new_unchecked(packet.payload_mut());
        tcp.set_header_len(TCP_LEN);
        tcp.set_flags(flags);
        tcp.payload_mut().copy_from_slice(data);
    }
    packet.fill_transport_checksum(PseudoHeader::Tcp, TcpPacket::<&[u8]>::CHECKSUM_OFFSET);
    packet.fill_checksum();

    Ok(frame_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_payload_excludes_options_and_padding() {
        // ip total length 44: 20 ip + 24 tcp, frame padded to 60
        let mut frame = [0u8; 60];
        let mut packet = Ipv4Packet::new_unchecked(&mut frame[ETH_LEN..]);
        packet.set_version_and_header_len(4, 20);
        packet.set_total_len(44);
        let mut tcp = TcpPacket::new_unchecked(packet.payload_mut());
        tcp.set_header_len(24);
        tcp.set_flags(TcpFlags::SYN);
        tcp.set_dst_port(80);

        let segment = Segment::parse(&frame).unwrap();
        assert_eq!(segment.payload_len, 0);
        assert_eq!(segment.flags, TcpFlags::SYN);
        assert_eq!(segment.dst_port, 80);
    }

    #[test]
    fn next_segment_keeps_numbers() {
        let mut frame = [0u8; 80];
        {
            let mut packet = Ipv4Packet::new_unchecked(&mut frame[ETH_LEN..]);
            packet.set_version_and_header_len(4, 20);
            packet.set_total_len(40);
            let mut tcp = TcpPacket::new_unchecked(packet.payload_mut());
            tcp.set_seq_number(7);
            tcp.set_ack_number(9);
        }
        let len = write_next_segment(&mut frame, 3, TcpFlags::PSH | TcpFlags::ACK, b"GET /").unwrap();
        assert_eq!(len, 59);

        let packet = Ipv4Packet::new_checked(&frame[ETH_LEN..len]).unwrap();
        assert_eq!(packet.ident(), 3);
        let tcp = TcpPacket::new_checked(packet.payload()).unwrap();
        assert_eq!(tcp.seq_number(), 7);
        assert_eq!(tcp.ack_number(), 9);
        assert_eq!(tcp.flags(), TcpFlags::PSH | TcpFlags::ACK);
        assert_eq!(tcp.payload(), b"GET /");

        assert_eq!(
            write_next_segment(&mut frame, 3, TcpFlags::ACK, &[0; 30]),
            Err(Error::Exhausted)
        );
    }
}

use log::debug;

use crate::app::Application;
use crate::iface::ipv4::HEADERS_LEN;
use crate::iface::tcp::{ack_tcp, respond, Segment, REPLY_DATA_AT};
use crate::iface::{Clock, Interface};
use crate::repr::{Device, EthernetFrame, Ipv4Packet, TcpFlags, TcpPacket};
use crate::utils::slice::Slice;
use crate::{Error, Result};

const ETH_LEN: usize = EthernetFrame::<&[u8]>::HEADER_LEN;

/// Segment to the webserver port. There is no per-connection state: a SYN
/// is answered with a SYN-ACK, a request with the whole response plus FIN,
/// and the peer's FIN with an ACK.
pub fn recv<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
    segment: Segment,
    app: &mut dyn Application,
) -> Result<()> {
    let flags = segment.flags;
    if flags.contains(TcpFlags::SYN) {
        debug!("webserver: SYN from port {}", segment.src_port);
        ack_tcp(interface, buf, len, TcpFlags::SYN)
    } else if flags.contains(TcpFlags::PSH | TcpFlags::ACK) {
        process_request(interface, buf, len, app)
    } else if flags.contains(TcpFlags::FIN) {
        ack_tcp(interface, buf, len, TcpFlags::empty())
    } else {
        // bare ACKs need no answer
        Err(Error::ProtocolMismatch)
    }
}

// The response is written into the free tail of `buf`, behind the request,
// and moved to where the reply carries it once the request is done with.
fn process_request<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut [u8],
    len: usize,
    app: &mut dyn Application,
) -> Result<()> {
    let (request_at, request_len) = {
        let packet = Ipv4Packet::new_checked(&buf[ETH_LEN..len])?;
        if packet.header_len() != Ipv4Packet::<&[u8]>::HEADER_LEN {
            return Err(Error::Unsupported);
        }
        let tcp = TcpPacket::new_checked(packet.payload())?;
        (HEADERS_LEN + tcp.header_len(), tcp.payload().len())
    };

    let page_at = request_at + request_len;
    let page_len = {
        let (received, scratch) = buf.split_at_mut(page_at);
        let mut response = Slice::from(scratch);
        app.serve_http(&received[request_at..], &mut response)?;
        response.len()
    };

    debug!("webserver: {} byte response", page_len);
    buf.copy_within(page_at..page_at + page_len, REPLY_DATA_AT);
    respond(interface, buf, len, TcpFlags::PSH | TcpFlags::FIN, page_len)
}

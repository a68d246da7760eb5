use log::trace;

use crate::app::Application;
use crate::iface::{arp, ipv4, Clock, Interface, PacketBuffer};
use crate::repr::{Device, EthernetFrame, EthernetType, Ipv4Protocol};
use crate::{Error, Result};

// recv ethernet frame from the device: answered in place or handed up the stack
pub fn get_packet<D: Device, C: Clock>(
    interface: &mut Interface<D, C>,
    buf: &mut PacketBuffer,
    wanted: Option<Ipv4Protocol>,
    app: &mut dyn Application,
) -> Result<usize> {
    let len = interface.dev.recv(&mut buf[..]).min(buf.len());
    if len == 0 {
        return Err(Error::NoData);
    }

    let ethertype = EthernetFrame::new_checked(&buf[..len])?.ethertype();
    trace!("[!] received ethernet frame, {} bytes, type {:#06x}", len, ethertype);

    match ethertype {
        EthernetType::ARP => {
            arp::recv_arp_packet(interface, buf, len)?;
            // housekeeping never satisfies a wait
            Err(Error::ProtocolMismatch)
        }
        EthernetType::IPV4 => ipv4::recv_ip_packet(interface, buf, len, wanted, app),
        _ => Err(Error::ProtocolMismatch),
    }
}

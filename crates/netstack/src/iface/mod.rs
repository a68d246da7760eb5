pub mod arp;
pub mod dns;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod tcp;
pub mod udp;
pub mod webclient;
pub mod webserver;

use core::ops::{Deref, DerefMut};
use core::time::Duration;

use log::{trace, warn};

use crate::app::Application;
use crate::config::{Config, MAX_PACKET_LEN};
use crate::repr::{Device, EthernetAddress, Ipv4Address, Ipv4Protocol};
use crate::socket::{ClientState, SocketAddr, TcpClient};
use crate::{Error, Result};

/// Monotonic time source for the bounded ARP and DNS waits.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// The one frame buffer a poll cycle works in. Replies are built in place
/// over the received frame.
#[derive(Clone, Debug)]
pub struct PacketBuffer(pub [u8; MAX_PACKET_LEN]);

impl Default for PacketBuffer {
    fn default() -> Self {
        PacketBuffer([0; MAX_PACKET_LEN])
    }
}

impl Deref for PacketBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for PacketBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Session state of the stack: station identity, the gateway it talks
/// through and the single webclient exchange.
pub struct Interface<D: Device, C: Clock> {
    pub dev: D,
    pub clock: C,
    pub config: Config,
    pub ethernet_addr: EthernetAddress,
    pub ipv4_addr: Ipv4Address,
    // every outbound frame goes here
    pub gateway_mac: EthernetAddress,
    // last DNS answer, target of the webclient
    pub server_addr: Ipv4Address,
    pub client: TcpClient,
    ident: u16,
}

impl<D: Device, C: Clock> Interface<D, C> {
    pub fn new(dev: D, clock: C, config: Config) -> Self {
        let client = TcpClient::new(config.client_port_base);
        Interface {
            dev,
            clock,
            config,
            ethernet_addr: EthernetAddress::ZERO,
            ipv4_addr: Ipv4Address::UNSPECIFIED,
            gateway_mac: EthernetAddress::ZERO,
            server_addr: Ipv4Address::UNSPECIFIED,
            client,
            ident: 0,
        }
    }

    /// Takes on the given identity, brings the controller up and resolves
    /// the gateway's MAC address. Must succeed before anything is sent.
    pub fn start(
        &mut self,
        buf: &mut PacketBuffer,
        mac: EthernetAddress,
        ip: Ipv4Address,
    ) -> Result<()> {
        self.ethernet_addr = mac;
        self.ipv4_addr = ip;
        self.dev.init(mac);

        if !self.dev.is_link_up() {
            warn!("start: link is down");
            return Err(Error::LinkDown);
        }
        arp::resolve_gateway(self, buf)
    }

    /// One step of the main loop: handle at most one inbound frame, then
    /// send the webclient SYN if one was requested.
    ///
    /// Malformed or uninteresting input is dropped; only link loss and
    /// transmit failures are reported.
    pub fn idle(&mut self, buf: &mut PacketBuffer, app: &mut dyn Application) -> Result<()> {
        if !self.dev.is_link_up() {
            return Err(Error::LinkDown);
        }

        let polled = match self.get_packet(buf, None, app) {
            Ok(_) | Err(Error::NoData) | Err(Error::ProtocolMismatch) => Ok(()),
            Err(Error::TransmitFailed) => Err(Error::TransmitFailed),
            Err(err) => {
                trace!("idle: dropped frame: {}", err);
                Ok(())
            }
        };

        if self.client.state() == ClientState::SynRequested {
            webclient::send_syn(self, buf)?;
        }
        polled
    }

    /// Reads and handles one frame. Returns its length if it is an IPv4
    /// packet of the `wanted` protocol.
    pub fn get_packet(
        &mut self,
        buf: &mut PacketBuffer,
        wanted: Option<Ipv4Protocol>,
        app: &mut dyn Application,
    ) -> Result<usize> {
        ethernet::get_packet(self, buf, wanted, app)
    }

    /// Resolves `host` to an IPv4 address through the configured DNS
    /// server and remembers it as the webclient target.
    pub fn dns_lookup(
        &mut self,
        buf: &mut PacketBuffer,
        host: &str,
        app: &mut dyn Application,
    ) -> Result<Ipv4Address> {
        dns::dns_lookup(self, buf, host, app)
    }

    pub fn udp_send(
        &mut self,
        buf: &mut PacketBuffer,
        target: SocketAddr,
        payload: &[u8],
    ) -> Result<()> {
        udp::udp_send(self, buf, target, payload)
    }

    pub fn send_ping(&mut self, buf: &mut PacketBuffer, target: Ipv4Address) -> Result<()> {
        icmp::send_ping(self, buf, target)
    }

    /// Queues `query` for the server found by the last DNS lookup. The SYN
    /// goes out on the next [`idle`](Self::idle).
    pub fn web_client_send(&mut self, query: &[u8]) -> Result<()> {
        webclient::web_client_send(self, query)
    }

    pub fn is_link_up(&mut self) -> bool {
        self.dev.is_link_up()
    }

    pub(crate) fn next_ident(&mut self) -> u16 {
        self.ident = self.ident.wrapping_add(1);
        self.ident
    }

    pub(crate) fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        self.dev.send(frame).map_err(|err| {
            warn!("transmit of {} bytes failed: {}", frame.len(), err);
            err
        })
    }

    // has a wait begun at `start` run out
    pub(crate) fn expired(&self, start: Duration, timeout: Duration) -> bool {
        self.clock.now().saturating_sub(start) >= timeout
    }
}

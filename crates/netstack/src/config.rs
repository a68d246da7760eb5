use core::time::Duration;

use crate::repr::Ipv4Address;

/// Size of the single frame buffer every poll cycle works in, Ethernet
/// header included.
pub const MAX_PACKET_LEN: usize = 600;

/// Addresses, ports and protocol constants of one stack instance.
///
/// The station's own MAC and IP address are not part of this; they are
/// handed to [`Interface::start`](crate::Interface::start).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Default gateway. Every outbound frame is addressed to its MAC.
    pub gateway: Ipv4Address,
    pub dns_server: Ipv4Address,

    /// Port the webserver answers on.
    pub web_port: u16,
    /// Port the webclient connects to on the remote server.
    pub remote_web_port: u16,
    /// Ephemeral port base; each webclient request takes the next port.
    pub client_port_base: u16,
    /// Source port for [`Interface::udp_send`](crate::Interface::udp_send).
    pub udp_port: u16,
    pub dns_port: u16,
    pub dns_id: u16,

    /// MSS announced in the webclient SYN.
    pub client_mss: u16,
    /// MSS announced in SYN-ACKs sent by the webserver.
    pub server_mss: u16,
    pub client_window: u16,
    /// Window advertised in every segment built from a received one.
    pub server_window: u16,
    pub client_isn: u32,

    pub ttl: u8,
    pub dont_fragment: bool,

    pub arp_timeout: Duration,
    pub dns_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gateway: Ipv4Address::new([192, 168, 1, 1]),
            dns_server: Ipv4Address::new([192, 168, 1, 1]),
            web_port: 80,
            remote_web_port: 80,
            client_port_base: 19979,
            udp_port: 1200,
            dns_port: 0xABCD,
            dns_id: 0xBAAB,
            client_mss: 512,
            server_mss: 300,
            client_window: 800,
            server_window: 500,
            client_isn: 0x0100_0000,
            ttl: 128,
            dont_fragment: true,
            arp_timeout: Duration::from_secs(2),
            dns_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_mss_fits_the_packet_buffer() {
        let config = Config::default();
        // ethernet + ip + tcp headers
        assert!((config.server_mss as usize) + 54 <= MAX_PACKET_LEN);
        assert!((config.client_mss as usize) + 54 <= MAX_PACKET_LEN);
    }
}

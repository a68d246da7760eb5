use tinyvec::ArrayVec;

use crate::socket::SocketAddr;
use crate::{Error, Result};

/// Largest request the webclient can queue. It goes out as a single segment.
pub const QUERY_CAPACITY: usize = 256;

/// Progress of the one outbound exchange the stack can hold.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum ClientState {
    #[default]
    Idle,
    // queued, SYN goes out on the next idle step
    SynRequested,
    SynSent,
    // handshake done, request transmitted, waiting for the reply
    QuerySent,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ClientEvent {
    Requested,
    SynTransmitted,
    SynAckReceived,
    DataReceived,
    FinReceived,
    ResetReceived,
}

impl ClientState {
    /// The state after `event`, or `None` when the event is not legal here.
    pub fn next(self, event: ClientEvent) -> Option<ClientState> {
        use ClientEvent::*;
        use ClientState::*;

        match (self, event) {
            // a request may be replaced until its SYN is on the wire
            (Idle | SynRequested, Requested) => Some(SynRequested),
            (SynRequested, SynTransmitted) => Some(SynSent),
            (SynSent, SynAckReceived) => Some(QuerySent),
            (QuerySent, DataReceived) => Some(QuerySent),
            (SynSent | QuerySent, FinReceived | ResetReceived) => Some(Idle),
            _ => None,
        }
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, ClientState::SynSent | ClientState::QuerySent)
    }
}

/// The single client-side connection: state, local port, peer and the
/// request waiting for the handshake to finish.
#[derive(Debug)]
pub struct TcpClient {
    state: ClientState,
    port_base: u16,
    port: u16,
    remote: SocketAddr,
    query: ArrayVec<[u8; QUERY_CAPACITY]>,
}

impl TcpClient {
    pub fn new(port_base: u16) -> Self {
        TcpClient {
            state: ClientState::Idle,
            port_base,
            port: port_base,
            remote: SocketAddr::default(),
            query: ArrayVec::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn query(&self) -> &[u8] {
        &self.query
    }

    // illegal events leave the state untouched
    pub fn advance(&mut self, event: ClientEvent) -> Result<ClientState> {
        let next = self.state.next(event).ok_or(Error::ProtocolMismatch)?;
        self.state = next;
        Ok(next)
    }

    /// Queues `query` for `remote` on a fresh local port.
    pub fn request(&mut self, remote: SocketAddr, query: &[u8]) -> Result<()> {
        if self.state.is_in_flight() {
            return Err(Error::Busy);
        }
        if query.len() > self.query.capacity() {
            return Err(Error::Exhausted);
        }
        self.advance(ClientEvent::Requested)?;

        self.port = self.port.checked_add(1).unwrap_or(self.port_base);
        self.remote = remote;
        self.query.clear();
        self.query.extend_from_slice(query);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::Ipv4Address;

    #[test]
    fn handshake_and_reply_path() {
        let mut state = ClientState::Idle;
        for (event, expected) in [
            (ClientEvent::Requested, ClientState::SynRequested),
            (ClientEvent::SynTransmitted, ClientState::SynSent),
            (ClientEvent::SynAckReceived, ClientState::QuerySent),
            (ClientEvent::DataReceived, ClientState::QuerySent),
            (ClientEvent::FinReceived, ClientState::Idle),
        ] {
            state = state.next(event).unwrap();
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn illegal_transitions() {
        assert_eq!(ClientState::Idle.next(ClientEvent::SynAckReceived), None);
        assert_eq!(ClientState::Idle.next(ClientEvent::FinReceived), None);
        assert_eq!(ClientState::SynSent.next(ClientEvent::Requested), None);
        assert_eq!(ClientState::SynSent.next(ClientEvent::DataReceived), None);
        assert_eq!(ClientState::QuerySent.next(ClientEvent::SynAckReceived), None);
        assert_eq!(
            ClientState::SynSent.next(ClientEvent::ResetReceived),
            Some(ClientState::Idle)
        );
    }

    #[test]
    fn request_takes_next_port_and_refuses_while_in_flight() {
        let remote = SocketAddr::new(Ipv4Address::new([216, 52, 233, 10]), 80);
        let mut client = TcpClient::new(19979);
        client.request(remote, b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(client.port(), 19980);
        assert_eq!(client.state(), ClientState::SynRequested);
        assert_eq!(client.query(), b"GET / HTTP/1.1\r\n\r\n");

        client.advance(ClientEvent::SynTransmitted).unwrap();
        assert_eq!(client.request(remote, b"x"), Err(Error::Busy));
        assert_eq!(client.port(), 19980);

        assert_eq!(
            client.advance(ClientEvent::DataReceived),
            Err(Error::ProtocolMismatch)
        );
        assert_eq!(client.state(), ClientState::SynSent);
    }

    #[test]
    fn oversize_query_is_rejected() {
        let remote = SocketAddr::new(Ipv4Address::new([10, 0, 0, 1]), 80);
        let mut client = TcpClient::new(19979);
        let big = [b'a'; QUERY_CAPACITY + 1];
        assert_eq!(client.request(remote, &big), Err(Error::Exhausted));
        assert_eq!(client.state(), ClientState::Idle);
        assert_eq!(client.port(), 19979);
    }
}

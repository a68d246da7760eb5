//! Hooks through which the embedding firmware reacts to traffic the stack
//! does not handle by itself.

use core::fmt::Write;

use log::debug;

use crate::repr::{HttpMethod, HttpRequest, HttpResponse};
use crate::socket::SocketAddr;
use crate::utils::slice::Slice;
use crate::{Error, Result};

pub const UDP_COMMAND: &[u8] = b"Invoke.";
pub const UDP_ACCEPTED: &[u8] = b"Hello World";
pub const UDP_DENIED: &[u8] = b"Access Denied.";

const INDEX_PAGE: &str = "<html><head><title>netstack</title></head>\
<body><h1>It works!</h1><p>Served from a 600 byte packet buffer.</p></body></html>";

/// Every method has a default, so an application overrides only what it
/// cares about.
pub trait Application {
    /// A datagram arrived that no blocking call was waiting for. Write the
    /// reply payload into `reply` and return its length, or `None` to stay
    /// silent.
    fn process_udp(&mut self, from: SocketAddr, payload: &[u8], reply: &mut [u8]) -> Option<usize> {
        // C-string senders include the terminator
        let command = trim_nul(payload);
        let answer = if command == UDP_COMMAND {
            UDP_ACCEPTED
        } else {
            UDP_DENIED
        };
        debug!("udp: {} from {}", core::str::from_utf8(command).unwrap_or("<binary>"), from);

        let out = reply.get_mut(..answer.len())?;
        out.copy_from_slice(answer);
        Some(answer.len())
    }

    /// Builds the complete response to a request that arrived on the
    /// webserver port. The response goes out as one segment that also
    /// closes the connection.
    fn serve_http(&mut self, request: &[u8], response: &mut Slice<'_>) -> Result<()> {
        let (status, body) = match HttpRequest::parse(request) {
            Ok(request) => {
                debug!(
                    "webserver: {} {} for {}",
                    request.method.as_str(),
                    request.path,
                    request.header("Host").unwrap_or("<no host>")
                );
                match (request.method, request.path) {
                    (HttpMethod::Get, "/" | "/index.html") => ("200 OK", INDEX_PAGE),
                    (HttpMethod::Get, _) => {
                        ("404 Not Found", "<html><body>404 Not Found</body></html>")
                    }
                    _ => ("405 Method Not Allowed", ""),
                }
            }
            Err(_) => ("400 Bad Request", ""),
        };

        write!(
            response,
            "HTTP/1.0 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .map_err(|_| Error::Exhausted)
    }

    /// Data arrived for the outstanding webclient request. Returns whether
    /// the reply was accepted.
    fn process_reply(&mut self, reply: &[u8]) -> bool {
        match HttpResponse::parse(reply) {
            Ok(response) => {
                debug!(
                    "webclient: {} {}, {} of {} body bytes",
                    response.status,
                    response.reason,
                    response.body.len(),
                    response.header("Content-Length").unwrap_or("?")
                );
                response.status == 200
            }
            // continuation segments of a larger reply
            Err(_) => false,
        }
    }
}

/// Answers with the built-in behaviour only.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultApplication;

impl Application for DefaultApplication {}

fn trim_nul(payload: &[u8]) -> &[u8] {
    let end = payload
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    &payload[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::Ipv4Address;

    fn peer() -> SocketAddr {
        SocketAddr::new(Ipv4Address::new([192, 168, 1, 10]), 4000)
    }

    #[test]
    fn udp_command_policy() {
        let mut app = DefaultApplication;
        let mut reply = [0u8; 32];

        let len = app.process_udp(peer(), b"Invoke.\0", &mut reply).unwrap();
        assert_eq!(&reply[..len], UDP_ACCEPTED);

        let len = app.process_udp(peer(), b"Invoke", &mut reply).unwrap();
        assert_eq!(&reply[..len], UDP_DENIED);

        assert_eq!(app.process_udp(peer(), b"Invoke.", &mut reply[..4]), None);
    }

    #[test]
    fn serves_index_and_404() {
        let mut app = DefaultApplication;
        let mut storage = [0u8; 512];

        let mut page = Slice::from(&mut storage[..]);
        app.serve_http(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n", &mut page).unwrap();
        assert!(page.starts_with(b"HTTP/1.0 200 OK\r\n"));
        assert!(page.ends_with(INDEX_PAGE.as_bytes()));

        let mut page = Slice::from(&mut storage[..]);
        app.serve_http(b"GET /missing HTTP/1.1\r\n\r\n", &mut page).unwrap();
        assert!(page.starts_with(b"HTTP/1.0 404 Not Found\r\n"));

        let mut page = Slice::from(&mut storage[..]);
        app.serve_http(b"garbage", &mut page).unwrap();
        assert!(page.starts_with(b"HTTP/1.0 400 Bad Request\r\n"));
    }

    #[test]
    fn page_larger_than_buffer_is_exhausted() {
        let mut app = DefaultApplication;
        let mut storage = [0u8; 64];
        let mut page = Slice::from(&mut storage[..]);
        assert_eq!(
            app.serve_http(b"GET / HTTP/1.1\r\n\r\n", &mut page),
            Err(Error::Exhausted)
        );
    }

    #[test]
    fn reply_accepted_on_200_only() {
        let mut app = DefaultApplication;
        assert!(app.process_reply(b"HTTP/1.1 200 OK\r\n\r\n2012-07-10T13:39:36.891523Z,32"));
        assert!(!app.process_reply(b"HTTP/1.1 401 Unauthorized\r\n\r\n"));
        assert!(!app.process_reply(b"32\r\n"));
    }
}

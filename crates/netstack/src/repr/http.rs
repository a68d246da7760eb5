use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl Method {
    fn from_bytes(bytes: &[u8]) -> Result<Method> {
        match bytes {
            b"GET" => Ok(Method::Get),
            b"POST" => Ok(Method::Post),
            b"PUT" => Ok(Method::Put),
            b"DELETE" => Ok(Method::Delete),
            b"HEAD" => Ok(Method::Head),
            b"OPTIONS" => Ok(Method::Options),
            b"PATCH" => Ok(Method::Patch),
            _ => Err(Error::Malformed),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }
}

/// Request head as it arrived in a single segment. Everything borrows from
/// the receive buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request<'a> {
    pub method: Method,
    pub path: &'a str,
    pub version: &'a str,
    headers: &'a [u8],
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Request<'a>> {
        let (start_line, headers, body) = split_message(buffer)?;

        let mut parts = start_line
            .split(|b| b.is_ascii_whitespace())
            .filter(|part| !part.is_empty());
        let method = Method::from_bytes(parts.next().ok_or(Error::Malformed)?)?;
        let path = as_str(parts.next().ok_or(Error::Malformed)?)?;
        let version = as_str(parts.next().ok_or(Error::Malformed)?)?;
        if parts.next().is_some() {
            return Err(Error::Malformed);
        }

        Ok(Request {
            method,
            path,
            version,
            headers,
            body,
        })
    }

    fn headers(&self) -> Headers<'a> {
        Headers {
            rest: self.headers,
        }
    }

    pub fn header(&self, name: &str) -> Option<&'a str> {
        find_header(self.headers(), name)
    }
}

/// Status line, headers and whatever body arrived with them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response<'a> {
    pub version: &'a str,
    pub status: u16,
    pub reason: &'a str,
    headers: &'a [u8],
    pub body: &'a [u8],
}

impl<'a> Response<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Response<'a>> {
        let (start_line, headers, body) = split_message(buffer)?;

        // reason phrase may contain spaces
        let mut parts = start_line.splitn(3, |b| *b == b' ');
        let version = as_str(parts.next().ok_or(Error::Malformed)?)?;
        if !version.starts_with("HTTP/") {
            return Err(Error::Malformed);
        }
        let status = as_str(parts.next().ok_or(Error::Malformed)?)?;
        let status = status.parse::<u16>().map_err(|_| Error::Malformed)?;
        let reason = as_str(parts.next().unwrap_or(b""))?;

        Ok(Response {
            version,
            status,
            reason,
            headers,
            body,
        })
    }

    fn headers(&self) -> Headers<'a> {
        Headers {
            rest: self.headers,
        }
    }

    pub fn header(&self, name: &str) -> Option<&'a str> {
        find_header(self.headers(), name)
    }
}

// `(name, value)` pairs of a header block, values trimmed
#[derive(Clone, Debug)]
struct Headers<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Headers<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.rest.is_empty() {
            let (line, rest) = match find_crlf(self.rest, 0) {
                Some(end) => (&self.rest[..end], &self.rest[end + 2..]),
                None => (self.rest, &self.rest[self.rest.len()..]),
            };
            self.rest = rest;

            // lines without a colon are skipped
            let Some(colon) = line.iter().position(|&b| b == b':') else {
                continue;
            };
            let (Ok(name), Ok(value)) = (as_str(&line[..colon]), as_str(&line[colon + 1..])) else {
                continue;
            };
            return Some((name.trim(), value.trim()));
        }
        None
    }
}

fn find_header<'a>(mut headers: Headers<'a>, name: &str) -> Option<&'a str> {
    headers
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

// start line, header block, body. A head cut off before the blank line
// yields an empty body rather than an error.
fn split_message(buffer: &[u8]) -> Result<(&[u8], &[u8], &[u8])> {
    let line_end = find_crlf(buffer, 0).ok_or(Error::Malformed)?;
    let start_line = &buffer[..line_end];
    let rest = &buffer[line_end + 2..];

    if rest.starts_with(b"\r\n") {
        return Ok((start_line, &rest[..0], &rest[2..]));
    }
    match rest.windows(4).position(|window| window == b"\r\n\r\n") {
        Some(end) => Ok((start_line, &rest[..end], &rest[end + 4..])),
        None => Ok((start_line, rest, &rest[rest.len()..])),
    }
}

fn find_crlf(buffer: &[u8], start: usize) -> Option<usize> {
    buffer
        .get(start..)?
        .windows(2)
        .position(|window| window == b"\r\n")
        .map(|pos| start + pos)
}

fn as_str(bytes: &[u8]) -> Result<&str> {
    core::str::from_utf8(bytes).map_err(|_| Error::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_line_and_headers() {
        let raw = b"GET /index.html HTTP/1.1\r\nHost: 192.168.1.153\r\nAccept:  */* \r\n\r\n";
        let request = Request::parse(raw).unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "/index.html");
        assert_eq!(request.version, "HTTP/1.1");
        assert_eq!(request.header("host"), Some("192.168.1.153"));
        assert_eq!(request.header("Accept"), Some("*/*"));
        assert_eq!(request.header("Cookie"), None);
        assert_eq!(request.headers().count(), 2);
        assert!(request.body.is_empty());
    }

    #[test]
    fn rejects_bad_request_lines() {
        assert_eq!(Request::parse(b"GET /\r\n\r\n"), Err(Error::Malformed));
        assert_eq!(Request::parse(b"FETCH / HTTP/1.1\r\n\r\n"), Err(Error::Malformed));
        assert_eq!(Request::parse(b"GET / HTTP/1.1"), Err(Error::Malformed));
    }

    #[test]
    fn parses_status_line_and_body() {
        let raw = b"HTTP/1.1 404 Not Found\r\nContent-Length: 2\r\n\r\nno";
        let response = Response::parse(raw).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.reason, "Not Found");
        assert_eq!(response.header("content-length"), Some("2"));
        assert_eq!(response.body, b"no");

        assert_eq!(Response::parse(b"HTTP/1.0 200 OK\r\n").unwrap().status, 200);
        assert_eq!(Response::parse(b"HTTP/1.0 abc OK\r\n"), Err(Error::Malformed));
        assert_eq!(Response::parse(b"SSH-2.0 x\r\n"), Err(Error::Malformed));
    }
}

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// Port used when the dial URI does not name one.
pub const DEFAULT_PORT: u16 = 12201;

/// Transport selected by the URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Datagram transport (`udp://`).
    Udp,
    /// Stream transport (`tcp://`).
    Tcp,
}

impl Scheme {
    /// Lowercase scheme name as it appears in a URI.
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Udp => "udp",
            Scheme::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed dial URI: `scheme://host[:port][?key=value&...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
    query: Vec<(String, String)>,
}

impl Endpoint {
    /// Parse a dial URI.
    ///
    /// IPv6 literals must be bracketed (`udp://[::1]:12201`). A missing port
    /// defaults to [`DEFAULT_PORT`]. Any path component is ignored.
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = |reason: &'static str| TransportError::InvalidUri {
            uri: uri.to_string(),
            reason,
        };

        let (scheme, rest) = uri.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        if scheme.is_empty() {
            return Err(invalid("missing scheme"));
        }

        let (authority, query) = match rest.split_once('?') {
            Some((authority, query)) => (authority, Some(query)),
            None => (rest, None),
        };
        let authority = authority.split('/').next().unwrap_or_default();

        let (host, port) = split_host_port(authority).map_err(invalid)?;

        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "udp" => Scheme::Udp,
            "tcp" => Scheme::Tcp,
            _ => return Err(TransportError::UnsupportedScheme(scheme.to_string())),
        };

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            query: query.map(parse_query).unwrap_or_default(),
        })
    }

    /// Transport selected by the scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host name or address literal, without brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Remote port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// First value of the named query parameter, if present.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `host:port` form suitable for address resolution and diagnostics.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority())
    }
}

fn split_host_port(authority: &str) -> std::result::Result<(&str, u16), &'static str> {
    if authority.is_empty() {
        return Err("missing host");
    }

    let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or("unterminated IPv6 literal")?;
        let port = match after {
            "" => None,
            p => Some(p.strip_prefix(':').ok_or("unexpected characters after IPv6 literal")?),
        };
        (host, port)
    } else {
        match authority.split_once(':') {
            Some((host, port)) => {
                if port.contains(':') {
                    return Err("IPv6 literals must be enclosed in brackets");
                }
                (host, Some(port))
            }
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err("missing host");
    }

    let port = match port {
        None => DEFAULT_PORT,
        Some(p) => p.parse::<u16>().map_err(|_| "invalid port")?,
    };

    Ok((host, port))
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_udp_with_port_and_query() {
        let ep = Endpoint::parse("udp://graylog.local:5555?compress=zlib").unwrap();
        assert_eq!(ep.scheme(), Scheme::Udp);
        assert_eq!(ep.host(), "graylog.local");
        assert_eq!(ep.port(), 5555);
        assert_eq!(ep.query_value("compress"), Some("zlib"));
    }

    #[test]
    fn defaults_port_when_missing() {
        let ep = Endpoint::parse("tcp://localhost").unwrap();
        assert_eq!(ep.scheme(), Scheme::Tcp);
        assert_eq!(ep.port(), DEFAULT_PORT);
        assert_eq!(ep.authority(), "localhost:12201");
    }

    #[test]
    fn bracketed_ipv6_host() {
        let ep = Endpoint::parse("udp://[::1]:9000").unwrap();
        assert_eq!(ep.host(), "::1");
        assert_eq!(ep.port(), 9000);
        assert_eq!(ep.authority(), "[::1]:9000");

        let ep = Endpoint::parse("udp://[::1]").unwrap();
        assert_eq!(ep.port(), DEFAULT_PORT);
    }

    #[test]
    fn rejects_unbracketed_ipv6() {
        let err = Endpoint::parse("udp://::1:9000").unwrap_err();
        assert!(matches!(err, TransportError::InvalidUri { .. }));
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let err = Endpoint::parse("http://localhost:12201").unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedScheme(s) if s == "http"));
    }

    #[test]
    fn rejects_malformed_uris() {
        for uri in [
            "localhost:12201",
            "://localhost",
            "udp://",
            "udp://:12201",
            "udp://host:notaport",
            "udp://host:70000",
            "udp://[::1",
        ] {
            assert!(
                matches!(Endpoint::parse(uri), Err(TransportError::InvalidUri { .. })),
                "{uri} should be rejected"
            );
        }
    }

    #[test]
    fn ignores_path_and_keeps_first_query_value() {
        let ep: Endpoint = "UDP://host/some/path?compress=none&compress=gzip&flag"
            .parse()
            .unwrap();
        assert_eq!(ep.scheme(), Scheme::Udp);
        assert_eq!(ep.host(), "host");
        assert_eq!(ep.query_value("compress"), Some("none"));
        assert_eq!(ep.query_value("flag"), Some(""));
        assert_eq!(ep.query_value("missing"), None);
    }

    #[test]
    fn display_round_trips_authority() {
        let ep = Endpoint::parse("tcp://10.0.0.1").unwrap();
        assert_eq!(ep.to_string(), "tcp://10.0.0.1:12201");
    }
}

//! Parsing and validation of sync targets typed by the user or read from the
//! desktop companion's QR code.

use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

/// Port the desktop companion listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 1234;

const SCHEME_PREFIX: &str = "ftp://";

/// A validated `host:port` pair on the local network.
///
/// # Examples
///
/// ```
/// use core_auth::ConnectionTarget;
///
/// let target = ConnectionTarget::parse("192.168.1.20").unwrap();
/// assert_eq!(target.port(), 1234);
/// assert_eq!(target.to_string(), "192.168.1.20:1234");
///
/// let scanned = ConnectionTarget::from_scanned_code(" ftp://10.0.0.5:2121/ ").unwrap();
/// assert_eq!(scanned.to_string(), "10.0.0.5:2121");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionTarget {
    host: Ipv4Addr,
    port: u16,
}

impl ConnectionTarget {
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self { host, port }
    }

    /// Parse manual input, defaulting the port to [`DEFAULT_PORT`].
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_with_default_port(input, DEFAULT_PORT)
    }

    /// Parse manual input, using `default_port` when none is given.
    pub fn parse_with_default_port(input: &str, default_port: u16) -> Result<Self> {
        let invalid = |reason: &str| AuthError::InvalidTarget {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let without_scheme = match trimmed.get(..SCHEME_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME_PREFIX) => {
                &trimmed[SCHEME_PREFIX.len()..]
            }
            _ => trimmed,
        };
        let body = without_scheme.trim_end_matches('/');

        if body.is_empty() {
            return Err(invalid("address is empty"));
        }

        let (host_part, port) = match body.split_once(':') {
            Some((host, port)) => (host, parse_port(port).ok_or_else(|| invalid("port must be 1-65535"))?),
            None => (body, default_port),
        };

        if port == 0 {
            return Err(invalid("port must be 1-65535"));
        }

        let host = parse_ipv4(host_part)
            .ok_or_else(|| invalid("expected four dot-separated numbers between 0 and 255"))?;

        Ok(Self { host, port })
    }

    /// Parse the opaque payload of a scanned QR code.
    pub fn from_scanned_code(code: &str) -> Result<Self> {
        Self::parse(code)
    }

    pub fn host(&self) -> Ipv4Addr {
        self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ConnectionTarget {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn is_number(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

fn parse_port(part: &str) -> Option<u16> {
    if !is_number(part) {
        return None;
    }
    part.parse::<u16>().ok().filter(|port| *port != 0)
}

fn parse_ipv4(host: &str) -> Option<Ipv4Addr> {
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() != 4 {
        return None;
    }

    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(&parts) {
        if !is_number(part) {
            return None;
        }
        *slot = part.parse::<u8>().ok()?;
    }

    Some(Ipv4Addr::from(octets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_address_uses_default_port() {
        let target = ConnectionTarget::parse("10.0.0.5").unwrap();
        assert_eq!(target.host(), Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(target.port(), DEFAULT_PORT);
        assert_eq!(target.socket_addr().to_string(), "10.0.0.5:1234");
    }

    #[test]
    fn test_explicit_port() {
        let target = ConnectionTarget::parse("192.168.0.12:2121").unwrap();
        assert_eq!(target.port(), 2121);
    }

    #[test]
    fn test_custom_default_port() {
        let target = ConnectionTarget::parse_with_default_port("192.168.0.12", 21).unwrap();
        assert_eq!(target.port(), 21);
    }

    #[test]
    fn test_scanned_code_is_trimmed() {
        let target = ConnectionTarget::from_scanned_code("\n FTP://172.16.0.3/ \t").unwrap();
        assert_eq!(target.to_string(), "172.16.0.3:1234");
    }

    #[test]
    fn test_octet_bounds() {
        assert!(ConnectionTarget::parse("0.0.0.0").is_ok());
        assert!(ConnectionTarget::parse("255.255.255.255").is_ok());
        assert!(ConnectionTarget::parse("256.1.1.1").is_err());
        assert!(ConnectionTarget::parse("1.1.1.-1").is_err());
        assert!(ConnectionTarget::parse("+1.1.1.1").is_err());
    }

    #[test]
    fn test_wrong_part_count() {
        for input in ["1.2.3", "1.2.3.4.5", "1..2.3", "abc", ""] {
            let err = ConnectionTarget::parse(input).unwrap_err();
            assert!(
                matches!(err, AuthError::InvalidTarget { .. }),
                "expected rejection for {input:?}"
            );
        }
    }

    #[test]
    fn test_bad_ports() {
        assert!(ConnectionTarget::parse("10.0.0.5:").is_err());
        assert!(ConnectionTarget::parse("10.0.0.5:0").is_err());
        assert!(ConnectionTarget::parse("10.0.0.5:70000").is_err());
        assert!(ConnectionTarget::parse("10.0.0.5:12a").is_err());
        assert!(ConnectionTarget::parse_with_default_port("10.0.0.5", 0).is_err());
    }

    #[test]
    fn test_error_message_names_input() {
        let err = ConnectionTarget::parse("desktop.local").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("desktop.local"));
        assert!(message.contains("dot-separated"));
    }

    #[test]
    fn test_from_str() {
        let target: ConnectionTarget = "10.1.2.3:4000".parse().unwrap();
        assert_eq!(target, ConnectionTarget::new(Ipv4Addr::new(10, 1, 2, 3), 4000));
    }
}

//! The accepted address surface.
//!
//! Peers are named by `telnet://host[:port]`, bare `host[:port]`,
//! `[ipv6][:port]`, or a bare IPv4/IPv6 literal. Scheme, host, and port are
//! surfaced separately; the default port comes from the scheme.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

use url::{Host, Url};

use crate::error::Error;

/// Default control port for the `telnet` scheme.
pub const DEFAULT_PORT: u16 = 23;

const DEFAULT_SCHEME: &str = "telnet";

/// Which IP address families resolution and binding may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSet {
    pub ipv4: bool,
    pub ipv6: bool,
}

impl VersionSet {
    pub const ANY: VersionSet = VersionSet {
        ipv4: true,
        ipv6: true,
    };
    pub const IPV4_ONLY: VersionSet = VersionSet {
        ipv4: true,
        ipv6: false,
    };
    pub const IPV6_ONLY: VersionSet = VersionSet {
        ipv4: false,
        ipv6: true,
    };

    pub fn allows(self, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(_) => self.ipv4,
            IpAddr::V6(_) => self.ipv6,
        }
    }
}

impl Default for VersionSet {
    fn default() -> Self {
        VersionSet::ANY
    }
}

/// A parsed control URL: scheme, host, and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl ControlUrl {
    /// Parse any of the accepted forms.
    pub fn parse(input: &str) -> Result<ControlUrl, Error> {
        if input.is_empty() {
            return Err(Error::InvalidUrl("empty address".to_owned()));
        }
        if input.contains("://") {
            return Self::parse_scheme_url(input);
        }
        let (host, port) = split_host_port(input)?;
        Ok(ControlUrl {
            scheme: DEFAULT_SCHEME.to_owned(),
            host,
            port: port.unwrap_or(DEFAULT_PORT),
        })
    }

    fn parse_scheme_url(input: &str) -> Result<ControlUrl, Error> {
        let url = Url::parse(input).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let host = match url.host() {
            Some(Host::Domain(d)) => d.to_owned(),
            Some(Host::Ipv4(a)) => a.to_string(),
            Some(Host::Ipv6(a)) => a.to_string(),
            None => return Err(Error::InvalidUrl(format!("no host in {input:?}"))),
        };
        let port = match url.port() {
            Some(p) => p,
            None if url.scheme() == DEFAULT_SCHEME => DEFAULT_PORT,
            None => {
                return Err(Error::InvalidUrl(format!(
                    "no default port for scheme {:?}",
                    url.scheme()
                )));
            }
        };
        Ok(ControlUrl {
            scheme: url.scheme().to_owned(),
            host,
            port,
        })
    }

    /// Whether the host is an address literal rather than a name.
    pub fn host_addr(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }
}

impl fmt::Display for ControlUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

fn split_host_port(input: &str) -> Result<(String, Option<u16>), Error> {
    // Bracketed IPv6, optionally with a port.
    if let Some(rest) = input.strip_prefix('[') {
        let Some(end) = rest.find(']') else {
            return Err(Error::InvalidUrl(format!("unterminated bracket in {input:?}")));
        };
        let host = &rest[..end];
        host.parse::<Ipv6Addr>()
            .map_err(|_| Error::InvalidUrl(format!("invalid IPv6 literal {host:?}")))?;
        let tail = &rest[end + 1..];
        let port = match tail.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None if tail.is_empty() => None,
            None => {
                return Err(Error::InvalidUrl(format!("trailing junk in {input:?}")));
            }
        };
        return Ok((host.to_owned(), port));
    }
    // A bare IPv6 literal has more than one colon and no brackets.
    if input.parse::<Ipv6Addr>().is_ok() {
        return Ok((input.to_owned(), None));
    }
    match input.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => Ok((host.to_owned(), Some(parse_port(port)?))),
        Some(_) => Err(Error::InvalidUrl(format!("missing host in {input:?}"))),
        None => Ok((input.to_owned(), None)),
    }
}

fn parse_port(text: &str) -> Result<u16, Error> {
    text.parse()
        .map_err(|_| Error::InvalidUrl(format!("invalid port {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_url_forms() {
        let u = ControlUrl::parse("telnet://amp.local").unwrap();
        assert_eq!(u.scheme, "telnet");
        assert_eq!(u.host, "amp.local");
        assert_eq!(u.port, DEFAULT_PORT);

        let u = ControlUrl::parse("telnet://10.0.0.7:2300").unwrap();
        assert_eq!(u.host, "10.0.0.7");
        assert_eq!(u.port, 2300);

        let u = ControlUrl::parse("telnet://[fe80::1]:23").unwrap();
        assert_eq!(u.host, "fe80::1");
        assert_eq!(u.port, 23);
    }

    #[test]
    fn bare_host_forms() {
        let u = ControlUrl::parse("amp.local").unwrap();
        assert_eq!(u.port, DEFAULT_PORT);
        let u = ControlUrl::parse("amp.local:2300").unwrap();
        assert_eq!(u.port, 2300);
        let u = ControlUrl::parse("192.0.2.9").unwrap();
        assert_eq!(u.host_addr(), Some("192.0.2.9".parse().unwrap()));
    }

    #[test]
    fn ipv6_literal_forms() {
        let u = ControlUrl::parse("fe80::1").unwrap();
        assert_eq!(u.host, "fe80::1");
        assert_eq!(u.port, DEFAULT_PORT);
        let u = ControlUrl::parse("[fe80::1]:2300").unwrap();
        assert_eq!(u.host, "fe80::1");
        assert_eq!(u.port, 2300);
        assert_eq!(u.to_string(), "telnet://[fe80::1]:2300");
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        assert!(ControlUrl::parse("").is_err());
        assert!(ControlUrl::parse("[fe80::1:23").is_err());
        assert!(ControlUrl::parse("amp.local:notaport").is_err());
        assert!(ControlUrl::parse(":2300").is_err());
        assert!(ControlUrl::parse("ssh://amp.local").is_err());
    }

    #[test]
    fn version_set_filters_families() {
        let v4: IpAddr = "192.0.2.1".parse().unwrap();
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        assert!(VersionSet::ANY.allows(v4) && VersionSet::ANY.allows(v6));
        assert!(VersionSet::IPV4_ONLY.allows(v4) && !VersionSet::IPV4_ONLY.allows(v6));
        assert!(!VersionSet::IPV6_ONLY.allows(v4) && VersionSet::IPV6_ONLY.allows(v6));
    }
}

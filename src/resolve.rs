use std::io;
use std::net::{IpAddr, Ipv4Addr};

use dns_lookup::{lookup_addr, lookup_host};
use tracing::debug;

use crate::error::{Error, Result};

/// Reverse name resolution.
pub trait ReverseResolver {
    fn reverse_lookup(&self, addr: Ipv4Addr) -> io::Result<String>;
}

/// Resolve through the system resolver (`getnameinfo`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl ReverseResolver for SystemResolver {
    fn reverse_lookup(&self, addr: Ipv4Addr) -> io::Result<String> {
        lookup_addr(&IpAddr::V4(addr))
    }
}

/// The host name for `addr`, or its dotted form if it cannot be resolved.
pub fn host_name<R: ReverseResolver + ?Sized>(resolver: &R, addr: Ipv4Addr) -> String {
    match resolver.reverse_lookup(addr) {
        Ok(name) if !name.is_empty() => name,
        Ok(_) => addr.to_string(),
        Err(err) => {
            debug!(%addr, %err, "reverse lookup failed");
            addr.to_string()
        }
    }
}

/// Resolve the trace destination to an IPv4 address.
pub fn resolve_destination(host: &str) -> Result<Ipv4Addr> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(addr);
    }
    let addrs = lookup_host(host).map_err(|err| {
        debug!(host, %err, "forward lookup failed");
        Error::Unresolved(host.to_string())
    })?;
    first_ipv4(&addrs).ok_or_else(|| Error::Unresolved(host.to_string()))
}

fn first_ipv4(addrs: &[IpAddr]) -> Option<Ipv4Addr> {
    addrs.iter().find_map(|addr| match addr {
        IpAddr::V4(v4) => Some(*v4),
        IpAddr::V6(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    struct Fixed(Option<&'static str>);

    impl ReverseResolver for Fixed {
        fn reverse_lookup(&self, _addr: Ipv4Addr) -> io::Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no PTR record"))
        }
    }

    #[test]
    fn test_host_name_resolved() {
        let name = host_name(&Fixed(Some("router.example.net")), Ipv4Addr::new(192, 0, 2, 1));
        assert_eq!(name, "router.example.net");
    }

    #[test]
    fn test_host_name_falls_back_to_address() {
        let name = host_name(&Fixed(None), Ipv4Addr::new(192, 0, 2, 1));
        assert_eq!(name, "192.0.2.1");
    }

    #[test]
    fn test_host_name_empty_falls_back_to_address() {
        let name = host_name(&Fixed(Some("")), Ipv4Addr::new(10, 1, 2, 3));
        assert_eq!(name, "10.1.2.3");
    }

    #[test]
    fn test_resolve_literal_address() {
        let addr = resolve_destination("203.0.113.5").unwrap();
        assert_eq!(addr, Ipv4Addr::new(203, 0, 113, 5));
    }

    #[test]
    fn test_first_ipv4_skips_ipv6() {
        let addrs = [
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(198, 51, 100, 9)),
            IpAddr::V4(Ipv4Addr::new(198, 51, 100, 10)),
        ];
        assert_eq!(first_ipv4(&addrs), Some(Ipv4Addr::new(198, 51, 100, 9)));
        assert_eq!(first_ipv4(&addrs[..1]), None);
    }
}

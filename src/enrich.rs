//! Ownership enrichment for publicly routable addresses.
//!
//! Lookups go over WHOIS (TCP port 43): IANA is asked first for the authoritative registry,
//! then that registry is asked for the network object.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::{debug, instrument};

use crate::config::Config;
use crate::interrupt::Interrupt;

/// Read size for WHOIS answers.
const READ_CHUNK: usize = 1024;

/// Ownership metadata for an address.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Ownership {
    pub net_name: Option<String>,
    pub as_number: Option<u32>,
    pub country: Option<String>,
}

/// Attaches ownership data to responder addresses.
pub trait Enricher {
    /// Whether `addr` is publicly routable and worth looking up.
    fn is_public(&self, addr: Ipv4Addr) -> bool {
        is_public(addr)
    }

    /// Ownership for `addr`; `None` when the lookup failed.
    fn lookup(&self, addr: Ipv4Addr) -> Option<Ownership>;
}

impl<E: Enricher + ?Sized> Enricher for &E {
    fn is_public(&self, addr: Ipv4Addr) -> bool {
        (**self).is_public(addr)
    }

    fn lookup(&self, addr: Ipv4Addr) -> Option<Ownership> {
        (**self).lookup(addr)
    }
}

/// Whether `addr` lies outside every private, local and reserved IPv4 block.
pub fn is_public(addr: Ipv4Addr) -> bool {
    let [a, b, ..] = addr.octets();
    let shared = a == 100 && (b & 0xc0) == 64;
    let reserved = a >= 240;
    let this_network = a == 0;
    !(addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_multicast()
        || addr.is_broadcast()
        || addr.is_unspecified()
        || shared
        || reserved
        || this_network)
}

/// WHOIS client.
///
/// Each query, connect to end of answer, must finish within `timeout`.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    server: String,
    timeout: Duration,
    interrupt: Interrupt,
}

impl WhoisClient {
    pub fn new(config: &Config) -> Self {
        Self {
            server: config.whois_server.clone(),
            timeout: config.whois_timeout,
            interrupt: Interrupt::new(),
        }
    }

    /// Abandon lookups once `interrupt` is triggered.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    fn check_interrupt(&self) -> io::Result<()> {
        if self.interrupt.is_triggered() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "lookup interrupted"));
        }
        Ok(())
    }

    fn query(&self, server: &str, addr: Ipv4Addr) -> io::Result<String> {
        let deadline = Instant::now() + self.timeout;
        let remote = resolve_server(server)?;
        let mut stream = TcpStream::connect_timeout(&remote, self.timeout)?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.write_all(format!("{addr}\r\n").as_bytes())?;
        let mut raw = Vec::new();
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            self.check_interrupt()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "whois answer too slow"));
            }
            stream.set_read_timeout(Some(remaining))?;
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(len) => raw.extend_from_slice(&chunk[..len]),
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    fn try_lookup(&self, addr: Ipv4Addr) -> io::Result<Ownership> {
        self.check_interrupt()?;
        let iana = self.query(&self.server, addr)?;
        let answer = match referral(&iana) {
            Some(server) => {
                self.check_interrupt()?;
                debug!(%addr, server, "following referral");
                self.query(&server, addr)?
            }
            None => iana,
        };
        Ok(parse_ownership(&answer))
    }
}

impl Enricher for WhoisClient {
    #[instrument(skip(self), level = "debug")]
    fn lookup(&self, addr: Ipv4Addr) -> Option<Ownership> {
        match self.try_lookup(addr) {
            Ok(ownership) => Some(ownership),
            Err(err) => {
                debug!(%err, "whois lookup failed");
                None
            }
        }
    }
}

/// Enricher that never looks anything up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnrichment;

impl Enricher for NoEnrichment {
    fn is_public(&self, _addr: Ipv4Addr) -> bool {
        false
    }

    fn lookup(&self, _addr: Ipv4Addr) -> Option<Ownership> {
        None
    }
}

fn resolve_server(server: &str) -> io::Result<SocketAddr> {
    let with_port = if server.contains(':') {
        server.to_string()
    } else {
        format!("{server}:43")
    };
    with_port
        .to_socket_addrs()?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no IPv4 address for server"))
}

/// Iterate the `key: value` lines of a WHOIS answer, skipping comments.
fn fields(answer: &str) -> impl Iterator<Item = (&str, &str)> {
    answer
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('%') && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(_, value)| !value.is_empty())
}

fn first_field<'a>(answer: &'a str, keys: &[&str]) -> Option<&'a str> {
    fields(answer)
        .find(|(key, _)| keys.iter().any(|k| key.eq_ignore_ascii_case(k)))
        .map(|(_, value)| value)
}

/// The registry server IANA refers the query to.
fn referral(answer: &str) -> Option<String> {
    first_field(answer, &["refer", "whois"]).map(|server| {
        server
            .trim_start_matches("whois://")
            .trim_end_matches('/')
            .to_string()
    })
}

fn parse_ownership(answer: &str) -> Ownership {
    Ownership {
        net_name: first_field(answer, &["netname"]).map(str::to_string),
        as_number: first_field(answer, &["origin", "originas"]).and_then(parse_as_number),
        country: first_field(answer, &["country"]).map(str::to_uppercase),
    }
}

/// Parse `AS15169`, `as15169` or `15169`; lists keep the first entry.
fn parse_as_number(value: &str) -> Option<u32> {
    let first = value.split([',', ' ']).next()?;
    let digits = first
        .strip_prefix("AS")
        .or_else(|| first.strip_prefix("as"))
        .unwrap_or(first);
    digits.parse().ok()
}

//! One send/receive cycle per hop over a pair of raw ICMP sockets.
//!
//! Sockets are opened inside [`Prober::probe`] and dropped on return, so nothing captured for
//! one TTL can leak into the next hop.

use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::{Error, IoOperation, Result};
use crate::icmp::{self, encode_echo_request};
use crate::interrupt::Interrupt;
use crate::resolve::{ReverseResolver, SystemResolver, host_name};

/// Largest datagram read from the receive socket.
const MAX_PACKET_SIZE: usize = 512;

/// The host that answered a probe.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Responder {
    pub addr: Ipv4Addr,
    /// Reverse DNS name, or the dotted address when none resolves.
    pub name: String,
}

/// Sends one probe and waits for the answer.
pub trait Prober {
    /// Probe `destination` with the given TTL.
    ///
    /// `Ok(None)` means nothing answered before the receive timeout.
    fn probe(&mut self, ttl: u8, destination: Ipv4Addr) -> Result<Option<Responder>>;
}

impl<P: Prober + ?Sized> Prober for &mut P {
    fn probe(&mut self, ttl: u8, destination: Ipv4Addr) -> Result<Option<Responder>> {
        (**self).probe(ttl, destination)
    }
}

/// Probe over privileged raw ICMPv4 sockets.
#[derive(Debug)]
pub struct RawSocketProber<R = SystemResolver> {
    resolver: R,
    listen_port: u16,
    recv_timeout: Duration,
    poll_interval: Duration,
    interrupt: Interrupt,
}

impl RawSocketProber {
    pub fn new(config: &Config, interrupt: Interrupt) -> Self {
        Self::with_resolver(config, interrupt, SystemResolver)
    }
}

impl<R: ReverseResolver> RawSocketProber<R> {
    pub fn with_resolver(config: &Config, interrupt: Interrupt, resolver: R) -> Self {
        Self {
            resolver,
            listen_port: config.listen_port,
            recv_timeout: config.recv_timeout,
            poll_interval: config.poll_interval,
            interrupt,
        }
    }

    /// Wait for one datagram, in slices so an interrupt is noticed promptly.
    fn receive(&self, socket: &mut Socket, buf: &mut [u8]) -> Result<Option<usize>> {
        let deadline = Instant::now() + self.recv_timeout;
        loop {
            if self.interrupt.is_triggered() {
                return Err(Error::Interrupted);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            socket
                .set_read_timeout(Some(remaining.min(self.poll_interval)))
                .map_err(|err| Error::io(err, IoOperation::SetReadTimeout))?;
            match socket.read(buf) {
                Ok(len) => return Ok(Some(len)),
                Err(err) if is_retryable(&err) => {}
                Err(err) => return Err(Error::io(err, IoOperation::RecvFrom)),
            }
        }
    }
}

impl<R: ReverseResolver> Prober for RawSocketProber<R> {
    #[instrument(skip(self), level = "debug")]
    fn probe(&mut self, ttl: u8, destination: Ipv4Addr) -> Result<Option<Responder>> {
        if self.interrupt.is_triggered() {
            return Err(Error::Interrupted);
        }
        let sender = send_socket(ttl)?;
        let mut receiver = recv_socket(self.listen_port)?;
        let target = SockAddr::from(SocketAddrV4::new(destination, self.listen_port));
        sender
            .send_to(&encode_echo_request(), &target)
            .map_err(|err| Error::io(err, IoOperation::SendTo))?;
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        let Some(len) = self.receive(&mut receiver, &mut buf)? else {
            debug!("no response before timeout");
            return Ok(None);
        };
        let response = icmp::decode(&buf[..len])?;
        debug!(
            source = %response.source,
            icmp_type = response.icmp_type.0,
            icmp_code = response.icmp_code.0,
            "received response"
        );
        if self.interrupt.is_triggered() {
            return Err(Error::Interrupted);
        }
        let name = host_name(&self.resolver, response.source);
        Ok(Some(Responder {
            addr: response.source,
            name,
        }))
    }
}

fn send_socket(ttl: u8) -> Result<Socket> {
    let socket = raw_icmp_socket()?;
    socket
        .set_ttl(u32::from(ttl))
        .map_err(|err| Error::io(err, IoOperation::SetTtl))?;
    Ok(socket)
}

fn recv_socket(port: u16) -> Result<Socket> {
    let socket = raw_icmp_socket()?;
    let local = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), port);
    socket
        .bind(&SockAddr::from(local))
        .map_err(|err| Error::io(err, IoOperation::Bind))?;
    Ok(socket)
}

fn raw_icmp_socket() -> Result<Socket> {
    Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
        .map_err(|err| Error::io(err, IoOperation::NewSocket))
}

fn is_retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

//! Byte-level encode and decode of ICMP over IPv4.
//!
//! Exactly one probe shape is ever sent: an 8-byte echo request with a fixed identifier and
//! sequence number and no payload.

use std::net::Ipv4Addr;

use pnet::packet::icmp::{IcmpCode, IcmpType};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use tracing::warn;

use crate::error::{Error, Result};

/// ICMP echo request header size, with no payload.
pub const ICMP_HEADER_SIZE: usize = 8;
/// IPv4 header size without options.
pub const IPV4_HEADER_SIZE: usize = 20;
/// Offset of the protocol byte in the IPv4 header.
const PROTOCOL_OFFSET: usize = 9;
/// Identifier carried by every probe.
pub const IDENTIFIER: u16 = 0x4242;
/// Sequence number carried by every probe.
pub const SEQUENCE: u16 = 1;

/// The probe sent at every hop: type 8, code 0, checksum `0xb5bc`, identifier `0x4242`,
/// sequence 1.
pub const ECHO_REQUEST: [u8; ICMP_HEADER_SIZE] =
    [0x08, 0x00, 0xb5, 0xbc, 0x42, 0x42, 0x00, 0x01];

/// Build the echo request as raw bytes.
pub const fn encode_echo_request() -> [u8; ICMP_HEADER_SIZE] {
    ECHO_REQUEST
}

/// An inbound ICMP datagram, reduced to what a hop needs.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Response {
    pub source: Ipv4Addr,
    pub icmp_type: IcmpType,
    pub icmp_code: IcmpCode,
}

/// Decode a raw IPv4 datagram as captured on a raw ICMP socket.
///
/// Fails with [`Error::UnexpectedProtocol`] for non-ICMP traffic and [`Error::Truncated`] when
/// the datagram cannot hold an IPv4 header plus the ICMP type and code.
pub fn decode(datagram: &[u8]) -> Result<Response> {
    let protocol = *datagram
        .get(PROTOCOL_OFFSET)
        .ok_or(Error::Truncated(datagram.len()))?;
    if protocol != IpNextHeaderProtocols::Icmp.0 {
        return Err(Error::UnexpectedProtocol(protocol));
    }
    let ipv4 = Ipv4Packet::new(datagram).ok_or(Error::Truncated(datagram.len()))?;
    let source = ipv4.get_source();
    let header_len = (usize::from(ipv4.get_header_length()) * 4).max(IPV4_HEADER_SIZE);
    if header_len > IPV4_HEADER_SIZE {
        warn!(%source, header_len, "IPv4 header carries options");
    }
    match datagram.get(header_len..header_len + 2) {
        Some(&[icmp_type, icmp_code]) => Ok(Response {
            source,
            icmp_type: IcmpType::new(icmp_type),
            icmp_code: IcmpCode::new(icmp_code),
        }),
        _ => Err(Error::Truncated(datagram.len())),
    }
}

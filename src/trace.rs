use std::iter::FusedIterator;
use std::net::Ipv4Addr;

use tracing::{debug, instrument};

use crate::enrich::{Enricher, Ownership};
use crate::error::{Error, Result};
use crate::interrupt::Interrupt;
use crate::probe::{Prober, Responder};

/// The outcome of probing one hop.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct HopResult {
    pub hop: u8,
    pub addr: Option<Ipv4Addr>,
    pub name: Option<String>,
    pub net_name: Option<String>,
    pub country: Option<String>,
    pub as_number: Option<u32>,
}

impl HopResult {
    fn new(hop: u8, responder: Option<Responder>, ownership: Option<Ownership>) -> Self {
        let (addr, name) = match responder {
            Some(Responder { addr, name }) => (Some(addr), Some(name)),
            None => (None, None),
        };
        let Ownership {
            net_name,
            as_number,
            country,
        } = ownership.unwrap_or_default();
        Self {
            hop,
            addr,
            name,
            net_name,
            country,
            as_number,
        }
    }

    /// Whether nothing answered at this hop.
    pub fn is_silent(&self) -> bool {
        self.addr.is_none()
    }
}

/// A lazy walk towards a destination, one probe per step.
///
/// Ends after the hop the destination answers from, after `max_hops` hops, or after the first
/// error.
#[derive(Debug)]
pub struct Trace<P, E> {
    prober: P,
    enricher: E,
    interrupt: Interrupt,
    destination: Ipv4Addr,
    max_hops: u8,
    ttl: u8,
    last_addr: Option<Ipv4Addr>,
    done: bool,
}

impl<P: Prober, E: Enricher> Trace<P, E> {
    pub fn new(prober: P, enricher: E, destination: Ipv4Addr, max_hops: u8) -> Self {
        Self {
            prober,
            enricher,
            interrupt: Interrupt::new(),
            destination,
            max_hops,
            ttl: 0,
            last_addr: None,
            done: false,
        }
    }

    /// Stop with [`Error::Interrupted`] once `interrupt` is triggered.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    fn reached(&self) -> bool {
        self.last_addr == Some(self.destination)
    }

    #[instrument(skip(self), fields(destination = %self.destination), level = "debug")]
    fn step(&mut self, ttl: u8) -> Result<HopResult> {
        let responder = self.prober.probe(ttl, self.destination)?;
        self.last_addr = responder.as_ref().map(|r| r.addr);
        if self.interrupt.is_triggered() {
            return Err(Error::Interrupted);
        }
        let ownership = self
            .last_addr
            .filter(|&addr| self.enricher.is_public(addr))
            .and_then(|addr| self.enricher.lookup(addr));
        let hop = HopResult::new(ttl, responder, ownership);
        debug!(addr = ?hop.addr, "hop complete");
        Ok(hop)
    }
}

impl<P: Prober, E: Enricher> Iterator for Trace<P, E> {
    type Item = Result<HopResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.ttl >= self.max_hops || self.reached() {
            self.done = true;
            return None;
        }
        if self.interrupt.is_triggered() {
            self.done = true;
            return Some(Err(Error::Interrupted));
        }
        self.ttl += 1;
        let result = self.step(self.ttl);
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(usize::from(self.max_hops - self.ttl)))
        }
    }
}

impl<P: Prober, E: Enricher> FusedIterator for Trace<P, E> {}

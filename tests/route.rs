//! Route walks over scripted probers and enrichers, without touching the network.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::Ipv4Addr;

use test_case::test_case;
use tracert::enrich::{Enricher, Ownership, is_public};
use tracert::error::{Error, Result};
use tracert::probe::{Prober, Responder};
use tracert::trace::{HopResult, Trace};

/// Answers from a per-TTL table; unlisted TTLs stay silent.
#[derive(Default)]
struct Network {
    routers: HashMap<u8, Ipv4Addr>,
    names: HashMap<Ipv4Addr, &'static str>,
    probed: Vec<u8>,
}

impl Network {
    fn with_router(mut self, ttl: u8, addr: Ipv4Addr) -> Self {
        self.routers.insert(ttl, addr);
        self
    }

    fn with_name(mut self, addr: Ipv4Addr, name: &'static str) -> Self {
        self.names.insert(addr, name);
        self
    }
}

impl Prober for Network {
    fn probe(&mut self, ttl: u8, _destination: Ipv4Addr) -> Result<Option<Responder>> {
        self.probed.push(ttl);
        Ok(self.routers.get(&ttl).map(|&addr| Responder {
            addr,
            name: self
                .names
                .get(&addr)
                .map_or_else(|| addr.to_string(), |name| name.to_string()),
        }))
    }
}

/// Records every lookup and hands back a fixed ownership record.
#[derive(Default)]
struct Registry {
    looked_up: RefCell<Vec<Ipv4Addr>>,
}

impl Enricher for Registry {
    fn lookup(&self, addr: Ipv4Addr) -> Option<Ownership> {
        self.looked_up.borrow_mut().push(addr);
        Some(Ownership {
            net_name: Some("EXAMPLE-NET".to_string()),
            as_number: Some(64496),
            country: Some("NL".to_string()),
        })
    }
}

fn walk(
    network: &mut Network,
    registry: &Registry,
    dest: Ipv4Addr,
    max_hops: u8,
) -> Vec<HopResult> {
    Trace::new(network, registry, dest, max_hops)
        .collect::<Result<_>>()
        .unwrap()
}

#[test]
fn test_documented_route() {
    let dest = Ipv4Addr::new(203, 0, 113, 5);
    let transit = Ipv4Addr::new(198, 51, 100, 9);
    let mut network = Network::default()
        .with_router(2, transit)
        .with_router(3, dest)
        .with_name(transit, "transit.example.net");
    let registry = Registry::default();

    let hops = walk(&mut network, &registry, dest, 3);

    assert_eq!(hops.len(), 3);
    assert_eq!(hops[0], HopResult {
        hop: 1,
        ..HopResult::default()
    });
    assert_eq!(hops[1], HopResult {
        hop: 2,
        addr: Some(transit),
        name: Some("transit.example.net".to_string()),
        net_name: Some("EXAMPLE-NET".to_string()),
        country: Some("NL".to_string()),
        as_number: Some(64496),
    });
    assert_eq!(hops[2].hop, 3);
    assert_eq!(hops[2].addr, Some(dest));
    assert_eq!(hops[2].name.as_deref(), Some("203.0.113.5"));
    assert_eq!(hops[2].as_number, Some(64496));
    assert_eq!(*registry.looked_up.borrow(), [transit, dest]);
}

#[test_case(1; "first hop")]
#[test_case(4; "mid route")]
#[test_case(30; "last allowed hop")]
fn test_destination_reached_at_hop(k: u8) {
    let dest = Ipv4Addr::new(192, 0, 2, 1);
    let mut network = Network::default().with_router(k, dest);
    for ttl in 1..k {
        network = network.with_router(ttl, Ipv4Addr::new(10, 0, 0, ttl));
    }
    let registry = Registry::default();

    let hops = walk(&mut network, &registry, dest, 30);

    assert_eq!(hops.len(), usize::from(k));
    assert_eq!(hops.last().and_then(|hop| hop.addr), Some(dest));
    assert_eq!(network.probed, (1..=k).collect::<Vec<_>>());
}

#[test_case(1; "single hop")]
#[test_case(3; "three hops")]
#[test_case(30; "default")]
fn test_silent_route(max_hops: u8) {
    let mut network = Network::default();
    let registry = Registry::default();

    let hops = walk(&mut network, &registry, Ipv4Addr::new(192, 0, 2, 1), max_hops);

    assert_eq!(hops.len(), usize::from(max_hops));
    for (hop, expected) in hops.iter().zip(1..) {
        assert_eq!(hop.hop, expected);
        assert!(hop.is_silent());
        assert_eq!(hop.name, None);
        assert_eq!(hop.net_name, None);
        assert_eq!(hop.country, None);
        assert_eq!(hop.as_number, None);
    }
    assert!(registry.looked_up.borrow().is_empty());
}

#[test]
fn test_hops_are_contiguous_and_bounded() {
    let dest = Ipv4Addr::new(192, 0, 2, 200);
    let mut network = Network::default()
        .with_router(2, Ipv4Addr::new(10, 0, 0, 1))
        .with_router(5, Ipv4Addr::new(8, 8, 4, 4));
    let registry = Registry::default();

    for max_hops in 1..=8 {
        network.probed.clear();
        let hops = walk(&mut network, &registry, dest, max_hops);
        assert!(hops.len() <= usize::from(max_hops));
        let numbers: Vec<u8> = hops.iter().map(|hop| hop.hop).collect();
        assert_eq!(numbers, (1..=max_hops).collect::<Vec<_>>());
    }
}

#[test]
fn test_enrichment_follows_is_public() {
    let dest = Ipv4Addr::new(192, 0, 2, 99);
    let route = [
        Ipv4Addr::new(192, 168, 0, 1),
        Ipv4Addr::new(10, 200, 0, 1),
        Ipv4Addr::new(100, 64, 1, 1),
        Ipv4Addr::new(8, 8, 8, 8),
    ];
    let mut network = Network::default();
    for (ttl, addr) in (1..).zip(route) {
        network = network.with_router(ttl, addr);
    }
    let registry = Registry::default();

    let hops = walk(&mut network, &registry, dest, 4);

    for hop in &hops {
        let addr = hop.addr.unwrap();
        assert_eq!(hop.net_name.is_some(), is_public(addr), "{addr}");
        assert_eq!(hop.country.is_some(), is_public(addr), "{addr}");
        assert_eq!(hop.as_number.is_some(), is_public(addr), "{addr}");
    }
    assert_eq!(*registry.looked_up.borrow(), [Ipv4Addr::new(8, 8, 8, 8)]);
}

#[test]
fn test_failed_lookup_leaves_fields_unset() {
    struct Unreachable;

    impl Enricher for Unreachable {
        fn lookup(&self, _addr: Ipv4Addr) -> Option<Ownership> {
            None
        }
    }

    let dest = Ipv4Addr::new(8, 8, 8, 8);
    let mut network = Network::default().with_router(1, dest);

    let hops: Vec<_> = Trace::new(&mut network, Unreachable, dest, 30)
        .collect::<Result<_>>()
        .unwrap();

    assert_eq!(hops.len(), 1);
    assert_eq!(hops[0].addr, Some(dest));
    assert_eq!(hops[0].net_name, None);
    assert_eq!(hops[0].as_number, None);
}

#[test]
fn test_protocol_error_is_fatal() {
    struct Noisy;

    impl Prober for Noisy {
        fn probe(&mut self, ttl: u8, _destination: Ipv4Addr) -> Result<Option<Responder>> {
            if ttl == 2 {
                Err(Error::UnexpectedProtocol(6))
            } else {
                Ok(None)
            }
        }
    }

    let dest = Ipv4Addr::new(192, 0, 2, 1);
    let results: Vec<_> = Trace::new(Noisy, Registry::default(), dest, 30).collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::UnexpectedProtocol(6))));
}

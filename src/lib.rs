//! Trace the network path to a host with ICMP echo probes of increasing TTL.
//!
//! [`trace::Trace`] drives the walk one hop at a time over a [`probe::Prober`] and enriches
//! public responders through an [`enrich::Enricher`]:
//!
//! ```no_run
//! # fn main() -> tracert::error::Result<()> {
//! use tracert::config::Config;
//! use tracert::enrich::WhoisClient;
//! use tracert::interrupt::Interrupt;
//! use tracert::probe::RawSocketProber;
//! use tracert::resolve::resolve_destination;
//! use tracert::trace::Trace;
//!
//! let config = Config::default();
//! let interrupt = Interrupt::new();
//! let destination = resolve_destination("example.com")?;
//! let prober = RawSocketProber::new(&config, interrupt.clone());
//! let enricher = WhoisClient::new(&config);
//! let trace = Trace::new(prober, enricher, destination, config.max_hops);
//! for hop in trace.with_interrupt(interrupt) {
//!     println!("{:?}", hop?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod icmp;
pub mod interrupt;
pub mod probe;
pub mod report;
pub mod resolve;
pub mod trace;

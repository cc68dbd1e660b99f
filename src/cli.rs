use clap::Parser;

use crate::config::DEFAULT_MAX_HOPS;

#[derive(Parser, Debug)]
#[command(
    name = "tracert",
    author,
    about = "Trace the route to a host with ICMP echo probes."
)]
pub struct Args {
    /// Destination address
    pub destination: String,

    /// Maximum hops number
    #[arg(
        short = 'm',
        long = "max_hops",
        default_value_t = DEFAULT_MAX_HOPS,
        value_parser = clap::value_parser!(u8).range(1..)
    )]
    pub max_hops: u8,
}

use std::time::Duration;

use crate::cli::Args;

pub const DEFAULT_MAX_HOPS: u8 = 30;
/// How long a hop may stay silent before it is reported unanswered.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(2);
/// Receive slice between interrupt checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Local port the receive socket is bound to.
pub const DEFAULT_LISTEN_PORT: u16 = 33434;
pub const DEFAULT_WHOIS_SERVER: &str = "whois.iana.org:43";
pub const DEFAULT_WHOIS_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variable holding the `tracing` filter directives.
pub const LOG_ENV: &str = "TRACERT_LOG";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub destination: String,
    pub max_hops: u8,
    pub recv_timeout: Duration,
    pub poll_interval: Duration,
    pub listen_port: u16,
    pub whois_server: String,
    pub whois_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destination: String::new(),
            max_hops: DEFAULT_MAX_HOPS,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            listen_port: DEFAULT_LISTEN_PORT,
            whois_server: DEFAULT_WHOIS_SERVER.to_string(),
            whois_timeout: DEFAULT_WHOIS_TIMEOUT,
        }
    }
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            destination: args.destination.clone(),
            max_hops: args.max_hops,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_args() {
        let args = Args::try_parse_from(["tracert", "-m", "7", "example.com"]).unwrap();
        let config = Config::from(&args);
        assert_eq!(config.destination, "example.com");
        assert_eq!(config.max_hops, 7);
        assert_eq!(config.recv_timeout, Duration::from_secs(2));
        assert_eq!(config.listen_port, 33434);
    }
}

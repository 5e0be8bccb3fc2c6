//! Command-line and environment configuration for the `tether` binary.

use std::net::SocketAddr;

use clap::Parser;

use tether_core::{BackendId, KeyMode, StrategyKind, Topology, TopologyError, DEFAULT_REPLICAS};

/// Tether - a TCP load balancer with runtime-switchable routing strategies.
#[derive(Debug, Parser)]
#[command(name = "tether")]
#[command(version)]
#[command(about = "TCP load balancer that reports key churn on topology and strategy changes")]
pub struct ProxyConfig {
    /// Address to accept client connections on
    #[arg(long, env = "TETHER_LISTEN", default_value = "0.0.0.0:9090")]
    pub listen: SocketAddr,

    /// Seed backend as host:port (repeatable)
    #[arg(
        long = "backend",
        env = "TETHER_BACKENDS",
        value_delimiter = ',',
        default_values_t = ProxyConfig::seed_backends()
    )]
    pub backends: Vec<BackendId>,

    /// Initial strategy: round-robin, simple-hash, consistent-hash or static
    #[arg(long, env = "TETHER_STRATEGY", default_value_t = StrategyKind::ConsistentHash)]
    pub strategy: StrategyKind,

    /// Virtual replicas per backend on the consistent hashing ring
    #[arg(
        long,
        env = "TETHER_REPLICAS",
        default_value_t = DEFAULT_REPLICAS,
        value_parser = parse_replicas
    )]
    pub replicas: usize,

    /// Routing key per connection: random (a fresh UUID) or client-ip
    #[arg(long, env = "TETHER_KEY_MODE", default_value_t = KeyMode::Random)]
    pub key_mode: KeyMode,

    /// Upper bound on concurrently relayed connections (unbounded if unset)
    #[arg(long, env = "TETHER_MAX_CONNECTIONS")]
    pub max_connections: Option<usize>,

    /// Log filter directive, overridden by RUST_LOG
    #[arg(long, env = "TETHER_LOG", default_value = "info")]
    pub log_level: String,

    /// Do not read operator commands from stdin
    #[arg(long, env = "TETHER_NO_CONSOLE")]
    pub no_console: bool,
}

impl ProxyConfig {
    /// The four local demo backends, `localhost:8081` to `localhost:8084`.
    pub fn seed_backends() -> Vec<BackendId> {
        (8081..=8084).map(BackendId::localhost).collect()
    }

    /// Build the initial topology from the configured backends.
    pub fn topology(&self) -> Result<Topology, TopologyError> {
        Topology::new(self.backends.iter().cloned())
    }
}

fn parse_replicas(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("at least one replica per backend is required".to_string()),
        Ok(n) => Ok(n),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_demo_setup() {
        let config = ProxyConfig::try_parse_from(["tether"]).unwrap();
        assert_eq!(config.listen, "0.0.0.0:9090".parse::<SocketAddr>().unwrap());
        assert_eq!(config.backends, ProxyConfig::seed_backends());
        assert_eq!(config.strategy, StrategyKind::ConsistentHash);
        assert_eq!(config.replicas, 64);
        assert_eq!(config.key_mode, KeyMode::Random);
        assert_eq!(config.max_connections, None);
        assert!(!config.no_console);
    }

    #[test]
    fn parses_flags() {
        let config = ProxyConfig::try_parse_from([
            "tether",
            "--listen",
            "127.0.0.1:7000",
            "--backend",
            "10.0.0.1:80",
            "--backend",
            "10.0.0.2:80",
            "--strategy",
            "rr",
            "--key-mode",
            "client-ip",
            "--max-connections",
            "128",
            "--no-console",
        ])
        .unwrap();
        assert_eq!(
            config.backends,
            vec![BackendId::new("10.0.0.1", 80), BackendId::new("10.0.0.2", 80)]
        );
        assert_eq!(config.strategy, StrategyKind::RoundRobin);
        assert_eq!(config.key_mode, KeyMode::ClientIp);
        assert_eq!(config.max_connections, Some(128));
        assert!(config.no_console);
        assert_eq!(config.topology().unwrap().len(), 2);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ProxyConfig::try_parse_from(["tether", "--replicas", "0"]).is_err());
        assert!(ProxyConfig::try_parse_from(["tether", "--strategy", "weighted"]).is_err());
        assert!(ProxyConfig::try_parse_from(["tether", "--backend", "nohost"]).is_err());
    }

    #[test]
    fn duplicate_backends_fail_topology_construction() {
        let config = ProxyConfig::try_parse_from([
            "tether",
            "--backend",
            "localhost:8081",
            "--backend",
            "localhost:8081",
        ])
        .unwrap();
        assert!(config.topology().is_err());
    }
}

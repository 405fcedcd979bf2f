//! Configuration Module
//!
//! Command-line flags, each with an environment variable fallback.

use clap::Parser;

use crate::cache::DEFAULT_TTL_SECS;

/// Command-line arguments for the caching proxy binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "caching_proxy", version, about = "Caching Proxy Server")]
pub struct CliArgs {
    /// The port the server will listen on
    #[arg(long, env = "PROXY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// The origin server to forward requests to
    #[arg(
        long,
        env = "PROXY_ORIGIN",
        value_name = "URL",
        required_unless_present = "clear_cache"
    )]
    pub origin: Option<String>,

    /// Clear the cache and exit without starting the listener
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub clear_cache: bool,

    /// Interface to bind
    #[arg(long, env = "PROXY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Seconds a cached response stays fresh
    #[arg(long, env = "PROXY_CACHE_TTL", value_name = "SECONDS", default_value_t = DEFAULT_TTL_SECS)]
    pub cache_ttl: u64,

    /// Seconds between expired-entry sweeps (0 disables the sweeper)
    #[arg(long, env = "PROXY_CLEANUP_INTERVAL", value_name = "SECONDS", default_value_t = 60)]
    pub cleanup_interval: u64,

    /// Abort origin requests after this many seconds (no limit when unset)
    #[arg(long, env = "PROXY_ORIGIN_TIMEOUT", value_name = "SECONDS")]
    pub origin_timeout: Option<u64>,
}

/// Server configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind
    pub host: String,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the upstream server, without a trailing slash
    pub origin: String,
    /// Clear-and-exit mode
    pub clear_cache: bool,
    /// TTL in seconds applied to every cached response
    pub cache_ttl: u64,
    /// Background cleanup task interval in seconds, 0 = disabled
    pub cleanup_interval: u64,
    /// Optional origin request timeout in seconds
    pub origin_timeout: Option<u64>,
}

impl Config {
    /// Parses the process arguments.
    pub fn from_cli() -> Self {
        Self::from(CliArgs::parse())
    }

    /// Validates the configuration
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.clear_cache {
            return None;
        }
        if self.origin.is_empty() {
            return Some("Origin cannot be empty".to_string());
        }
        if !(self.origin.starts_with("http://") || self.origin.starts_with("https://")) {
            return Some(format!(
                "Origin must be an http:// or https:// URL, got '{}'",
                self.origin
            ));
        }
        if self.cache_ttl == 0 {
            return Some("Cache TTL must be at least one second".to_string());
        }
        None
    }
}

impl From<CliArgs> for Config {
    fn from(args: CliArgs) -> Self {
        let origin = args
            .origin
            .map(|origin| origin.trim_end_matches('/').to_string())
            .unwrap_or_default();

        Self {
            host: args.host,
            server_port: args.port,
            origin,
            clear_cache: args.clear_cache,
            cache_ttl: args.cache_ttl,
            cleanup_interval: args.cleanup_interval,
            origin_timeout: args.origin_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            server_port: 3000,
            origin: String::new(),
            clear_cache: false,
            cache_ttl: DEFAULT_TTL_SECS,
            cleanup_interval: 60,
            origin_timeout: None,
        }
    }
}

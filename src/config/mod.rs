//! Command-line configuration.
//!
//! The echo server takes a single option, the port to listen on. Log
//! verbosity is controlled separately through `RUST_LOG`.

use clap::Parser;

/// Port used when `--port` is not given.
pub const DEFAULT_PORT: u16 = 8124;

/// Address the listener binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Command-line arguments for `echo-server`.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "echo-server", version, about = "Configurable HTTP echo server", long_about = None)]
pub struct Config {
    /// Port to run the server on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl Config {
    /// Returns the `host:port` string the server should bind to.
    pub fn bind_address(&self) -> String {
        format!("{DEFAULT_HOST}:{}", self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_8124() {
        let config = Config::try_parse_from(["echo-server"]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_address(), "127.0.0.1:8124");
    }

    #[test]
    fn long_and_short_port() {
        let long = Config::try_parse_from(["echo-server", "--port", "9000"]).unwrap();
        let short = Config::try_parse_from(["echo-server", "-p", "9001"]).unwrap();
        assert_eq!(long.port, 9000);
        assert_eq!(short.port, 9001);
    }

    #[test]
    fn rejects_unknown_flags_and_bad_ports() {
        assert!(Config::try_parse_from(["echo-server", "--host", "0.0.0.0"]).is_err());
        assert!(Config::try_parse_from(["echo-server", "--port", "70000"]).is_err());
    }
}

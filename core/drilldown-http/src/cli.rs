//! FILENAME: core/drilldown-http/src/cli.rs

use std::path::PathBuf;

use clap::Parser;

use crate::config::ServerConfig;
use crate::error::ConfigError;

/// Command-line arguments for drilldown-server
#[derive(Parser, Debug)]
#[command(name = "drilldown-server", version, about = "Serve a flat data file for drill-down browsing")]
pub struct Args {
    /// JSON config file. Flags below override its values
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Socket address to listen on, e.g. 0.0.0.0:8080
    #[arg(long = "bind")]
    pub bind: Option<String>,

    /// Comma-separated data file
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Log at debug level and echo log lines to stderr
    #[arg(long = "verbose", action)]
    pub verbose: bool,
}

impl Args {
    /// The config file (or defaults) with every given flag applied.
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(data) = &self.data {
            config.data_file = data.clone();
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bind": "0.0.0.0:80", "data_file": "a.txt", "headers": ["A"]}}"#).unwrap();

        let args = Args::parse_from([
            "drilldown-server",
            "--config",
            file.path().to_str().unwrap(),
            "--data",
            "b.txt",
            "--verbose",
        ]);
        let config = args.server_config().unwrap();

        assert_eq!(config.bind, "0.0.0.0:80");
        assert_eq!(config.data_file, PathBuf::from("b.txt"));
        assert_eq!(config.headers, vec!["A"]);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_no_config_file_uses_defaults() {
        let args = Args::parse_from(["drilldown-server", "--bind", "127.0.0.1:9001"]);
        let config = args.server_config().unwrap();
        assert_eq!(config.bind, "127.0.0.1:9001");
        assert_eq!(config.log_level, "info");
        assert!(!args.verbose);
    }
}

//! Clap derive structures for the `mdmhook` binary.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// mdmhook -- MicroMDM webhook relay
#[derive(Debug, Parser)]
#[command(
    name = "mdmhook",
    version,
    about = "Relay MicroMDM webhook events and request app inventories from enrolled devices",
    long_about = "Receives MicroMDM webhook events on POST /webhook, tracks each device's\n\
        enrollment state in memory, and asks the server for an\n\
        InstalledApplicationList every time a device sends a token update."
)]
pub struct Cli {
    /// Port for the webhook server to listen on [default: 80]
    #[arg(long, env = "MDMHOOK_PORT")]
    pub port: Option<u16>,

    /// Address to bind [default: 0.0.0.0]
    #[arg(long, env = "MDMHOOK_LISTEN")]
    pub listen: Option<IpAddr>,

    /// Public HTTPS URL of your MicroMDM server
    #[arg(long, env = "MDMHOOK_SERVER_URL")]
    pub server_url: Option<String>,

    /// API token for your MicroMDM server
    #[arg(long, env = "MDMHOOK_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Timeout in seconds for command submission [default: 30]
    #[arg(long, env = "MDMHOOK_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Accept self-signed TLS certificates from the MicroMDM server
    #[arg(long, short = 'k', env = "MDMHOOK_INSECURE")]
    pub insecure: bool,

    /// PEM file with a CA certificate for the MicroMDM server
    #[arg(long, env = "MDMHOOK_CA_CERT")]
    pub ca_cert: Option<PathBuf>,

    /// TOML config file; flags and environment variables override it
    #[arg(long, short = 'c', env = "MDMHOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, env = "MDMHOOK_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_long_flags() {
        let cli = Cli::try_parse_from([
            "mdmhook",
            "--port",
            "8080",
            "--server-url",
            "https://mdm.example.com/",
            "--api-token",
            "secret",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.server_url.as_deref(), Some("https://mdm.example.com/"));
        assert_eq!(cli.api_token.as_deref(), Some("secret"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Text);
    }
}

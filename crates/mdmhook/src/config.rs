//! Configuration resolution: TOML file (optional) < environment < flags.
//!
//! Clap already folds environment variables into the flags, so the file
//! is the only extra layer. Required values are checked after merging.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Format, Toml},
};
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use mdmhook_api::{TlsMode, TransportConfig};

use crate::cli::Cli;
use crate::error::RelayError;

pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Keys accepted in the TOML config file. All optional.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub listen: Option<IpAddr>,
    pub server_url: Option<String>,
    pub api_token: Option<String>,
    pub timeout: Option<u64>,
    pub insecure: Option<bool>,
    pub ca_cert: Option<PathBuf>,
}

/// Everything the server needs to start.
#[derive(Debug)]
pub struct RelayConfig {
    pub listen: SocketAddr,
    pub server_url: Url,
    pub api_token: SecretString,
    pub transport: TransportConfig,
}

/// Load the TOML config file at `path`.
pub fn load_file(path: &Path) -> Result<FileConfig, RelayError> {
    if !path.is_file() {
        return Err(RelayError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }

    Figment::new()
        .merge(Toml::file(path))
        .extract()
        .map_err(|e| RelayError::Config {
            path: path.display().to_string(),
            source: Box::new(e),
        })
}

/// Resolve the final configuration from flags and the optional file.
pub fn resolve(cli: &Cli) -> Result<RelayConfig, RelayError> {
    let file = match cli.config {
        Some(ref path) => load_file(path)?,
        None => FileConfig::default(),
    };
    resolve_with(cli, file)
}

/// Merge `cli` over `file` and validate the result.
pub fn resolve_with(cli: &Cli, file: FileConfig) -> Result<RelayConfig, RelayError> {
    // 1. Required: server URL and API token (flag > env > file)
    let server_url = non_empty(cli.server_url.clone()).or(non_empty(file.server_url)).ok_or(
        RelayError::MissingParameter {
            flag: "server-url",
            env: "MDMHOOK_SERVER_URL",
            key: "server_url",
        },
    )?;
    let api_token = non_empty(cli.api_token.clone()).or(non_empty(file.api_token)).ok_or(
        RelayError::MissingParameter {
            flag: "api-token",
            env: "MDMHOOK_API_TOKEN",
            key: "api_token",
        },
    )?;
    let server_url = parse_server_url(&server_url)?;

    // 2. Listen address
    let port = cli.port.or(file.port).unwrap_or(DEFAULT_PORT);
    let ip = cli
        .listen
        .or(file.listen)
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    // 3. Transport
    let timeout = cli.timeout.or(file.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout == 0 {
        return Err(RelayError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let tls = if cli.insecure || file.insecure.unwrap_or(false) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ca_path) = cli.ca_cert.clone().or(file.ca_cert) {
        TlsMode::CustomCa(ca_path)
    } else {
        TlsMode::System
    };

    Ok(RelayConfig {
        listen: SocketAddr::new(ip, port),
        server_url,
        api_token: SecretString::from(api_token),
        transport: TransportConfig {
            tls,
            timeout: Duration::from_secs(timeout),
        },
    })
}

/// Parse the server URL, dropping trailing slashes.
fn parse_server_url(raw: &str) -> Result<Url, RelayError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|e| RelayError::Validation {
        field: "server-url".into(),
        reason: format!("invalid URL {raw:?}: {e}"),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RelayError::Validation {
            field: "server-url".into(),
            reason: format!("expected an http(s) URL, got scheme '{}'", url.scheme()),
        });
    }

    Ok(url)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["mdmhook"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn applies_defaults() {
        let config = resolve_with(
            &cli(&["--server-url", "https://mdm.example.com/", "--api-token", "t"]),
            FileConfig::default(),
        )
        .unwrap();

        assert_eq!(config.listen, "0.0.0.0:80".parse::<SocketAddr>().unwrap());
        assert_eq!(config.server_url.as_str(), "https://mdm.example.com/");
        assert_eq!(config.api_token.expose_secret(), "t");
        assert_eq!(config.transport.timeout, Duration::from_secs(30));
        assert!(matches!(config.transport.tls, TlsMode::System));
    }

    #[test]
    fn strips_trailing_slashes_from_path() {
        let config = resolve_with(
            &cli(&["--server-url", "https://example.com/mdm//", "--api-token", "t"]),
            FileConfig::default(),
        )
        .unwrap();

        assert_eq!(config.server_url.as_str(), "https://example.com/mdm");
    }

    #[test]
    fn missing_server_url_is_reported() {
        let err = resolve_with(&cli(&["--api-token", "t"]), FileConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            RelayError::MissingParameter {
                flag: "server-url",
                ..
            }
        ));
    }

    #[test]
    fn empty_api_token_counts_as_missing() {
        let err = resolve_with(
            &cli(&["--server-url", "https://mdm.example.com", "--api-token", ""]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RelayError::MissingParameter {
                flag: "api-token",
                ..
            }
        ));
    }

    #[test]
    fn missing_token_is_reported_before_url_validation() {
        let err = resolve_with(&cli(&["--server-url", "not a url"]), FileConfig::default())
            .unwrap_err();
        assert!(err.shows_usage());
        assert!(matches!(
            err,
            RelayError::MissingParameter {
                flag: "api-token",
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_http_url() {
        let err = resolve_with(
            &cli(&["--server-url", "ftp://mdm.example.com", "--api-token", "t"]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RelayError::Validation { .. }));
    }

    #[test]
    fn flags_override_file() {
        let file = FileConfig {
            port: Some(9000),
            server_url: Some("https://file.example.com".into()),
            api_token: Some("from-file".into()),
            insecure: Some(true),
            ..FileConfig::default()
        };

        let config = resolve_with(&cli(&["--port", "8443", "--api-token", "from-flag"]), file)
            .unwrap();

        assert_eq!(config.listen.port(), 8443);
        assert_eq!(config.server_url.host_str(), Some("file.example.com"));
        assert_eq!(config.api_token.expose_secret(), "from-flag");
        assert!(matches!(config.transport.tls, TlsMode::DangerAcceptInvalid));
    }

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 8080\nlisten = \"127.0.0.1\"\nserver_url = \"https://mdm.example.com\"\n\
             api_token = \"abc\"\ntimeout = 5"
        )
        .unwrap();

        let loaded = load_file(file.path()).unwrap();

        assert_eq!(loaded.port, Some(8080));
        assert_eq!(loaded.listen, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert_eq!(loaded.api_token.as_deref(), Some("abc"));
        assert_eq!(loaded.timeout, Some(5));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_file(Path::new("/nonexistent/mdmhook.toml")).unwrap_err();
        assert!(matches!(err, RelayError::ConfigNotFound { .. }));
    }
}

// Command submission client
//
// Wraps `reqwest::Client` with the management server's URL layout and
// HTTP Basic authentication. One call, one command: there is no queue
// and no retry here. Callers decide what a failure means.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use url::Url;

use crate::command::Command;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Username the management server expects alongside the API key.
pub const API_USERNAME: &str = "micromdm";

/// Path of the command submission endpoint, relative to the server root.
const COMMANDS_PATH: &str = "v1/commands";

/// HTTP client for the management server's command API.
pub struct CommandClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    timeout_secs: Option<u64>,
}

impl std::fmt::Debug for CommandClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CommandClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the server root (e.g. `https://mdm.example.com`).
    /// Trailing slashes are ignored.
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::with_client(http, base_url, api_key)?;
        client.timeout_secs = Some(transport.timeout.as_secs());
        Ok(client)
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        api_key: SecretString,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        Ok(Self {
            http,
            base_url,
            api_key,
            timeout_secs: None,
        })
    }

    /// The server root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of the command submission endpoint.
    pub fn commands_url(&self) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{COMMANDS_PATH}"))?)
    }

    /// Submit one command.
    ///
    /// `POST {base}/v1/commands` with Basic auth and a
    /// `{"udid", "request_type"}` JSON body.
    pub async fn send_command(&self, command: &Command) -> Result<(), Error> {
        let url = self.commands_url()?;
        debug!(
            udid = %command.udid,
            request_type = %command.request_type,
            "POST {}",
            url
        );

        let resp = self
            .http
            .post(url)
            .basic_auth(API_USERNAME, Some(self.api_key.expose_secret()))
            .json(command)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication {
                message: format!("API key rejected (HTTP {status})"),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "command submission rejected");
            return Err(Error::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        debug!(status = status.as_u16(), "command queued");
        Ok(())
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        match self.timeout_secs {
            Some(timeout_secs) if err.is_timeout() => Error::Timeout { timeout_secs },
            _ => Error::Transport(err),
        }
    }
}

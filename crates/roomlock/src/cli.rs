//! Clap derive structures for the `roomlock` CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

use roomlock_api::{ClientIdentity, Error, ServerTrust, TransportConfig};

/// roomlock -- step-by-step device unlock from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "roomlock",
    version,
    about = "Unlock shared devices behind an mTLS backend",
    long_about = "Fetches the building/level/device catalog from the unlock backend\n\
        over mutual TLS and walks through the four-step selection."
)]
pub struct Cli {
    /// Backend base URL
    #[arg(long, short = 'b', env = "ROOMLOCK_BACKEND")]
    pub backend: Url,

    /// Client identity PEM bundle (certificate chain + private key)
    #[arg(long, short = 'i', env = "ROOMLOCK_IDENTITY")]
    pub identity: Option<PathBuf>,

    /// Verify the server against this CA bundle instead of accepting
    /// whatever chain it presents
    #[arg(long, env = "ROOMLOCK_CA_CERT")]
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, env = "ROOMLOCK_TIMEOUT", default_value = "30")]
    pub timeout: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Translate CLI flags into a transport configuration.
    pub fn transport(&self) -> Result<TransportConfig, Error> {
        let identity = self
            .identity
            .as_deref()
            .map(ClientIdentity::from_pem_file)
            .transpose()?;

        let trust = match &self.ca_cert {
            Some(path) => ServerTrust::CustomCa(path.clone()),
            None => ServerTrust::AcceptPresented,
        };

        Ok(TransportConfig {
            identity,
            trust,
            timeout: Duration::from_secs(self.timeout),
        })
    }

    /// Tracing filter directive for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

// ── Catalog client ──
//
// One job: fetch the device list over the mTLS transport and interpret
// the HTTP status. No retries -- retry policy, if any, belongs to the
// caller, and every failure leaves the caller's previous catalog
// usable.

use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::catalog::Catalog;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Fixed backend endpoint for the device list.
const DEVICE_LIST_PATH: &str = "api/atvunlock/list";

/// HTTP client for the device-unlock backend.
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// The `base_url` should be the backend root
    /// (e.g. `https://192.168.26.43`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Use this when the transport is constructed elsewhere, or in tests
    /// against a plain-HTTP mock server.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the device catalog.
    ///
    /// Single GET against the fixed list endpoint:
    /// - transport failure -> [`Error::Transport`]
    /// - HTTP 200 -> decode per the catalog contract
    /// - any other status -> [`Error::UnexpectedStatus`] (the endpoint
    ///   defines no structured error body)
    pub async fn fetch_catalog(&self) -> Result<Catalog, Error> {
        let url = self.base_url.join(DEVICE_LIST_PATH)?;
        debug!(%url, "fetching device catalog");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        let catalog = Catalog::from_slice(&body)?;
        debug!(buildings = catalog.buildings.len(), "device catalog updated");
        Ok(catalog)
    }
}

use thiserror::Error;

/// Top-level error type for the `roomlock-api` crate.
///
/// Covers every failure mode of a catalog fetch: transport, TLS setup,
/// HTTP status interpretation, and payload decoding. `roomlock-core`
/// maps these into user-facing diagnostics. None of these are fatal to
/// the caller -- a failed fetch leaves the previously loaded catalog
/// untouched.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure,
    /// handshake failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration error (bad identity PEM, unreadable CA file).
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend contract ────────────────────────────────────────────
    /// The backend answered with a status other than 200. The device
    /// list endpoint defines no structured error body, so the code is
    /// all we get.
    #[error("Unexpected backend status: HTTP {0}")]
    UnexpectedStatus(u16),

    /// Catalog payload failed to decode, with the raw body for debugging.
    #[error("Malformed catalog payload: {message}")]
    MalformedCatalog { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Retry policy itself belongs to the caller; this crate performs
    /// a single attempt per [`fetch_catalog`](crate::CatalogClient::fetch_catalog).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::UnexpectedStatus(code) => *code >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the backend spoke but the payload was unusable.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedCatalog { .. })
    }
}

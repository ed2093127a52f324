// ── Mutual-TLS transport configuration ──
//
// Builds `reqwest::Client` instances carrying the client identity and
// the server-trust policy. The identity is presented on the client
// certificate leg of every handshake; server trust is resolved by the
// policy in `trust.rs`. Connection pooling inside reqwest is an
// implementation detail, not part of the contract.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::Error;
use crate::trust::PresentedTrustVerifier;

const USER_AGENT: &str = concat!("roomlock/", env!("CARGO_PKG_VERSION"));

/// The client's mTLS identity: certificate chain plus private key.
///
/// Opaque to the rest of the crate -- it is loaded once, handed to the
/// TLS stack at client construction, and scoped to that client's
/// sessions. The key material never appears in `Debug` output.
pub struct ClientIdentity {
    cert_chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    /// Load an identity from a PEM bundle (certificate chain + key in
    /// one file).
    pub fn from_pem_file(path: &Path) -> Result<Self, Error> {
        let cert_chain = CertificateDer::pem_file_iter(path)
            .map_err(|e| Error::Tls(format!("failed to read identity PEM: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::Tls(format!("invalid certificate in identity PEM: {e}")))?;
        let key = PrivateKeyDer::from_pem_file(path)
            .map_err(|e| Error::Tls(format!("no private key in identity PEM: {e}")))?;
        Self::from_parts(cert_chain, key)
    }

    /// Build an identity from an in-memory PEM bundle.
    pub fn from_pem(pem: &[u8]) -> Result<Self, Error> {
        let cert_chain = CertificateDer::pem_slice_iter(pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::Tls(format!("invalid certificate in identity PEM: {e}")))?;
        let key = PrivateKeyDer::from_pem_slice(pem)
            .map_err(|e| Error::Tls(format!("no private key in identity PEM: {e}")))?;
        Self::from_parts(cert_chain, key)
    }

    fn from_parts(
        cert_chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Self, Error> {
        if cert_chain.is_empty() {
            return Err(Error::Tls("identity PEM contains no certificates".into()));
        }
        Ok(Self { cert_chain, key })
    }
}

impl Clone for ClientIdentity {
    fn clone(&self) -> Self {
        Self {
            cert_chain: self.cert_chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_chain", &self.cert_chain.len())
            .field("key", &"<private>")
            .finish()
    }
}

/// Server-trust policy for the handshake.
#[derive(Debug, Clone, Default)]
pub enum ServerTrust {
    /// Accept whatever chain the server presents; cancel the handshake
    /// when none is presented. The deployed default -- see the security
    /// note in [`trust`](crate::trust).
    #[default]
    AcceptPresented,
    /// Verify the server against a custom CA bundle from the given PEM
    /// file.
    CustomCa(PathBuf),
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub identity: Option<ClientIdentity>,
    pub trust: ServerTrust,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            identity: None,
            trust: ServerTrust::AcceptPresented,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let tls = self.build_tls()?;
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .use_preconfigured_tls(tls)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Assemble the rustls config: server-trust leg per `trust`, client
    /// certificate leg per `identity`, anything else left to rustls
    /// defaults.
    fn build_tls(&self) -> Result<rustls::ClientConfig, Error> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Tls(format!("unsupported protocol versions: {e}")))?;

        let builder = match &self.trust {
            ServerTrust::AcceptPresented => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(PresentedTrustVerifier::new(provider))),
            ServerTrust::CustomCa(path) => {
                let mut roots = rustls::RootCertStore::empty();
                for cert in CertificateDer::pem_file_iter(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?
                {
                    let cert =
                        cert.map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                    roots
                        .add(cert)
                        .map_err(|e| Error::Tls(format!("unusable CA cert: {e}")))?;
                }
                builder.with_root_certificates(roots)
            }
        };

        match &self.identity {
            Some(identity) => builder
                .with_client_auth_cert(identity.cert_chain.clone(), identity.key.clone_key())
                .map_err(|e| Error::Tls(format!("invalid client identity: {e}"))),
            None => Ok(builder.with_no_client_auth()),
        }
    }
}

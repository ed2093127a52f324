// ── Server-trust decision logic ──
//
// The backend sits behind mutual TLS with a certificate chain that is
// not anchored in the public web PKI. The deployed policy is: use
// whatever trust material the server presents during the handshake as
// the credential, and cancel the handshake outright if none is
// presented. There is no fallback to default handling on the server
// leg.
//
// SECURITY NOTE: `PresentedTrustVerifier` performs no independent chain
// or pinning validation -- any server that presents *a* certificate is
// accepted. This mirrors the deployed behavior and is a known weak
// point; deployments that can ship a CA bundle should prefer
// `ServerTrust::CustomCa` instead.

use std::sync::Arc;

use rustls::DigitallySignedStruct;
use rustls::SignatureScheme;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

/// Certificate verifier implementing the accept-presented policy.
///
/// Handshake signatures are still verified against the presented
/// certificate via the crypto provider; only the chain-of-trust
/// decision is short-circuited.
#[derive(Debug)]
pub struct PresentedTrustVerifier {
    provider: Arc<CryptoProvider>,
}

impl PresentedTrustVerifier {
    pub fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }

    /// The trust decision for one handshake's presented chain.
    ///
    /// A non-empty chain is accepted as-is; an empty one cancels the
    /// handshake. Never falls through to default verification.
    fn evaluate(presented: &[CertificateDer<'_>]) -> Result<ServerCertVerified, rustls::Error> {
        if presented.is_empty() {
            return Err(rustls::Error::NoCertificatesPresented);
        }
        Ok(ServerCertVerified::assertion())
    }
}

impl ServerCertVerifier for PresentedTrustVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Self::evaluate(std::slice::from_ref(end_entity))
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn empty_chain_cancels_handshake() {
        let result = PresentedTrustVerifier::evaluate(&[]);
        assert!(
            matches!(result, Err(rustls::Error::NoCertificatesPresented)),
            "an absent chain must cancel, never fall through: {result:?}"
        );
    }

    #[test]
    fn presented_chain_is_accepted_unvalidated() {
        // Arbitrary DER bytes -- the policy accepts without inspecting.
        let cert = CertificateDer::from(vec![0x30, 0x03, 0x02, 0x01, 0x01]);
        assert!(PresentedTrustVerifier::evaluate(std::slice::from_ref(&cert)).is_ok());
    }

    #[test]
    fn verify_schemes_come_from_provider() {
        let verifier = PresentedTrustVerifier::new(Arc::new(rustls::crypto::ring::default_provider()));
        assert!(!verifier.supported_verify_schemes().is_empty());
    }
}

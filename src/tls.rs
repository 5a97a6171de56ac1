//! Certificate trust hook.
//!
//! Three modes, chosen per [`crate::config::TlsConfig`]: platform validation
//! against the default `webpki-roots` trust anchors (plus an optional extra
//! CA file) when nothing else is configured; a caller-supplied predicate
//! that decides trust itself; or, for talking to a known self-signed
//! endpoint during development, skipping chain and hostname validation
//! entirely.

use crate::config::TlsConfig;
use crate::error::Error;
use pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{ring as ring_provider, CryptoProvider};
use rustls::{ClientConfig as RustlsClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio_rustls::TlsConnector;

/// Evaluated against the peer's certificate chain and the hostname this
/// client connected to. Returning `false` aborts the connection with a
/// cert-invalid error.
pub type TrustPredicate =
    Arc<dyn Fn(&[CertificateDer<'static>], &ServerName<'static>) -> bool + Send + Sync>;

#[derive(Debug)]
struct AcceptAllVerifier {
    supported_schemes: Vec<SignatureScheme>,
}

impl ServerCertVerifier for AcceptAllVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported_schemes.clone()
    }
}

struct PredicateVerifier {
    predicate: TrustPredicate,
    supported_schemes: Vec<SignatureScheme>,
}

impl std::fmt::Debug for PredicateVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateVerifier").finish()
    }
}

impl ServerCertVerifier for PredicateVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let mut chain = Vec::with_capacity(intermediates.len() + 1);
        chain.push(end_entity.clone().into_owned());
        chain.extend(intermediates.iter().map(|cert| cert.clone().into_owned()));

        if (self.predicate)(&chain, &server_name.to_owned()) {
            Ok(ServerCertVerified::assertion())
        } else {
            Err(rustls::Error::General(
                "certificate rejected by trust predicate".to_string(),
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &ring_provider::default_provider().signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &ring_provider::default_provider().signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported_schemes.clone()
    }
}

fn build_root_store(ca_file: Option<&str>) -> Result<RootCertStore, Error> {
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(ca_file) = ca_file {
        let mut reader = BufReader::new(File::open(ca_file)?);
        for cert in rustls_pemfile::certs(&mut reader) {
            root_store
                .add(cert?)
                .map_err(|source| Error::TLSError { source })?;
        }
    }

    Ok(root_store)
}

fn build_crypto_provider(cipher_suites: &[rustls::CipherSuite]) -> CryptoProvider {
    let mut provider = ring_provider::default_provider();
    if !cipher_suites.is_empty() {
        provider
            .cipher_suites
            .retain(|suite| cipher_suites.contains(&suite.suite()));
    }
    provider
}

/// Builds the `TlsConnector` this client hands its TCP stream to. `host` is
/// the hostname the client is dialing, used both for the default
/// hostname-matching verifier and passed through to a custom predicate.
pub fn build_connector(
    tls_config: &TlsConfig,
    trust_predicate: Option<TrustPredicate>,
) -> Result<TlsConnector, Error> {
    let provider = Arc::new(build_crypto_provider(&tls_config.cipher_suites));
    let supported_schemes = provider.signature_verification_algorithms.supported_schemes();

    let verifier: Arc<dyn ServerCertVerifier> = if tls_config.accept_self_signed {
        Arc::new(AcceptAllVerifier { supported_schemes })
    } else if let Some(predicate) = trust_predicate {
        Arc::new(PredicateVerifier {
            predicate,
            supported_schemes,
        })
    } else {
        let root_store = build_root_store(tls_config.ca_file.as_deref())?;
        WebPkiServerVerifier::builder_with_provider(Arc::new(root_store), provider.clone())
            .build()
            .map_err(|source| Error::TlsConfigError(source.to_string()))?
    };

    let config = RustlsClientConfig::builder_with_provider(provider)
        .with_protocol_versions(rustls::DEFAULT_VERSIONS)
        .map_err(|source| Error::TLSError { source })?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_trusts_platform_roots_without_a_predicate() {
        let connector = build_connector(&TlsConfig::default(), None);
        assert!(connector.is_ok());
    }

    #[test]
    fn self_signed_flag_builds_without_a_root_store() {
        let config = TlsConfig {
            accept_self_signed: true,
            ..Default::default()
        };
        assert!(build_connector(&config, None).is_ok());
    }
}

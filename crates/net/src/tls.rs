//! rustls client configuration and handshake.

use std::net::TcpStream;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    ClientConfig, ClientConnection, DigitallySignedStruct, KeyLogFile, RootCertStore,
    SignatureScheme, StreamOwned,
};
use tracing::debug;

use crate::NetError;

/// ALPN protocol id for HTTP/2 over TLS.
pub const ALPN_H2: &[u8] = b"h2";

/// Knobs for building a client config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsOptions {
    pub verify_certificates: bool,
    /// Log session secrets to the file named by `SSLKEYLOGFILE`.
    pub keylog: bool,
    /// Offer `h2` via ALPN.
    pub alpn_h2: bool,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify_certificates: true,
            keylog: false,
            alpn_h2: false,
        }
    }
}

pub fn client_config(options: &TlsOptions) -> Result<ClientConfig, rustls::Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder =
        ClientConfig::builder_with_provider(provider.clone()).with_safe_default_protocol_versions()?;

    let mut config = if options.verify_certificates {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(SkipServerVerification(provider)))
            .with_no_client_auth()
    };

    if options.alpn_h2 {
        config.alpn_protocols = vec![ALPN_H2.to_vec()];
    }
    if options.keylog {
        config.key_log = Arc::new(KeyLogFile::new());
    }
    Ok(config)
}

/// Run the TLS handshake over `tcp` with SNI set to `host`.
pub fn connect(
    host: &str,
    mut tcp: TcpStream,
    config: ClientConfig,
) -> Result<StreamOwned<ClientConnection, TcpStream>, NetError> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| NetError::InvalidServerName(host.to_string()))?;
    let mut conn = ClientConnection::new(Arc::new(config), server_name)?;

    while conn.is_handshaking() {
        conn.complete_io(&mut tcp)?;
    }

    debug!(
        version = ?conn.protocol_version(),
        alpn = ?conn.alpn_protocol().map(String::from_utf8_lossy),
        "TLS handshake complete"
    );
    Ok(StreamOwned::new(conn, tcp))
}

/// Accepts any server certificate. Used by `--insecure`.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp: &[u8],
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
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

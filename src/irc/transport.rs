//! IRC connection plumbing — TCP dial, optional TLS wrap, line-oriented I/O.
//!
//! The TLS client configuration is resolved once from [`IrcConfig`] at
//! connect time and never mutated afterwards. Disabling certificate
//! verification swaps in a verifier that accepts anything; the session logs
//! a prominent warning when that path is taken.

use std::sync::Arc;

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info};

use crate::config::IrcConfig;
use crate::error::AppError;

/// Object-safe alias for the plain or TLS-wrapped stream.
trait IrcStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> IrcStream for T {}

/// A connected, line-oriented IRC socket.
pub struct Connection {
    reader: BufReader<ReadHalf<Box<dyn IrcStream>>>,
    writer: WriteHalf<Box<dyn IrcStream>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl Connection {
    /// Dial the configured server, wrapping in TLS when requested.
    pub async fn connect(config: &IrcConfig) -> Result<Self, AppError> {
        let addr = format!("{}:{}", config.server, config.port);
        debug!(%addr, tls = config.tls, "connecting");

        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| AppError::Transport(format!("cannot connect to {addr}: {e}")))?;

        let stream: Box<dyn IrcStream> = if config.tls {
            let connector = tls_connector(config.verify_certificates)?;
            let server_name = ServerName::try_from(config.server.clone())
                .map_err(|_| AppError::Transport(format!("invalid server name: {}", config.server)))?;
            let tls = connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| AppError::Transport(format!("TLS handshake with {addr} failed: {e}")))?;
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        info!(%addr, tls = config.tls, "connected");

        let (read_half, writer) = tokio::io::split(stream);
        Ok(Self { reader: BufReader::new(read_half), writer })
    }

    /// Read the next line, without its CRLF. `None` means the server closed
    /// the connection.
    pub async fn read_line(&mut self) -> Result<Option<String>, AppError> {
        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| AppError::Transport(format!("read failed: {e}")))?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with(['\r', '\n']) {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Send one raw protocol line, appending CRLF.
    pub async fn send_line(&mut self, line: &str) -> Result<(), AppError> {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .map_err(|e| AppError::Transport(format!("write failed: {e}")))
    }

    /// `send(target, text)` — the outbound chat surface.
    pub async fn send_privmsg(&mut self, target: &str, text: &str) -> Result<(), AppError> {
        self.send_line(&format!("PRIVMSG {target} :{text}")).await
    }
}

// ── TLS setup ────────────────────────────────────────────────────────────────

fn tls_connector(verify_certificates: bool) -> Result<TlsConnector, AppError> {
    // Pin the provider explicitly: depending on feature unification more than
    // one rustls backend can be enabled, and `ClientConfig::builder()` then
    // refuses to pick one.
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let builder = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| AppError::Transport(format!("TLS protocol setup failed: {e}")))?;

    let config = if verify_certificates {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerification::new()))
            .with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Certificate verifier that accepts any server certificate.
///
/// Only reachable when `irc.verify_certificates = false`; signature checks
/// still run so the handshake itself stays well-formed.
#[derive(Debug)]
struct NoVerification(rustls::crypto::CryptoProvider);

impl NoVerification {
    fn new() -> Self {
        Self(rustls::crypto::aws_lc_rs::default_provider())
    }
}

impl ServerCertVerifier for NoVerification {
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
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
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
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

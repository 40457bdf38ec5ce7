//! Stream types for IMAP connections.
//!
//! Dials the server (optionally through an HTTP CONNECT proxy), applies
//! implicit TLS or upgrades after STARTTLS, and presents one
//! `AsyncRead + AsyncWrite` stream either way. The TCP dial, proxy
//! handshake, and TLS handshake are all bounded by the account's connect
//! timeout at the call site in the session layer.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::config::AccountConfig;
use crate::{Error, Result};

/// A stream that is either plaintext or TLS.
pub enum ImapStream {
    /// Plaintext TCP stream.
    Plain(TcpStream),
    /// TLS-encrypted stream (boxed to keep the enum small).
    Tls(Box<TlsStream<TcpStream>>),
}

impl ImapStream {
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Upgrades a plaintext stream to TLS (STARTTLS).
    pub async fn upgrade_to_tls(self, host: &str, validate_cert: bool) -> Result<Self> {
        match self {
            Self::Plain(tcp) => {
                let connector = tls_connector(validate_cert);
                let server_name = ServerName::try_from(host.to_string())?;
                let tls = connector.connect(server_name, tcp).await?;
                Ok(Self::Tls(Box::new(tls)))
            }
            Self::Tls(_) => Err(Error::InvalidState("stream is already TLS".to_string())),
        }
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Opens the transport for an account: dial (direct or via proxy), then
/// implicit TLS when the encryption mode asks for it.
pub async fn connect(config: &AccountConfig) -> Result<ImapStream> {
    let tcp = match &config.proxy {
        Some(proxy) => {
            let mut tcp = dial(&proxy.host, proxy.port).await?;
            proxy_tunnel(&mut tcp, &config.host, config.port).await?;
            tcp
        }
        None => dial(&config.host, config.port).await?,
    };

    if config.encryption.is_implicit() {
        let connector = tls_connector(config.validate_cert);
        let server_name = ServerName::try_from(config.host.clone())?;
        let tls = connector.connect(server_name, tcp).await?;
        Ok(ImapStream::Tls(Box::new(tls)))
    } else {
        Ok(ImapStream::Plain(tcp))
    }
}

async fn dial(host: &str, port: u16) -> Result<TcpStream> {
    TcpStream::connect((host, port))
        .await
        .map_err(|e| Error::ConnectionFailed(format!("connect to {host}:{port}: {e}")))
}

/// Establishes an HTTP CONNECT tunnel through an already-dialled proxy.
///
/// The response is read byte-wise up to the blank line so no bytes the
/// server sends after the tunnel opens are buffered away.
async fn proxy_tunnel(tcp: &mut TcpStream, host: &str, port: u16) -> Result<()> {
    let request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n\r\n");
    tcp.write_all(request.as_bytes())
        .await
        .map_err(|e| Error::ConnectionFailed(format!("proxy write: {e}")))?;

    let mut response = Vec::new();
    let mut byte = [0u8; 1];
    while !response.ends_with(b"\r\n\r\n") {
        let n = tokio::io::AsyncReadExt::read(tcp, &mut byte)
            .await
            .map_err(|e| Error::ConnectionFailed(format!("proxy read: {e}")))?;
        if n == 0 {
            return Err(Error::ConnectionFailed(
                "proxy closed during handshake".to_string(),
            ));
        }
        response.push(byte[0]);
        if response.len() > 16 * 1024 {
            return Err(Error::ConnectionFailed(
                "oversized proxy response".to_string(),
            ));
        }
    }

    // "HTTP/1.1 200 Connection established"
    let status_line = String::from_utf8_lossy(
        response.split(|&b| b == b'\n').next().unwrap_or_default(),
    )
    .trim()
    .to_string();
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            Error::ConnectionFailed(format!("malformed proxy response: {status_line}"))
        })?;
    if !(200..300).contains(&status) {
        return Err(Error::ConnectionFailed(format!(
            "proxy refused tunnel: {status_line}"
        )));
    }

    Ok(())
}

/// Builds a TLS connector; certificate verification can be turned off for
/// self-signed bridge setups.
fn tls_connector(validate_cert: bool) -> TlsConnector {
    let config = if validate_cert {
        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth()
    } else {
        rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
            .with_no_client_auth()
    };

    TlsConnector::from(Arc::new(config))
}

/// Certificate verifier that accepts every certificate. Only installed
/// when `validate_cert` is false.
#[derive(Debug)]
struct AcceptAnyCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_connector_builds_both_modes() {
        let _ = tls_connector(true);
        let _ = tls_connector(false);
    }

    #[tokio::test]
    async fn test_proxy_tunnel_handshake() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let n = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            socket
                .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
                .await
                .unwrap();
            request
        });

        let mut tcp = TcpStream::connect(addr).await.unwrap();
        proxy_tunnel(&mut tcp, "imap.example.com", 993).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("CONNECT imap.example.com:993 HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn test_proxy_tunnel_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;
            socket
                .write_all(b"HTTP/1.1 403 Forbidden\r\n\r\n")
                .await
                .unwrap();
        });

        let mut tcp = TcpStream::connect(addr).await.unwrap();
        let result = proxy_tunnel(&mut tcp, "imap.example.com", 993).await;
        assert!(matches!(result, Err(Error::ConnectionFailed(_))));
    }
}

// TLS handshake and leaf-certificate retrieval
// The handshake verifies chain and hostname against the bundled web PKI roots

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::*;

#[derive(Debug, Error)]
pub enum TlsProbeError {
    #[error("Invalid server name: {0}")]
    InvalidServerName(String),

    #[error("Connection failed: {0}")]
    Connect(std::io::Error),

    #[error("Handshake failed: {0}")]
    Handshake(std::io::Error),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server presented no certificate")]
    NoCertificate,

    #[error("Certificate parse error: {0}")]
    Parse(String),

    #[error("TLS configuration error: {0}")]
    Config(#[from] rustls::Error),
}

/// Fields of the leaf certificate used as features
#[derive(Debug, Clone, PartialEq)]
pub struct PeerCertificate {
    pub issuer_org: Option<String>,
    pub subject_org: Option<String>,
    pub not_after: Option<DateTime<Utc>>,
    pub subject_alt_names: Vec<String>,
}

impl PeerCertificate {
    pub fn from_der(der: &[u8]) -> Result<Self, TlsProbeError> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|e| TlsProbeError::Parse(e.to_string()))?;

        let organization = |name: &X509Name<'_>| {
            name.iter_organization()
                .next()
                .and_then(|attr| attr.as_str().ok())
                .map(|s| s.to_string())
        };

        let subject_alt_names = match cert.subject_alternative_name() {
            Ok(Some(ext)) => ext
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => return Err(TlsProbeError::Parse(e.to_string())),
        };

        Ok(Self {
            issuer_org: organization(cert.issuer()),
            subject_org: organization(cert.subject()),
            not_after: DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0),
            subject_alt_names,
        })
    }
}

#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Leaf certificate of a verified handshake, `None` on any failure
    async fn peer_certificate(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Option<PeerCertificate>;
}

/// Performs real handshakes with rustls
pub struct TlsProbe {
    connector: TlsConnector,
}

impl TlsProbe {
    pub fn new() -> Result<Self, TlsProbeError> {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };

        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    pub async fn probe(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<PeerCertificate, TlsProbeError> {
        match tokio::time::timeout(timeout, self.handshake(host, port)).await {
            Ok(result) => result,
            Err(_) => Err(TlsProbeError::Timeout(timeout)),
        }
    }

    async fn handshake(&self, host: &str, port: u16) -> Result<PeerCertificate, TlsProbeError> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| TlsProbeError::InvalidServerName(host.to_string()))?;

        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(TlsProbeError::Connect)?;

        let stream = self
            .connector
            .connect(server_name, tcp)
            .await
            .map_err(TlsProbeError::Handshake)?;

        let (_, session) = stream.get_ref();
        let leaf = session
            .peer_certificates()
            .and_then(|chain| chain.first())
            .ok_or(TlsProbeError::NoCertificate)?;

        PeerCertificate::from_der(leaf.as_ref())
    }
}

#[async_trait]
impl CertificateSource for TlsProbe {
    async fn peer_certificate(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Option<PeerCertificate> {
        match self.probe(host, port, timeout).await {
            Ok(cert) => Some(cert),
            Err(e) => {
                debug!("TLS probe failed for {}:{}: {}", host, port, e);
                None
            },
        }
    }
}

//! Purpose: HTTP capability used to deliver Harvest requests.
//! Exports: `Transport`, `HttpTransport`.
//! Role: `Transport` is the seam publishers depend on; `HttpTransport` is the ureq-backed default.
//! Invariants: One call issues exactly one POST; no retries, no redirects beyond ureq defaults.
//! Invariants: HTTP error statuses become errors carrying the status and response body.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use ureq::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use ureq::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use ureq::rustls::{DigitallySignedStruct, Error as TlsError, SignatureScheme};
use url::Url;

use super::ApiResult;

pub const XML_CONTENT_TYPE: &str = "application/xml";
pub const TEXT_ACCEPT: &str = "text/plain, */*; q=0.01";

pub trait Transport: Send + Sync {
    /// POST `body` to `url` and return the response body as text.
    fn post_text(&self, url: &Url, body: &str) -> ApiResult<String>;
}

#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<HttpTransportInner>,
}

#[derive(Clone)]
struct HttpTransportInner {
    token: Option<String>,
    timeout: Option<Duration>,
    agent: ureq::Agent,
}

#[derive(Debug)]
struct AcceptAllServerCertVerifier;

impl ServerCertVerifier for AcceptAllServerCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        ureq::rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HttpTransportInner {
                token: None,
                timeout: None,
                agent: ureq::AgentBuilder::new().build(),
            }),
        }
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        let token = Some(token.into());
        self.map_inner(|inner| inner.token = token)
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.map_inner(|inner| inner.timeout = Some(timeout))
    }

    pub fn with_tls_ca_file(self, path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let cert_bytes = std::fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "failed to read TLS CA/certificate file {}",
                    path.display()
                ))
                .with_source(err)
        })?;
        let mut cert_reader = Cursor::new(cert_bytes);
        let certs = rustls_pemfile::certs(&mut cert_reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!(
                        "failed to parse TLS CA/certificate file {}",
                        path.display()
                    ))
                    .with_source(err)
            })?;
        if certs.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "TLS CA/certificate file {} contains no certificates",
                path.display()
            )));
        }

        let _ = ureq::rustls::crypto::aws_lc_rs::default_provider().install_default();
        let mut root_store = ureq::rustls::RootCertStore::empty();
        let (added, _) = root_store.add_parsable_certificates(certs);
        if added == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "TLS CA/certificate file {} contains no parsable certificates",
                path.display()
            )));
        }

        let tls_config = ureq::rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        let agent = ureq::builder().tls_config(Arc::new(tls_config)).build();
        Ok(self.map_inner(|inner| inner.agent = agent))
    }

    pub fn with_tls_skip_verify(self) -> Self {
        let _ = ureq::rustls::crypto::aws_lc_rs::default_provider().install_default();
        let tls_config = ureq::rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAllServerCertVerifier))
            .with_no_client_auth();
        let agent = ureq::builder().tls_config(Arc::new(tls_config)).build();
        self.map_inner(|inner| inner.agent = agent)
    }

    fn map_inner(mut self, update: impl FnOnce(&mut HttpTransportInner)) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => update(inner),
            None => {
                let mut inner = (*self.inner).clone();
                update(&mut inner);
                self.inner = Arc::new(inner);
            }
        }
        self
    }

    fn request(&self, url: &Url) -> ureq::Request {
        let mut request = self
            .inner
            .agent
            .post(url.as_str())
            .set("Content-Type", XML_CONTENT_TYPE)
            .set("Accept", TEXT_ACCEPT);
        if let Some(token) = &self.inner.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }
        request
    }
}

impl Transport for HttpTransport {
    fn post_text(&self, url: &Url, body: &str) -> ApiResult<String> {
        match self.request(url).send_string(body) {
            Ok(resp) => read_text_response(resp).map_err(|err| err.with_endpoint(url.as_str())),
            Err(ureq::Error::Status(code, resp)) => {
                Err(parse_error_response(code, resp).with_endpoint(url.as_str()))
            }
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_endpoint(url.as_str())
                .with_source(err)),
        }
    }
}

fn read_text_response(response: ureq::Response) -> ApiResult<String> {
    read_body(response).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })
}

/// Reads the whole body with no size cap; invalid UTF-8 is replaced, not rejected.
fn read_body(response: ureq::Response) -> std::io::Result<String> {
    let mut buf = Vec::new();
    response.into_reader().read_to_end(&mut buf)?;
    Ok(match String::from_utf8(buf) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = read_body(response).unwrap_or_default();
    let err = Error::new(error_kind_from_status(status))
        .with_message(format!("catalogue returned status {status}"))
        .with_status(status);
    if body.is_empty() {
        err
    } else {
        err.with_detail(body)
    }
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 => ErrorKind::Usage,
        401 | 403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        500..=599 => ErrorKind::Remote,
        _ => ErrorKind::Io,
    }
}

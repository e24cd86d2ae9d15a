use super::Credentials;
use super::TokenAgeOutOfRange;
use crate::xml::XmlDocument;
use crate::xml::XmlError;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use mockall::automock;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use url::Url;

pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

const FAULT_PATH: &str = "Envelope.Body.Fault";
const FAULT_REASON_PATH: &str = "Envelope.Body.Fault.Reason.Text";

#[derive(Error, Debug)]
pub enum SoapError {
    #[error("Invalid service address")]
    InvalidAddress(#[from] url::ParseError),

    #[error("Service address cannot carry credentials")]
    InvalidCredentials,

    #[error("Invalid token age")]
    InvalidTokenAge(#[from] TokenAgeOutOfRange),

    #[error("HTTP exchange failed")]
    Http(#[from] reqwest::Error),

    #[error("Malformed SOAP response")]
    Malformed(#[from] XmlError),

    #[error("SOAP fault: {0}")]
    RemoteFault(String),
}

/// Posts a SOAP envelope and returns the raw response body.
#[automock]
pub trait SoapTransport {
    fn post(&self, url: Url, envelope: String) -> BoxFuture<'static, reqwest::Result<Vec<u8>>>;
}

#[derive(Default, Clone)]
pub struct HttpSoapTransport {
    client: reqwest::Client,
}

impl HttpSoapTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl SoapTransport for HttpSoapTransport {
    fn post(&self, url: Url, envelope: String) -> BoxFuture<'static, reqwest::Result<Vec<u8>>> {
        // User info in the URL becomes basic authentication.
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(envelope);
        async move {
            // Faults come with 4xx or 5xx, so the body is read regardless of the status.
            let response = request.send().await?;
            log::debug!("SOAP response status: {}", response.status());
            Ok(response.bytes().await?.to_vec())
        }
        .boxed()
    }
}

pub(super) async fn call(
    transport: &impl SoapTransport,
    xaddr: &str,
    credentials: Option<&Credentials>,
    envelope: String,
) -> Result<XmlDocument, SoapError> {
    let mut url = Url::parse(xaddr)?;
    if let Some(credentials) = credentials {
        url.set_username(&credentials.user)
            .map_err(|_| SoapError::InvalidCredentials)?;
        url.set_password(Some(&credentials.password))
            .map_err(|_| SoapError::InvalidCredentials)?;
    }
    log::debug!(
        "Calling SOAP service at {}{}",
        url.host_str().unwrap_or_default(),
        url.path()
    );

    let response = transport.post(url, envelope).await?;
    let document = XmlDocument::parse(&response)?;
    if document.find(FAULT_PATH).is_some() {
        let reason = document
            .value_for_path(FAULT_REASON_PATH)
            .unwrap_or_default();
        return Err(SoapError::RemoteFault(reason));
    }
    Ok(document)
}

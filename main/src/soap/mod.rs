//! Generic SOAP 1.2 calls to ONVIF services.

mod security;
mod transport;

use crate::xml::XmlDocument;
use chrono::Duration;

pub use security::password_digest;
pub use security::SecurityToken;
pub use security::TokenAgeOutOfRange;
pub use transport::HttpSoapTransport;
pub use transport::SoapError;
pub use transport::SoapTransport;
pub use transport::SOAP_CONTENT_TYPE;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const SOAP_ENVELOPE_NAMESPACE: &str = "http://www.w3.org/2003/05/soap-envelope";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One SOAP call.
///
/// Namespaces are full declarations, e.g. `xmlns:tds="http://www.onvif.org/ver10/device/wsdl"`.
#[derive(Debug, Clone)]
pub struct SoapRequest {
    body: String,
    namespaces: Vec<String>,
    credentials: Option<Credentials>,
    token_age: Duration,
}

impl SoapRequest {
    pub fn new<N>(body: impl Into<String>, namespaces: impl IntoIterator<Item = N>) -> Self
    where
        N: Into<String>,
    {
        Self {
            body: body.into(),
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            credentials: None,
            token_age: Duration::zero(),
        }
    }

    /// Authenticates the request with a WS-Security UsernameToken and HTTP basic authentication.
    ///
    /// `token_age` shifts the token creation time to compensate clock skew.
    pub fn with_credentials(self, credentials: Credentials, token_age: Duration) -> Self {
        Self {
            credentials: Some(credentials),
            token_age,
            ..self
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Builds the envelope, with a freshly generated security token if there are credentials.
    pub fn envelope(&self) -> Result<String, SoapError> {
        let token = self
            .credentials
            .as_ref()
            .map(|c| SecurityToken::generate(&c.user, &c.password, self.token_age))
            .transpose()?;
        Ok(self.envelope_with_token(token.as_ref()))
    }

    /// Builds the envelope around a given security token.
    ///
    /// The body is inserted verbatim.
    pub fn envelope_with_token(&self, token: Option<&SecurityToken>) -> String {
        let mut envelope =
            format!(r#"{XML_DECLARATION}<s:Envelope xmlns:s="{SOAP_ENVELOPE_NAMESPACE}""#);
        for namespace in &self.namespaces {
            envelope.push(' ');
            envelope.push_str(&crate::xml::compact(namespace));
        }
        envelope.push('>');
        if let Some(token) = token {
            envelope.push_str("<s:Header>");
            envelope.push_str(&token.to_xml());
            envelope.push_str("</s:Header>");
        }
        envelope.push_str("<s:Body>");
        envelope.push_str(&self.body);
        envelope.push_str("</s:Body></s:Envelope>");
        envelope
    }

    /// Posts this request to the service at `xaddr`.
    ///
    /// There is no timeout. Wrap the call in [tokio::time::timeout] if needed.
    pub async fn call(&self, xaddr: &str) -> Result<XmlDocument, SoapError> {
        self.call_with(&HttpSoapTransport::default(), xaddr).await
    }

    pub async fn call_with(
        &self,
        transport: &impl SoapTransport,
        xaddr: &str,
    ) -> Result<XmlDocument, SoapError> {
        let envelope = self.envelope()?;
        transport::call(transport, xaddr, self.credentials.as_ref(), envelope).await
    }
}

/// Builds a [SoapRequest]. An empty `user` means no authentication.
pub fn build_soap_request(
    body: &str,
    namespaces: &[&str],
    user: &str,
    password: &str,
    token_age: Duration,
) -> SoapRequest {
    let request = SoapRequest::new(body, namespaces.iter().copied());
    if user.is_empty() {
        return request;
    }
    let credentials = Credentials {
        user: user.into(),
        password: password.into(),
    };
    request.with_credentials(credentials, token_age)
}

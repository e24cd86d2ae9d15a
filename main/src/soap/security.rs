//! WS-Security UsernameToken with the PasswordDigest profile.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::DateTime;
use chrono::Duration;
use chrono::SecondsFormat;
use chrono::Utc;
use sha1::Digest;
use sha1::Sha1;
use thiserror::Error;

const NONCE_SIZE: usize = 16;

const NS_WSSE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const NS_WSU: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
const PASSWORD_DIGEST_TYPE: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
const BASE64_ENCODING_TYPE: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Token age moves the creation time out of range")]
pub struct TokenAgeOutOfRange;

/// Authentication token of one SOAP request. Never reuse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityToken {
    username: String,
    nonce: Vec<u8>,
    created: String,
    digest: String,
}

impl SecurityToken {
    /// Generates a token with a random nonce, created at the current time shifted by `token_age`.
    ///
    /// `token_age` compensates clock skew between the client and the device.
    pub fn generate(
        username: &str,
        password: &str,
        token_age: Duration,
    ) -> Result<Self, TokenAgeOutOfRange> {
        let created = Utc::now()
            .checked_add_signed(token_age)
            .ok_or(TokenAgeOutOfRange)?;
        let nonce: [u8; NONCE_SIZE] = rand::random();
        Ok(Self::new(username, password, nonce.into(), created))
    }

    pub fn new(username: &str, password: &str, nonce: Vec<u8>, created: DateTime<Utc>) -> Self {
        let created = created.to_rfc3339_opts(SecondsFormat::Secs, true);
        let digest = password_digest(&nonce, &created, password);
        Self {
            username: username.into(),
            nonce,
            created,
            digest,
        }
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// Creation time in RFC 3339.
    pub fn created(&self) -> &str {
        &self.created
    }

    /// Base64 of the password digest.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Renders the `Security` header element.
    ///
    /// The envelope prefix must be `s`.
    pub fn to_xml(&self) -> String {
        format!(
            concat!(
                r#"<Security s:mustUnderstand="1" xmlns="{wsse}">"#,
                "<UsernameToken>",
                "<Username>{username}</Username>",
                r#"<Password Type="{password_type}">{digest}</Password>"#,
                r#"<Nonce EncodingType="{nonce_encoding}">{nonce}</Nonce>"#,
                r#"<Created xmlns="{wsu}">{created}</Created>"#,
                "</UsernameToken>",
                "</Security>",
            ),
            wsse = NS_WSSE,
            username = crate::xml::escape(&self.username),
            password_type = PASSWORD_DIGEST_TYPE,
            digest = self.digest,
            nonce_encoding = BASE64_ENCODING_TYPE,
            nonce = BASE64.encode(&self.nonce),
            wsu = NS_WSU,
            created = self.created,
        )
    }
}

/// `Base64(SHA1(nonce + created + password))`
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut sha = Sha1::new();
    sha.update(nonce);
    sha.update(created.as_bytes());
    sha.update(password.as_bytes());
    BASE64.encode(sha.finalize())
}

use crate::xml::XmlDocument;
use crate::xml::XmlError;
use serde::Serialize;
use thiserror::Error;

const RELATES_TO_PATH: &str = "Envelope.Header.RelatesTo";
const ADDRESS_PATH: &str = "Envelope.Body.ProbeMatches.ProbeMatch.EndpointReference.Address";
const SCOPES_PATH: &str = "Envelope.Body.ProbeMatches.ProbeMatch.Scopes";
const XADDRS_PATH: &str = "Envelope.Body.ProbeMatches.ProbeMatch.XAddrs";

const UUID_URN_PREFIX: &str = "urn:uuid:";
const NAME_SCOPE_PREFIX: &str = "onvif://www.onvif.org/name/";

/// A device answering a discovery probe.
///
/// `id` and `name` are empty when the device does not advertise them.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    /// Device service URL for subsequent SOAP calls. Never empty.
    pub xaddr: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Matched(Device),

    /// The response belongs to some other probe.
    Discarded,
}

#[derive(Error, Debug)]
pub enum ProbeResponseError {
    #[error("Malformed probe response")]
    Malformed(#[from] XmlError),

    #[error("Probe response has no service address")]
    NoServiceAddress,
}

/// Parses a ProbeMatch `response` to the probe identified by `message_id`.
pub fn parse_probe_match(
    message_id: &str,
    response: &[u8],
) -> Result<ProbeOutcome, ProbeResponseError> {
    let document = XmlDocument::parse(response)?;

    match document.value_for_path(RELATES_TO_PATH) {
        Some(relates_to) if relates_to.trim() == message_id => {}
        _ => return Ok(ProbeOutcome::Discarded),
    }

    let address = document.value_for_path(ADDRESS_PATH).unwrap_or_default();
    let id = address.trim().replacen(UUID_URN_PREFIX, "", 1);

    let name = document
        .value_for_path(SCOPES_PATH)
        .unwrap_or_default()
        .split_whitespace()
        .find_map(|scope| scope.strip_prefix(NAME_SCOPE_PREFIX))
        .map(|name| name.replace('_', " "))
        .unwrap_or_default();

    let xaddr = document
        .value_for_path(XADDRS_PATH)
        .unwrap_or_default()
        .split_whitespace()
        .next()
        .map(ToString::to_string)
        .ok_or(ProbeResponseError::NoServiceAddress)?;

    Ok(ProbeOutcome::Matched(Device { id, name, xaddr }))
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub const MESSAGE_ID: &str = "urn:uuid:6c0f3e52-8a9d-4f5e-b1a4-2d7c9e0f1a2b";

    pub fn probe_match(relates_to: &str, scopes: &str, xaddrs: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <SOAP-ENV:Envelope
                xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope"
                xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing"
                xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery">
                <SOAP-ENV:Header>
                    <wsa:MessageID>urn:uuid:0a6dc791-2be6-4991-9af1-454778a1917a</wsa:MessageID>
                    <wsa:RelatesTo>{relates_to}</wsa:RelatesTo>
                    <wsa:To>http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous</wsa:To>
                    <wsa:Action>http://schemas.xmlsoap.org/ws/2005/04/discovery/ProbeMatches</wsa:Action>
                </SOAP-ENV:Header>
                <SOAP-ENV:Body>
                    <d:ProbeMatches>
                        <d:ProbeMatch>
                            <wsa:EndpointReference>
                                <wsa:Address>urn:uuid:a1b2c3d4-0000-1000-8000-00a0c9e1f2a3</wsa:Address>
                            </wsa:EndpointReference>
                            <d:Types>dn:NetworkVideoTransmitter</d:Types>
                            <d:Scopes>{scopes}</d:Scopes>
                            <d:XAddrs>{xaddrs}</d:XAddrs>
                            <d:MetadataVersion>1</d:MetadataVersion>
                        </d:ProbeMatch>
                    </d:ProbeMatches>
                </SOAP-ENV:Body>
            </SOAP-ENV:Envelope>"#
        )
    }

    const SCOPES: &str = "onvif://www.onvif.org/type/video_encoder \
        onvif://www.onvif.org/name/Front_Door \
        onvif://www.onvif.org/hardware/IPC";

    #[test]
    fn matched() {
        let response = probe_match(
            MESSAGE_ID,
            SCOPES,
            "http://10.0.0.5/onvif/device_service http://[fe80::1]/onvif/device_service",
        );

        // When
        let outcome = parse_probe_match(MESSAGE_ID, response.as_bytes()).unwrap();

        // Then
        assert_eq!(
            outcome,
            ProbeOutcome::Matched(Device {
                id: "a1b2c3d4-0000-1000-8000-00a0c9e1f2a3".into(),
                name: "Front Door".into(),
                xaddr: "http://10.0.0.5/onvif/device_service".into(),
            })
        );
    }

    #[test]
    fn nameless_device() {
        let response = probe_match(
            MESSAGE_ID,
            "onvif://www.onvif.org/type/video_encoder",
            "http://10.0.0.5/onvif/device_service",
        );

        // When
        let outcome = parse_probe_match(MESSAGE_ID, response.as_bytes()).unwrap();

        // Then
        if let ProbeOutcome::Matched(device) = outcome {
            assert_eq!(device.name, "");
        } else {
            panic!("Expecting `Matched`");
        }
    }

    #[test]
    fn discards_other_probes() {
        let response = probe_match(
            "urn:uuid:00000000-0000-4000-8000-000000000000",
            SCOPES,
            "http://10.0.0.5/onvif/device_service",
        );

        // When
        let outcome = parse_probe_match(MESSAGE_ID, response.as_bytes()).unwrap();

        // Then
        assert_eq!(outcome, ProbeOutcome::Discarded);
    }

    #[test]
    fn discards_uncorrelated_responses() {
        let response = r#"<Envelope><Body><ProbeMatches/></Body></Envelope>"#;

        // When
        let outcome = parse_probe_match(MESSAGE_ID, response.as_bytes()).unwrap();

        // Then
        assert_eq!(outcome, ProbeOutcome::Discarded);
    }

    #[test]
    fn discards_before_checking_addresses() {
        let response = probe_match("urn:uuid:other", SCOPES, "");

        // When
        let outcome = parse_probe_match(MESSAGE_ID, response.as_bytes()).unwrap();

        // Then
        assert_eq!(outcome, ProbeOutcome::Discarded);
    }

    #[test]
    fn no_service_address() {
        let response = probe_match(MESSAGE_ID, SCOPES, "  ");

        // When
        let e = parse_probe_match(MESSAGE_ID, response.as_bytes()).unwrap_err();

        // Then
        if let ProbeResponseError::NoServiceAddress = e {
        } else {
            panic!("Expecting `NoServiceAddress`");
        }
    }

    #[test]
    fn malformed() {
        let e = parse_probe_match(MESSAGE_ID, b"M-SEARCH * HTTP/1.1\r\n").unwrap_err();
        if let ProbeResponseError::Malformed(_) = e {
        } else {
            panic!("Expecting `Malformed`");
        }
    }
}

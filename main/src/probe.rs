/// Builds a WS-Discovery Probe for ONVIF network video transmitters.
///
/// `message_id` is copied by responders into their `RelatesTo` header.
pub fn probe_message(message_id: &str) -> String {
    let message = format!(
        r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <e:Envelope
            xmlns:e="http://www.w3.org/2003/05/soap-envelope"
            xmlns:w="http://schemas.xmlsoap.org/ws/2004/08/addressing"
            xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery"
            xmlns:dn="http://www.onvif.org/ver10/network/wsdl">
            <e:Header>
                <w:MessageID>{message_id}</w:MessageID>
                <w:To e:mustUnderstand="true">urn:schemas-xmlsoap-org:ws:2005:04:discovery</w:To>
                <w:Action e:mustUnderstand="true">http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe</w:Action>
            </e:Header>
            <e:Body>
                <d:Probe>
                    <d:Types>dn:NetworkVideoTransmitter</d:Types>
                </d:Probe>
            </e:Body>
        </e:Envelope>
        "#
    );
    crate::xml::compact(&message)
}

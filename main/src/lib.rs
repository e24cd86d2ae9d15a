mod discovery;
mod id;
mod network;
mod probe;
mod probe_match;
pub mod soap;
pub mod xml;

use std::net::Ipv4Addr;
use std::net::SocketAddrV4;

pub use discovery::discover;
pub use discovery::discover_on_address;
pub use discovery::discover_stream;
pub use discovery::DiscoveryError;
pub use id::new_message_id;
pub use network::interfaces::AddressQueryError;
pub use network::interfaces::AddressSource;
pub use network::interfaces::GetIfAddrsSource;
pub use network::multicast::run_round;
pub use probe::probe_message;
pub use probe_match::parse_probe_match;
pub use probe_match::Device;
pub use probe_match::ProbeOutcome;
pub use probe_match::ProbeResponseError;
pub use soap::build_soap_request;
pub use soap::Credentials;
pub use soap::SoapError;
pub use soap::SoapRequest;
pub use xml::XmlDocument;

/// IPv4 multicast group and port of WS-Discovery.
///
/// Fixed by the WS-Discovery standard; every ONVIF device listens here.
pub const WS_DISCOVERY_ADDRESS: SocketAddrV4 =
    SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 3702);

pub fn get_discovery_address() -> SocketAddrV4 {
    WS_DISCOVERY_ADDRESS
}

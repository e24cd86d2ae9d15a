use mockall::automock;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AddressQueryError {
    #[error("Failed to query network interfaces")]
    NetworkQuery(#[from] std::io::Error),
}

/// Source of local addresses to send discovery probes from.
#[automock]
pub trait AddressSource {
    fn local_addresses(&self) -> Result<Vec<Ipv4Addr>, AddressQueryError>;
}

/// Reads the IPv4 addresses of non-loopback network interfaces from the operating system.
///
/// Interfaces that are administratively down are not filtered out, since `get_if_addrs` does not
/// report interface flags. Sending a probe from such an address fails, and that error ends the
/// discovery.
pub struct GetIfAddrsSource;

impl AddressSource for GetIfAddrsSource {
    fn local_addresses(&self) -> Result<Vec<Ipv4Addr>, AddressQueryError> {
        let addresses: Vec<_> = get_if_addrs::get_if_addrs()?
            .into_iter()
            .filter(|i| !i.is_loopback())
            .filter_map(|i| match i.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            })
            .collect();
        log::debug!("Local IPv4 addresses: {:?}", &addresses);
        Ok(addresses)
    }
}

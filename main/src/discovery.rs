use crate::network::interfaces::AddressQueryError;
use crate::network::interfaces::AddressSource;
use crate::network::interfaces::GetIfAddrsSource;
use crate::probe_match::Device;
use crate::probe_match::ProbeOutcome;
use crate::probe_match::ProbeResponseError;
use futures_util::Stream;
use futures_util::StreamExt;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;
use std::time::Duration;
use thiserror::Error;

/// Discovers ONVIF devices from every local IPv4 address.
///
/// One round runs per address, all of them concurrently. If any round fails, the first failure
/// is returned once all rounds have finished.
pub async fn discover(timeout: Duration) -> Result<Vec<Device>, DiscoveryError> {
    discover_internal(&GetIfAddrsSource, crate::get_discovery_address(), timeout).await
}

/// Discovers ONVIF devices by probing from `address`.
///
/// Responses that fail to parse are logged and skipped.
pub async fn discover_on_address(
    address: Ipv4Addr,
    timeout: Duration,
) -> Result<Vec<Device>, DiscoveryError> {
    collect_round(address, crate::get_discovery_address(), timeout).await
}

/// Streams the outcome of every correlated response to a probe sent from `address`.
///
/// Unlike [discover_on_address], invalid responses are yielded as errors. A
/// [DiscoveryError::Transport] is always the last item.
pub fn discover_stream(
    address: Ipv4Addr,
    timeout: Duration,
) -> impl Stream<Item = Result<Device, DiscoveryError>> + Send + 'static {
    probe_round(address, crate::get_discovery_address(), timeout)
}

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to enumerate local addresses")]
    NetworkQuery(#[from] AddressQueryError),

    #[error("Error in the discovery socket")]
    Transport(#[from] std::io::Error),

    #[error("Invalid probe response")]
    Response(#[from] ProbeResponseError),
}

async fn discover_internal(
    address_source: &impl AddressSource,
    destination: SocketAddrV4,
    timeout: Duration,
) -> Result<Vec<Device>, DiscoveryError> {
    let addresses = address_source.local_addresses()?;
    let rounds = addresses
        .into_iter()
        .map(|address| collect_round(address, destination, timeout));
    futures_util::future::join_all(rounds)
        .await
        .into_iter()
        .try_fold(Vec::default(), |mut devices, round| -> Result<_, DiscoveryError> {
            devices.extend(round?);
            Ok(devices)
        })
}

async fn collect_round(
    address: Ipv4Addr,
    destination: SocketAddrV4,
    timeout: Duration,
) -> Result<Vec<Device>, DiscoveryError> {
    let mut responses = probe_round(address, destination, timeout).boxed();
    let mut devices = Vec::default();
    while let Some(response) = responses.next().await {
        match response {
            Ok(device) => devices.push(device),
            Err(DiscoveryError::Response(e)) => {
                log::warn!("Skipping a probe response received on {}: {}", address, e)
            }
            Err(e) => return Err(e),
        }
    }
    log::info!("Discovered {} device(s) from {}", devices.len(), address);
    Ok(devices)
}

fn probe_round(
    address: Ipv4Addr,
    destination: SocketAddrV4,
    timeout: Duration,
) -> impl Stream<Item = Result<Device, DiscoveryError>> + Send + 'static {
    let message_id = crate::id::new_message_id();
    let probe = crate::probe::probe_message(&message_id);
    log::info!("Probing from {} with message {}", address, message_id);
    crate::network::multicast::run_round(address, destination, probe.into_bytes(), timeout)
        .filter_map(move |datagram| futures_util::future::ready(to_device(&message_id, datagram)))
}

fn to_device(
    message_id: &str,
    datagram: std::io::Result<Vec<u8>>,
) -> Option<Result<Device, DiscoveryError>> {
    let datagram = match datagram {
        Ok(d) => d,
        Err(e) => return Some(Err(e.into())),
    };
    match crate::probe_match::parse_probe_match(message_id, &datagram) {
        Ok(ProbeOutcome::Matched(device)) => Some(Ok(device)),
        Ok(ProbeOutcome::Discarded) => {
            log::debug!("Discarding a response to another probe");
            None
        }
        Err(e) => Some(Err(e.into())),
    }
}

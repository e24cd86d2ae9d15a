use futures_util::StreamExt;
use onvif_transport::Device;
use onvif_transport::DiscoveryError;
use std::net::Ipv4Addr;
use std::time::Duration;

pub async fn discover(
    timeout_ms: u64,
    address: Option<Ipv4Addr>,
    stream: bool,
) -> anyhow::Result<()> {
    let timeout = Duration::from_millis(timeout_ms);
    match (address, stream) {
        (Some(address), true) => discover_stream(address, timeout).await,
        (Some(address), false) => {
            print_devices(&onvif_transport::discover_on_address(address, timeout).await?)
        }
        (None, _) => print_devices(&onvif_transport::discover(timeout).await?),
    }
}

async fn discover_stream(address: Ipv4Addr, timeout: Duration) -> anyhow::Result<()> {
    let mut responses = onvif_transport::discover_stream(address, timeout).boxed();
    while let Some(response) = responses.next().await {
        match response {
            Ok(device) => println!("{}", serde_json::to_string(&device)?),
            Err(DiscoveryError::Response(e)) => log::warn!("Invalid probe response: {}", e),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn print_devices(devices: &[Device]) -> anyhow::Result<()> {
    log::info!("Discovered {} device(s)", devices.len());
    for device in devices {
        println!("{}", serde_json::to_string(device)?);
    }
    Ok(())
}

mod call;
mod discover;

use clap::Parser;
use clap::Subcommand;
use std::net::Ipv4Addr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Command::Discover {
            timeout_ms,
            address,
            stream,
        } => crate::discover::discover(timeout_ms, address, stream).await?,
        Command::Call(args) => crate::call::call(args).await?,
    };
    Ok(())
}

#[derive(Parser)]
#[command(about = "ONVIF device discovery and SOAP calls")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Finds ONVIF devices with WS-Discovery and prints them as JSON lines
    Discover {
        /// How long to wait for responses
        #[arg(long, default_value_t = 3000)]
        timeout_ms: u64,

        /// Probe only from this local address instead of every interface
        #[arg(long)]
        address: Option<Ipv4Addr>,

        /// Print devices and invalid responses as they arrive (requires `--address`)
        #[arg(long, requires = "address")]
        stream: bool,
    },

    /// Calls a SOAP operation and prints the response envelope
    Call(crate::call::CallArgs),
}

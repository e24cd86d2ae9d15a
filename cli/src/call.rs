use anyhow::Context;
use chrono::Duration;
use clap::Args;

#[derive(Args)]
pub struct CallArgs {
    /// Service URL, usually the `xaddr` of a discovered device
    xaddr: String,

    /// Content of the SOAP body, e.g. `<tds:GetDeviceInformation/>`
    body: String,

    /// Namespace declaration used by the body, e.g. `xmlns:tds="http://www.onvif.org/ver10/device/wsdl"`
    #[arg(long = "namespace")]
    namespaces: Vec<String>,

    /// Authenticate as this user
    #[arg(long, default_value = "")]
    user: String,

    #[arg(long, env = "ONVIF_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Seconds added to the local clock when creating the security token
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    token_age_secs: i64,

    /// Give up if the device does not answer in time
    #[arg(long)]
    timeout_ms: Option<u64>,
}

pub async fn call(args: CallArgs) -> anyhow::Result<()> {
    let token_age = Duration::try_seconds(args.token_age_secs)
        .with_context(|| format!("Token age of {} seconds is out of range", args.token_age_secs))?;
    let namespaces: Vec<_> = args.namespaces.iter().map(String::as_str).collect();
    let request = onvif_transport::build_soap_request(
        &args.body,
        &namespaces,
        &args.user,
        &args.password,
        token_age,
    );
    let call = request.call(&args.xaddr);
    let response = match args.timeout_ms {
        Some(timeout_ms) => {
            tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), call)
                .await
                .with_context(|| format!("No response from {} in {} ms", args.xaddr, timeout_ms))??
        }
        None => call.await?,
    };
    println!("{}", response.to_xml_string()?);
    Ok(())
}

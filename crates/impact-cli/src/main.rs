//! impact-cli: query the impact service from the command line.
//!
//! ```text
//! impact-cli Flight -p origin_airport=LAX -p destination_airport=SFO --year 2009
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use impact_client::{CarbonConfig, ImpactApi, ImpactService, MappingRegistry, ParamValue, Params, Timeframe};

/// Query the impact calculation service
#[derive(Parser, Debug)]
#[command(name = "impact-cli")]
#[command(version, about = "Query the impact calculation service and print the response as JSON")]
struct Args {
    /// Emitter name, e.g. Flight or AutomobileTrip
    emitter: String,

    /// Characteristic as name=value (repeatable)
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// API key (overrides CARBON_KEY)
    #[arg(short, long)]
    key: Option<String>,

    /// Service base URL (overrides CARBON_DOMAIN)
    #[arg(short, long)]
    domain: Option<String>,

    /// Calendar year to calculate for
    #[arg(short, long)]
    year: Option<i32>,

    /// Compliance protocol to request (repeatable)
    #[arg(short, long = "comply", value_name = "PROTOCOL")]
    comply: Vec<String>,

    /// Print only the carbon value
    #[arg(long)]
    carbon_only: bool,
}

/// Parse `name=value`. The value is sent exactly as typed.
fn parse_param(raw: &str) -> Result<(String, ParamValue)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("expected NAME=VALUE, got {:?}", raw);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("parameter name is empty in {:?}", raw);
    }

    Ok((name.to_string(), ParamValue::Text(value.to_string())))
}

fn build_params(args: &Args) -> Result<Params> {
    let mut params = Params::new();
    for raw in &args.params {
        let (name, value) = parse_param(raw)?;
        params.insert(name, value);
    }
    if let Some(year) = args.year {
        let timeframe = Timeframe::year(year).context("invalid --year")?;
        params.insert("timeframe".into(), timeframe.into());
    }
    if !args.comply.is_empty() {
        params.insert("comply".into(), args.comply.clone().into());
    }
    Ok(params)
}

fn load_config(args: &Args) -> Result<CarbonConfig> {
    let mut config = CarbonConfig::from_env().context("invalid CARBON_* environment")?;
    if let Some(key) = &args.key {
        config = config.with_api_key(key.clone());
    }
    if let Some(domain) = &args.domain {
        config = config.with_endpoint(domain);
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr, so stdout stays valid JSON)
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = load_config(&args)?;
    let params = build_params(&args)?;
    debug!(emitter = %args.emitter, params = params.len(), "Querying");

    let service = ImpactService::http(config, Arc::new(MappingRegistry::new()))?;
    let response = service.query(&args.emitter, params).await?;

    if args.carbon_only {
        match response.carbon_value() {
            Some(value) => println!("{}", value),
            None => bail!("no carbon value in response: {}", response.errors.join("; ")),
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&*response)?);
    }

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

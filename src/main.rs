use clap::{Parser, Subcommand};
use smog_watch::air::{GiosClient, GoogleGeocoder, RequestOrchestrator, SystemClock};
use smog_watch::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Smog Watch: air quality at the monitoring station nearest to a city.
///
/// Examples:
///   smogwatch report Kraków
///   smogwatch --radius-km 30 report "Nowy Sącz"
///   smogwatch serve --port 8080
#[derive(Parser)]
#[command(name = "smogwatch", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// GIOS REST API base URL.
    #[arg(long, global = true)]
    gios_url: Option<String>,

    /// Geocoding endpoint URL.
    #[arg(long, global = true)]
    geocoding_url: Option<String>,

    /// Geocoding API key (defaults to $GOOGLE_MAPS_API_KEY).
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// HTTP timeout in seconds for every upstream call.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Maximum distance to the chosen station.
    #[arg(long, global = true)]
    radius_km: Option<f64>,

    /// IANA timezone of the provider's timestamps (e.g. Europe/Warsaw).
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the report for a city as JSON.
    Report {
        /// City name. Example: smogwatch report Warszawa
        city: String,
    },
    /// Serve the JSON API over HTTP.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(ref url) = cli.gios_url {
        config.gios_url = url.clone();
    }
    if let Some(ref url) = cli.geocoding_url {
        config.geocoding_url = url.clone();
    }
    if let Some(ref key) = cli.api_key {
        config.api_key = key.clone();
    }
    if let Some(secs) = cli.timeout {
        config.http_timeout = Duration::from_secs(secs);
    }
    if let Some(radius) = cli.radius_km {
        config.radius_km = radius;
    }
    if let Some(ref tz) = cli.timezone {
        config.timezone = tz.clone();
    }
    if let Command::Serve { host, port } = &cli.command {
        let (default_host, default_port) = config
            .listen
            .rsplit_once(':')
            .map(|(h, p)| (h.to_string(), p.to_string()))
            .unwrap_or_else(|| (config.listen.clone(), "8080".into()));
        let host = host.clone().unwrap_or(default_host);
        let port = port.map(|p| p.to_string()).unwrap_or(default_port);
        config.listen = format!("{}:{}", host, port);
    }
}

fn build_orchestrator(config: &Config) -> RequestOrchestrator {
    let settings = config.pipeline().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    if config.api_key.is_empty() {
        tracing::warn!("no geocoding API key configured; city lookups will likely fail");
    }

    let agent = smog_watch::air::providers::http_agent(config.http_timeout);
    let geocoder = GoogleGeocoder::new(agent.clone(), &config.geocoding_url, &config.api_key);
    let api = GiosClient::new(agent, &config.gios_url);

    RequestOrchestrator::new(
        Arc::new(geocoder),
        Arc::new(api),
        &settings,
        Arc::new(SystemClock),
    )
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = Config::from_env();
    apply_overrides(&cli, &mut config);
    let orchestrator = build_orchestrator(&config);

    match &cli.command {
        Command::Report { city } => {
            let report = orchestrator.report(city);
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: cannot serialize report: {}", e);
                    std::process::exit(1);
                }
            }
            if report.error.is_some() {
                std::process::exit(2);
            }
        }
        Command::Serve { .. } => {
            let addr = config.listen_addr().unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            });
            let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
                eprintln!("Error: cannot start runtime: {}", e);
                std::process::exit(1);
            });
            let served = runtime.block_on(smog_watch::server::start(addr, Arc::new(orchestrator)));
            if let Err(e) = served {
                eprintln!("Server error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

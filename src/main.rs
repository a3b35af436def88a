//! traffic-agent - Bangalore traffic heatmaps
//!
//! A CLI tool that fetches a traffic-aware route matrix for a set of
//! hubs, averages the delays per hub, merges mock incidents and returns
//! the heatmap as gzip+base64 JSON. In agent mode an Ollama model
//! drives the pipeline through tool calls.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, API failure, bad payload, etc.)

mod agent;
mod analysis;
mod cli;
mod codec;
mod config;
mod departure;
mod hubs;
mod incidents;
mod models;
mod routes;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use cli::{Args, Mode, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::Hub;
use routes::{RoutesClient, RoutesClientConfig};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config(Path::new("."));
    }

    // Initialize logging
    init_logging(&args);

    info!("traffic-agent v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .traffic-agent.toml in `dir`.
fn handle_init_config(dir: &Path) -> Result<()> {
    let path = dir.join(DEFAULT_CONFIG_FILE);

    if path.exists() {
        bail!(
            "{} already exists. Remove it first or edit it manually.",
            path.display()
        );
    }

    let content = Config::default_toml();
    std::fs::write(&path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Set GOOGLE_MAPS_API_KEY or [routes].api_key before fetching delays.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch on the requested mode.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Decoding needs neither config nor network.
    if let Some(ref payload) = args.decode {
        return handle_decode(payload, &args);
    }
    if let Some(ref path) = args.decode_file {
        let payload = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return handle_decode(&payload, &args);
    }

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let hubs = config.effective_hubs()?;

    let departure_time = args
        .departure_time(Utc::now())
        .context("Invalid departure time")?;

    match args.mode {
        Mode::Incidents => {
            let json = serde_json::to_string_pretty(&incidents::mock_incidents())?;
            write_output(&config, &json)?;
        }
        Mode::Matrix => {
            let client = RoutesClient::new(RoutesClientConfig::from(&config.routes))?;
            let averages =
                fetch_with_spinner(&client, &hubs, departure_time, args.quiet).await?;
            write_output(&config, &serde_json::to_string(&averages)?)?;
        }
        Mode::Direct => {
            let client = RoutesClient::new(RoutesClientConfig::from(&config.routes))?;
            let averages =
                fetch_with_spinner(&client, &hubs, departure_time, args.quiet).await?;
            let points =
                analysis::build_heatmap(&averages, &incidents::mock_incidents(), &hubs);
            info!("Built heatmap with {} points", points.len());

            let packed = codec::encode_json(&points)?;
            emit_heatmap(&config, &packed)?;
        }
        Mode::Agent => {
            let packed = run_agent(&config, hubs, departure_time, args.quiet).await?;
            emit_heatmap(&config, &packed)?;
        }
    }

    debug!("Finished in {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Drive the LLM agent and return its packed heatmap.
async fn run_agent(
    config: &Config,
    hubs: Vec<Hub>,
    departure_time: DateTime<Utc>,
    quiet: bool,
) -> Result<String> {
    let client = RoutesClient::new(RoutesClientConfig::from(&config.routes))?;
    let executor = agent::ToolExecutor::new(client, hubs, incidents::mock_incidents());

    if !quiet {
        eprintln!("🤖 Initializing traffic agent...");
        eprintln!("   Model: {}", config.model.name);
        eprintln!("   Ollama: {}", config.model.ollama_url);
        eprintln!("   Departure: {}", departure_time);
    }

    let mut agent = agent::TrafficAgent::new(agent::AgentConfig::from(&config.model), executor)?;

    let spinner = spinner("Agent is building the heatmap...", quiet);
    let outcome = agent.run(departure_time).await;
    spinner.finish_and_clear();
    let outcome = outcome?;

    if let Some(averages) = agent.tool_executor().last_hub_averages() {
        info!("Agent used delay data for {} hubs", averages.len());
    }

    match outcome.heatmap {
        Some(packed) => {
            info!("Agent finished in {} iteration(s)", outcome.iterations);
            Ok(packed)
        }
        None => {
            if !outcome.final_message.is_empty() {
                warn!("Agent's final message: {}", outcome.final_message);
            }
            bail!(
                "Agent stopped after {} iteration(s) without producing a heatmap",
                outcome.iterations
            )
        }
    }
}

async fn fetch_with_spinner(
    client: &RoutesClient,
    hubs: &[Hub],
    departure_time: DateTime<Utc>,
    quiet: bool,
) -> Result<Vec<models::HubAverage>> {
    let spinner = spinner("Fetching route matrix...", quiet);
    let result = routes::fetch_hub_averages(client, hubs, departure_time).await;
    spinner.finish_and_clear();

    let averages = result.context("Failed to fetch hub delays")?;
    info!("{} of {} hubs show delays", averages.len(), hubs.len());
    Ok(averages)
}

fn spinner(message: &'static str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Handle --decode / --decode-file: unpack and pretty-print.
fn handle_decode(payload: &str, args: &Args) -> Result<()> {
    let pretty = codec::decode_to_pretty_json(payload).context("Failed to decode payload")?;

    match args.output {
        Some(ref path) => std::fs::write(path, format!("{}\n", pretty))
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", pretty);
            Ok(())
        }
    }
}

/// Write a packed heatmap in the configured format.
fn emit_heatmap(config: &Config, packed: &str) -> Result<()> {
    let rendered = match config.general.format {
        OutputFormat::Encoded => packed.to_string(),
        OutputFormat::Json => {
            codec::decode_to_pretty_json(packed).context("Heatmap payload is not valid JSON")?
        }
    };
    write_output(config, &rendered)
}

fn write_output(config: &Config, content: &str) -> Result<()> {
    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, format!("{}\n", content))
                .with_context(|| format!("Failed to write output to {}", path))?;
            eprintln!("✅ Saved to: {}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

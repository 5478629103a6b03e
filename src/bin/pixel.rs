//! pixel CLI: run the beacon server or poke at its pieces.

use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use pixel_beacon::config::Config;
use pixel_beacon::pipeline::Chain;
use pixel_beacon::pipeline::decode::parse_query;
use pixel_beacon::server::{self, AppState};
use pixel_beacon::sink::EventHubSink;
use pixel_beacon::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "pixel", about = "Tracking pixel to event stream forwarder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pixel HTTP server
    Serve {
        /// Bind address, overrides PIXEL_BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Decode a beacon query string and print the fields as JSON
    Decode {
        /// Raw query string, with or without the leading '?'
        query: String,
    },
    /// Validate the environment configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => cmd_serve(bind).await,
        Command::Decode { query } => cmd_decode(&query),
        Command::CheckConfig => cmd_check_config(),
    }
}

async fn cmd_serve(bind: Option<String>) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "pixel-beacon".to_string(),
        log_level: config.log_level.clone(),
    })?;

    // Bad credentials stop startup here, never at request time.
    let sink = EventHubSink::shared(&config.sink).await?;
    let chain = Chain::standard(sink);

    let bind_addr = bind.unwrap_or_else(|| config.bind_addr.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    server::serve(listener, AppState::new(chain), async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    Ok(())
}

fn cmd_decode(query: &str) -> anyhow::Result<()> {
    let pairs = parse_query(query);
    if pairs.is_empty() {
        anyhow::bail!("no decodable segments in '{query}'; the event would be rejected");
    }

    // Same last-write-wins rule as the pipeline.
    let fields: BTreeMap<String, String> = pairs.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

fn cmd_check_config() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let sink = EventHubSink::new(&config.sink)?;

    println!("Sink:       {}", sink.resource_uri());
    println!("Key Name:   {}", config.sink.key_name);
    println!("Bind:       {}", config.bind_addr);
    println!(
        "OTLP:       {}",
        config.otel_endpoint.as_deref().unwrap_or("-")
    );
    println!("Log Level:  {}", config.log_level);

    Ok(())
}

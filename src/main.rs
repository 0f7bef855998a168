use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mod demo;

use cqbus::{MediatorConfig, MediatorError, MediatorResult};
use demo::weather::{AddWeatherCommand, GetWeatherByNameQuery, GetWeatherQuery, UpdateWeatherStreamRequest};

#[derive(Parser)]
#[command(name = "cqbus-demo")]
#[command(about = "Weather forecasts served through an in-process mediator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "cqbus.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the weather demo
    Run {
        /// Forecast summary to add
        #[arg(long, default_value = "Foggy")]
        add: String,

        /// Name filter for queries and the update stream
        #[arg(long, default_value = "ing")]
        name: String,

        /// Delay between streamed updates, in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { add, name, delay_ms } => {
            let config = load_config(&cli.config);
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to start runtime: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(run_demo(config, add, name, Duration::from_millis(delay_ms))) {
                tracing::error!("Demo failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("cqbus-demo v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn load_config(config_path: &str) -> MediatorConfig {
    let config = if Path::new(config_path).exists() {
        MediatorConfig::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            MediatorConfig::default()
        })
    } else {
        MediatorConfig::default()
    };

    config.clone().with_env().unwrap_or_else(|e| {
        tracing::warn!("Ignoring environment overrides: {}", e);
        config
    })
}

async fn run_demo(config: MediatorConfig, add: String, name: String, delay: Duration) -> MediatorResult<()> {
    let demo = demo::build(config, delay)?;
    let mediator = &demo.mediator;
    let token = CancellationToken::new();

    let forecasts = mediator.send(GetWeatherQuery, token.clone()).await?;
    print_json("Forecasts", &forecasts);

    mediator
        .send(AddWeatherCommand { name: add.clone() }, token.clone())
        .await?;
    tracing::info!(
        "Added {}: {} forecasts known, {} events counted, {} journaled",
        add,
        demo.service.forecasts().await.len(),
        demo.added.count.load(std::sync::atomic::Ordering::SeqCst),
        demo.journal.entries.lock().await.len()
    );

    let matching = mediator
        .send(GetWeatherByNameQuery { name: name.clone() }, token.clone())
        .await?;
    print_json(&format!("Forecasts containing {:?}", name), &matching);

    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling updates");
            ctrl_c.cancel();
        }
    });

    println!("Streaming updates for {:?} (Ctrl-C to stop)", name);
    let mut updates = mediator.create_stream(UpdateWeatherStreamRequest { name }, token)?;
    while let Some(update) = updates.next().await {
        match update {
            Ok(forecast) => println!(
                "{}  {:>4}C {:>4}F  {}",
                forecast.date,
                forecast.temperature_c,
                forecast.temperature_f(),
                forecast.summary
            ),
            Err(MediatorError::Cancelled) => {
                println!("Updates cancelled");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(title: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}:\n{}", title, json),
        Err(e) => tracing::warn!("Failed to render {}: {}", title, e),
    }
}

fn init_config() {
    match MediatorConfig::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to cqbus.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("{}", e),
    }
}

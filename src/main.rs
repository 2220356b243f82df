//! js2midi - joystick drum kits to MIDI

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use js2midi::config::{self, legacy, AppConfig};
use js2midi::input::JoystickOpener;
use js2midi::paths::AppPaths;
use js2midi::sink::midir_transport::list_output_ports;
use js2midi::sink::{LogTransport, MidiTransport, MidirTransport};
use js2midi::Dispatcher;

/// Play joystick drum kits through a MIDI synthesizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: detected per platform)
    #[arg(short, long, env = "JS2MIDI_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Connect to the output port whose name contains this text
    #[arg(short, long)]
    port: Option<String>,

    /// MIDI channel to send on (1-16)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=16))]
    channel: Option<u8>,

    /// Log notes instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// List available MIDI output ports
    #[arg(long)]
    list_ports: bool,

    /// Print the effective mapping and exit
    #[arg(long)]
    print_config: bool,

    /// Convert a legacy .js2midirc file into the YAML config and exit
    #[arg(long, value_name = "RC_FILE")]
    import_rc: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        list_ports_formatted();
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = match args.config.clone() {
        Some(path) => path,
        None => {
            let paths = AppPaths::detect();
            if paths.is_portable {
                info!("Running in portable mode");
            }
            paths.config
        }
    };
    info!("Configuration file: {}", config_path.display());

    if let Some(rc) = &args.import_rc {
        let config = legacy::import_rc(rc).await?;
        config.save(&config_path).await?;
        info!("Imported {} into {}", rc.display(), config_path.display());
        print!("{}", config.describe());
        return Ok(ExitCode::SUCCESS);
    }

    if !config_path.exists() {
        import_legacy_rc(&config_path).await;
    }

    let mut config = config::load_or_init(&config_path).await;
    if let Some(port) = args.port {
        config.midi.output_port = Some(port);
    }
    if let Some(channel) = args.channel {
        config.midi.channel = channel;
    }

    if args.print_config {
        print!("{}", config.describe());
        return Ok(ExitCode::SUCCESS);
    }

    let transport: Box<dyn MidiTransport> = if args.dry_run {
        Box::new(LogTransport::new("dry-run"))
    } else {
        Box::new(MidirTransport::open(&config.midi).context("Failed to open MIDI output")?)
    };

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    let dispatcher = Dispatcher::new(&config, Arc::new(JoystickOpener));
    let report = match dispatcher.run(transport, shutdown).await {
        Ok(report) => report,
        Err(e) => {
            error!("MIDI output failed: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    if !report.success() {
        error!("No joystick could be opened, nothing to do");
        return Ok(ExitCode::FAILURE);
    }

    info!("js2midi shutdown complete");
    Ok(ExitCode::SUCCESS)
}

/// Seed a fresh config from `~/.js2midirc` when one exists
async fn import_legacy_rc(config_path: &Path) {
    let Some(rc) = AppPaths::legacy_rc().filter(|rc| rc.exists()) else {
        return;
    };

    info!("Found legacy mapping file {}, importing", rc.display());
    match legacy::import_rc(&rc).await {
        Ok(config) => {
            if let Err(e) = config.save(config_path).await {
                warn!("Failed to save imported config: {:#}", e);
            }
        }
        Err(e) => warn!("Failed to import {}: {:#}", rc.display(), e),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(true),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        // Without a handler the default SIGINT action still ends the process
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn list_ports_formatted() {
    use colored::*;

    println!("\n{}", "=== Available MIDI Outputs ===".bold().cyan());

    match list_output_ports(&AppConfig::default().midi.client_name) {
        Ok(ports) if ports.is_empty() => {
            println!("  {}", "No output ports found".dimmed());
        }
        Ok(ports) => {
            for (i, port) in ports.iter().enumerate() {
                println!("  {} {}", format!("[{}]", i).yellow(), port);
            }
        }
        Err(e) => println!("  {} {}", "MIDI unavailable:".red(), e),
    }

    println!(
        "\n{}",
        "Use --port <text> to connect to one, or omit it for a virtual port.".dimmed()
    );
}

//! `colorlog` - CLI for colorlogger
//!
//! Runs the logger on a host, with stdin standing in for the two buttons and a
//! directory standing in for the card, and offers tools for classifying
//! readings and inspecting log files.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::BufRead;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, warn};

use colorlogger::acquisition::{Controller, ControllerConfig, ControllerHandle};
use colorlogger::cli::{ClassifyCommand, Cli, Command, ConfigCommand, RunCommand, SummaryCommand};
use colorlogger::input::{Button, DebouncedInput};
use colorlogger::sensor::ScriptedSensor;
use colorlogger::status::{ChannelSink, Indicator, Led, StatusEvent};
use colorlogger::storage::{DirVolume, StorageManager};
use colorlogger::summary::LogSummary;
use colorlogger::{classify, init_logging, Config};

/// Status events buffered between the loop and the printer.
const STATUS_CHANNEL_CAPACITY: usize = 64;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Run(run_cmd) => handle_run(config, &run_cmd),
        Command::Classify(classify_cmd) => handle_classify(&classify_cmd),
        Command::Summary(summary_cmd) => handle_summary(&config, &summary_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_run(mut config: Config, cmd: &RunCommand) -> anyhow::Result<()> {
    if let Some(drive) = &cmd.drive {
        config.storage.drive.clone_from(drive);
    }
    if let Some(root) = &cmd.volume_root {
        config.storage.volume_root = Some(root.clone());
    }
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(run_logger(config, cmd))
}

async fn run_logger(config: Config, cmd: &RunCommand) -> anyhow::Result<()> {
    let root = config.volume_root();
    std::fs::create_dir_all(&root)
        .with_context(|| format!("failed to create volume directory {}", root.display()))?;
    info!(drive = %config.storage.drive, root = %root.display(), "Volume directory ready");

    let volume = DirVolume::single(config.storage.drive.clone(), root);
    let storage = StorageManager::with_flush_every(volume, config.storage.flush_every);
    let input = Arc::new(DebouncedInput::with_debounce(config.debounce()));
    let (sink, mut events) = ChannelSink::channel(STATUS_CHANNEL_CAPACITY);

    let mut controller = Controller::new(
        ControllerConfig::from(&config),
        storage,
        ScriptedSensor::palette(cmd.hold),
        sink,
        Arc::clone(&input),
    );
    let handle = controller.stop_handle();

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    println!("Keys: a = toggle recording, b = toggle mount, q = quit (then Enter)");
    spawn_button_reader(Arc::clone(&input), handle.clone(), Instant::now());

    if let Some(secs) = cmd.duration {
        let timer = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            info!(secs, "Run duration elapsed");
            timer.stop();
        });
    }

    controller.run().await;

    // Dropping the controller closes the status channel.
    drop(controller);
    printer.await.context("status printer failed")?;
    Ok(())
}

/// Read button presses from stdin on a dedicated thread.
///
/// Blocking reads stay off the runtime so shutdown never waits on the terminal.
fn spawn_button_reader(input: Arc<DebouncedInput>, handle: ControllerHandle, epoch: Instant) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let button = match line.trim() {
                "a" | "A" => Button::A,
                "b" | "B" => Button::B,
                "q" | "Q" => {
                    handle.stop();
                    break;
                }
                "" => continue,
                other => {
                    warn!(key = other, "Unknown key, expected a, b or q");
                    continue;
                }
            };
            if input.on_edge(button, epoch.elapsed()) {
                debug!(%button, "Button accepted");
            } else {
                debug!(%button, "Button ignored inside debounce window");
            }
        }
    });
}

fn print_event(event: &StatusEvent) {
    println!(
        "{:<18} {}",
        describe_indicator(event.indicator()),
        event.display_lines().join(" | ")
    );
}

fn describe_indicator(indicator: Indicator) -> String {
    let name = |led: Led| format!("{led:?}").to_lowercase();
    match (indicator.flash, indicator.steady) {
        (Some(flash), Some(steady)) => format!("[{}!>{}]", name(flash), name(steady)),
        (Some(flash), None) => format!("[{}!]", name(flash)),
        (None, Some(steady)) => format!("[{}]", name(steady)),
        (None, None) => String::new(),
    }
}

fn handle_classify(cmd: &ClassifyCommand) -> anyhow::Result<()> {
    let sample = cmd.sample();
    let label = classify(sample);

    if cmd.json {
        let output = serde_json::json!({
            "sample": sample,
            "label": label,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{sample} -> {label}");
    }
    Ok(())
}

fn handle_summary(config: &Config, cmd: &SummaryCommand) -> anyhow::Result<()> {
    let summary = LogSummary::from_file(&cmd.file)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let period = config.sample_period();
    println!("Log summary: {}", cmd.file.display());
    println!("==================");
    println!();
    println!("  Rows:          {}", summary.rows);
    println!(
        "  Duration:      {:.2} s at {} ms/sample",
        summary.duration(period).as_secs_f64(),
        period.as_millis()
    );
    println!("  Undetermined:  {}", summary.undetermined());
    if let Some(label) = summary.dominant() {
        println!("  Most common:   {label}");
    }
    if summary.is_contiguous() {
        println!("  Indices:       contiguous");
    } else {
        println!("  Indices:       {} gap(s)", summary.gaps.len());
        for gap in &summary.gaps {
            println!(
                "    line {}: expected {}, found {}",
                gap.line, gap.expected, gap.found
            );
        }
    }

    if !summary.labels.is_empty() {
        println!();
        println!("[Labels]");
        for entry in &summary.labels {
            println!("  {:<22} {:>6}", entry.label.to_string(), entry.count);
        }
    }

    if let Some(stats) = summary.stats {
        println!();
        println!("[Channels]          min     max      mean");
        for (name, channel) in [
            ("clear", stats.clear),
            ("red", stats.red),
            ("green", stats.green),
            ("blue", stats.blue),
        ] {
            println!(
                "  {name:<14} {:>7} {:>7} {:>9.1}",
                channel.min, channel.max, channel.mean
            );
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Drive:              {}", config.storage.drive);
                println!("  Volume root:        {}", config.volume_root().display());
                println!("  Sync every (rows):  {}", config.storage.flush_every);
                println!();
                println!("[Acquisition]");
                println!(
                    "  Tick interval (ms): {}",
                    config.acquisition.tick_interval_ms
                );
                println!(
                    "  Sample period (ms): {}",
                    config.acquisition.sample_period_ms
                );
                println!();
                println!("[Input]");
                println!("  Debounce (ms):      {}", config.input.debounce_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

//! CLI entry point for key-gesture-engine
//!
//! Provides command-line interface for checking gesture configs,
//! simulating event scripts, and watching a config for live changes.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use key_gesture_engine::config::{ConfigError, ConfigManager, ConfigWatcher, LoadedConfig};
use key_gesture_engine::core::parser::{parse_event_script, ScriptStep};
use key_gesture_engine::core::{Channel, Outcome, Trigger, TriggerKind};
use key_gesture_engine::dispatch::{LoggingDispatcher, RecordingDispatcher};
use key_gesture_engine::engine::{
    Engine, EventResponse, GateDecision, HostConditions, TimerResponse,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "key-gesture-engine")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a gesture config and list its bindings
    Check {
        /// Path to gesture config file
        #[arg(short, long, default_value = "~/.config/key-gestures/gestures.conf")]
        config: PathBuf,
    },

    /// Run an event script through the engine
    Simulate {
        /// Path to gesture config file
        #[arg(short, long, default_value = "~/.config/key-gestures/gestures.conf")]
        config: PathBuf,

        /// Event script (`<ms> down|up CHANNEL [repeat=N] [synthetic]` or `<ms> tick`)
        script: PathBuf,

        /// Simulate a secure lock screen
        #[arg(long)]
        secure_lock: bool,

        /// Simulate kiosk / locked-task mode
        #[arg(long)]
        kiosk: bool,

        /// Simulate an on-screen navigation bar
        #[arg(long)]
        substitute_input: bool,
    },

    /// Hold an engine on a config file and apply every change live
    Watch {
        /// Path to gesture config file
        #[arg(short, long, default_value = "~/.config/key-gestures/gestures.conf")]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Check { config } => check_config(&config)?,
        Commands::Simulate {
            config,
            script,
            secure_lock,
            kiosk,
            substitute_input,
        } => {
            let host = HostConditions::new();
            host.set_secure_lock_showing(secure_lock);
            host.set_kiosk_mode(kiosk);
            host.set_substitute_input_active(substitute_input);
            simulate(&config, &script, host)?
        }
        Commands::Watch { config } => watch(&config)?,
    }

    Ok(())
}

/// Expands `~` and checks the path is valid UTF-8
fn expand_path(path: &Path) -> anyhow::Result<PathBuf> {
    let expanded = shellexpand::tilde(
        path.to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?,
    );
    Ok(PathBuf::from(expanded.as_ref()))
}

fn load(config_path: &Path) -> anyhow::Result<(ConfigManager, LoadedConfig)> {
    let path = expand_path(config_path)?;
    let manager = ConfigManager::new(path)?;
    let loaded = manager.load()?;
    Ok((manager, loaded))
}

/// Validate config and list every binding
fn check_config(config_path: &Path) -> anyhow::Result<()> {
    let (manager, loaded) = load(config_path)?;
    let config = &loaded.snapshot.config;

    println!("{} Parsing config: {}", "→".cyan(), manager.path().display());
    println!(
        "  double tap window {}ms, long press {}ms, keys {}",
        config.double_tap_window_ms,
        config.default_long_press_timeout_ms,
        if config.global_keys_enabled { "enabled" } else { "disabled" },
    );

    let mut overrides: Vec<_> = config.per_action_long_press_timeout_ms.iter().collect();
    overrides.sort();
    for (action, timeout_ms) in overrides {
        println!("  long press {} after {}ms", action.to_string().magenta(), timeout_ms);
    }

    for channel in Channel::ALL {
        for kind in TriggerKind::ALL {
            let gate = config.gate_for(channel, kind);
            if gate != Default::default() {
                println!(
                    "  {} {} gated: {}",
                    channel.to_string().cyan(),
                    kind.to_string().magenta(),
                    gate
                );
            }
        }
    }
    println!();

    let bound: Vec<_> = loaded.snapshot.bindings.bound().collect();
    for (channel, kind, binding) in &bound {
        println!(
            "{} {} → {}",
            channel.to_string().cyan().bold(),
            kind.to_string().magenta(),
            binding.to_string().green(),
        );
    }
    println!("\n{} Total: {} bindings", "✓".green(), bound.len());

    if loaded.rejected.is_empty() {
        println!("{} {}", "✓".green().bold(), "All bindings valid!".bold());
    } else {
        println!(
            "\n{} {} binding{} fell back to default:\n",
            "✗".red().bold(),
            loaded.rejected.len(),
            if loaded.rejected.len() == 1 { "" } else { "s" }
        );
        for rejected in &loaded.rejected {
            println!("  {} {}", "•".dimmed(), rejected);
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Run an event script and print every decision
fn simulate(config_path: &Path, script_path: &Path, host: HostConditions) -> anyhow::Result<()> {
    let (_, loaded) = load(config_path)?;

    let script_path = expand_path(script_path)?;
    let content = fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read script {}", script_path.display()))?;
    let steps = parse_event_script(&content)?;

    let mut engine = Engine::from_snapshot(loaded.snapshot, host, RecordingDispatcher::new());
    let mut dispatched = 0;

    for step in steps {
        match step {
            ScriptStep::Event(event) => {
                let response = engine.on_event(event);
                print_timers(&response.expired);
                print_event(&event.to_string(), &response);
            }
            ScriptStep::Tick(now_ms) => print_timers(&engine.advance_to(now_ms)),
        }
        dispatched += engine.dispatcher().take().len();
    }

    // Let whatever is still pending resolve
    while let Some(deadline) = engine.next_deadline() {
        print_timers(&engine.advance_to(deadline));
        dispatched += engine.dispatcher().take().len();
    }

    println!(
        "\n{} {} action{} dispatched",
        "✓".green(),
        dispatched,
        if dispatched == 1 { "" } else { "s" }
    );
    Ok(())
}

fn print_event(label: &str, response: &EventResponse) {
    let mut note = match response.gate {
        GateDecision::Intercept => String::new(),
        GateDecision::Bypass(reason) => format!(" (bypass: {})", reason).dimmed().to_string(),
    };
    if response.replay_interrupted_tap {
        note.push_str(&" (replay interrupted tap)".yellow().to_string());
    }
    println!(
        "{:<32} {}{}{}",
        label,
        paint(response.outcome),
        fired(response.trigger.as_ref()),
        note
    );
}

fn print_timers(responses: &[TimerResponse]) {
    for response in responses {
        println!(
            "{:<32} {}{}",
            format!("  {}", response.handle).dimmed().to_string(),
            paint(response.outcome),
            fired(response.trigger.as_ref())
        );
    }
}

fn paint(outcome: Outcome) -> ColoredString {
    match outcome {
        Outcome::Consume => outcome.to_string().green(),
        Outcome::PassThroughDefault => outcome.to_string().dimmed(),
        Outcome::ReplayOriginal => outcome.to_string().yellow(),
    }
}

fn fired(trigger: Option<&Trigger>) -> String {
    trigger
        .map(|t| format!("  ⚡ {} → {}", t.kind, t.binding).magenta().bold().to_string())
        .unwrap_or_default()
}

/// Keep an engine alive and feed it config changes from a watcher thread
fn watch(config_path: &Path) -> anyhow::Result<()> {
    let (manager, loaded) = load(config_path)?;
    println!("{} Watching config: {}", "→".cyan(), manager.path().display());

    let mut engine = Engine::from_snapshot(
        loaded.snapshot.clone(),
        HostConditions::new(),
        LoggingDispatcher,
    );
    let handle = engine.config_handle();
    let mut watcher = ConfigWatcher::new(manager, loaded.snapshot)?;

    let worker = thread::Builder::new()
        .name("config-watch".to_string())
        .spawn(move || -> anyhow::Result<()> {
            loop {
                let messages = match watcher.wait_for_changes(Duration::from_secs(1)) {
                    Ok(messages) => messages,
                    Err(e @ ConfigError::WatcherStopped) => return Err(e.into()),
                    Err(e) => {
                        // A half-written file is common mid-save; keep the last good config
                        println!("{} {}", "✗".red(), e);
                        continue;
                    }
                };
                for message in messages {
                    println!("{} {}", "✓".green(), message);
                    handle.send(message)?;
                }
            }
        })?;

    let started = Instant::now();
    loop {
        thread::sleep(Duration::from_millis(100));
        let now_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        engine.advance_to(now_ms);

        if worker.is_finished() {
            break;
        }
    }

    info!("config watcher stopped");
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("config watcher panicked"))?
}

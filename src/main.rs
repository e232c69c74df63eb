//! MoodSense CLI
//!
//! Multi-modal mood estimation engine.

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moodsense::{
    capture::{self, WavFormat},
    config::Config,
    engine::{MoodEngine, SessionTimerState},
    replay,
    verdict_log::VerdictLog,
    VERSION,
};

#[derive(Parser)]
#[command(name = "moodsense")]
#[command(version = VERSION)]
#[command(about = "Multi-modal mood estimation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded JSONL trace through the engine
    Replay {
        /// Path to the trace file
        trace: PathBuf,
    },

    /// Run a focus session with a live countdown
    Session {
        /// Session length in minutes (default from config)
        #[arg(long)]
        minutes: Option<u64>,
    },

    /// Wrap a raw PCM capture in a WAV container
    Wav {
        /// Path to the raw 16-bit little-endian PCM file
        input: PathBuf,

        /// Output path (defaults to the input with a .wav extension)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show verdict statistics from previous sessions
    Status,

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { trace } => cmd_replay(&trace),
        Commands::Session { minutes } => cmd_session(minutes),
        Commands::Wav { input, output } => cmd_wav(&input, output),
        Commands::Status => cmd_status(),
        Commands::Config => cmd_config(),
    }
}

fn load_config() -> Config {
    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    config
}

fn engine_from_config(config: &Config) -> MoodEngine {
    let log = Arc::new(VerdictLog::with_persistence(
        config.data_path.join("verdict_stats.json"),
        config.data_path.join("feature_log.csv"),
    ));
    MoodEngine::with_log(
        config.audio_window_steps,
        config.analysis_stride,
        config.session_duration,
        log,
    )
}

fn cmd_replay(trace: &std::path::Path) {
    println!("MoodSense v{VERSION}");
    println!();

    let config = load_config();
    let mut engine = engine_from_config(&config);
    println!("Instance ID: {}", engine.instance_id());
    println!("Replaying {trace:?}...");
    println!();

    match replay::replay_file(&mut engine, trace) {
        Ok(verdicts) => {
            for verdict in &verdicts {
                println!(
                    "[{}] {} (confidence {:.2})",
                    Utc::now().format("%H:%M:%S"),
                    verdict.label,
                    verdict.confidence
                );
            }
            println!();
            println!("{}", engine.log().summary());
            engine.shutdown();
        }
        Err(e) => {
            eprintln!("Error replaying trace: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_session(minutes: Option<u64>) {
    let mut config = load_config();
    if let Some(m) = minutes {
        config.session_duration = Duration::from_secs(m * 60);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            std::process::exit(1);
        }
    };

    let engine = engine_from_config(&config);
    let mut rx = engine.timer().observe();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    println!(
        "Starting a {} minute session. Press Ctrl+C to cancel.",
        config.session_duration.as_secs() / 60
    );
    println!();

    runtime.block_on(async {
        let handle = engine.start_session();
        loop {
            if !running.load(Ordering::SeqCst) {
                println!();
                println!("Session cancelled.");
                engine.timer().cancel();
                break;
            }
            match tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
                Ok(Ok(SessionTimerState::Running { .. })) => {
                    let state = engine.timer().snapshot();
                    print!("\r{:02}:{:02} remaining ", state.minutes(), state.seconds());
                    use std::io::Write;
                    let _ = std::io::stdout().flush();
                }
                Ok(Ok(SessionTimerState::Finished { message })) => {
                    println!();
                    println!("{message}");
                    break;
                }
                Ok(Ok(SessionTimerState::Inactive)) => {}
                Ok(Err(_)) => break,
                Err(_) => {} // timeout, poll the cancel flag again
            }
        }
        let _ = handle.await;
    });

    engine.shutdown();
}

fn cmd_wav(input: &std::path::Path, output: Option<PathBuf>) {
    let config = load_config();
    let pcm = match std::fs::read(input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {input:?}: {e}");
            std::process::exit(1);
        }
    };

    let format = WavFormat {
        channels: config.channels,
        sample_rate: config.sample_rate,
    };
    let wav = capture::encode(&pcm, format);

    let output_path = output.unwrap_or_else(|| input.with_extension("wav"));
    if let Err(e) = std::fs::write(&output_path, &wav) {
        eprintln!("Error writing {output_path:?}: {e}");
        std::process::exit(1);
    }
    println!(
        "Wrapped {} bytes of PCM ({} Hz, {} channel(s)) into {:?}",
        pcm.len(),
        format.sample_rate,
        format.channels,
        output_path
    );
}

fn cmd_status() {
    let config = load_config();

    println!("MoodSense Status");
    println!("================");
    println!();
    println!("Configuration:");
    println!(
        "  Session length: {} minutes",
        config.session_duration.as_secs() / 60
    );
    println!("  Audio window: {} steps", config.audio_window_steps);
    println!("  Cadence stride: every {} events", config.analysis_stride);
    println!();

    let stats_path = config.data_path.join("verdict_stats.json");
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                if let Some(face) = stats.get("face_cycles") {
                    println!("  Face cycles: {face}");
                }
                if let Some(audio) = stats.get("audio_cycles") {
                    println!("  Audio cycles: {audio}");
                }
                if let Some(typing) = stats.get("typing_cycles") {
                    println!("  Typing cycles: {typing}");
                }
                if let Some(errors) = stats.get("error_cycles") {
                    println!("  No-subject cycles: {errors}");
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}

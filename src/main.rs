use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use couch_guardian_sfx::audio_system::{AudioOutput, PcmBuffer};
use couch_guardian_sfx::{
    HeadlessOutput, ParamOverrides, PlaybackHandle, RodioOutput, SoundConfig, SoundName,
    SoundSystem, Synthesizer,
};

/// Longest time a single-sound command waits for playback to end
const MAX_WAIT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "couch-guardian-sfx", about = "Couch Guardian sound effects", version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Asset base override: a directory or an http(s) URL
    #[arg(long, global = true)]
    assets: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play every sound through the sound system, one per gap
    TestAll {
        #[arg(long, default_value_t = 1000)]
        gap_ms: u64,
    },

    /// Play every synthesized effect directly, then the ambient loop
    TestSynth {
        #[arg(long, default_value_t = 5)]
        ambient_seconds: u64,
    },

    /// Play one sound by name (e.g. level-up)
    Play { name: String },

    /// Play the sound for a game event (e.g. cursed_push)
    Event { name: String },

    /// Play push feedback for a score delta
    Push {
        #[arg(allow_negative_numbers = true)]
        delta: f32,

        #[arg(long)]
        cursed: bool,
    },

    /// Play the ambient loop for a while
    Ambient {
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },

    /// Render a synthesized sound to a WAV file
    Render { name: String, out: PathBuf },

    /// Flip the persisted enabled flag
    Toggle,

    /// Set the persisted master volume (0.0-1.0)
    Volume { volume: f32 },
}

/// Initialize tracing with file rotation
///
/// Logs are written to:
/// - Linux: ~/.config/CouchGuardian/logs/
/// - macOS: ~/Library/Application Support/CouchGuardian/logs/
/// - Windows: %APPDATA%\CouchGuardian\logs\
///
/// Log files rotate daily. In debug builds logs also go to stdout.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Get log directory in user config folder
    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("CouchGuardian").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    // Create log directory if it doesn't exist
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    // Create file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "couch-guardian-sfx.log");

    // Configure filter (info level by default)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    // In debug builds, also log to console
    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    // In release builds, only log to file
    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

fn main() -> Result<()> {
    initialize_tracing();
    tracing::info!("Starting couch-guardian-sfx v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SoundConfig::load_from(path),
        None => SoundConfig::load(),
    }
    .context("Failed to load sound config")?;
    if let Some(assets) = cli.assets {
        config.asset_base = assets;
    }

    match cli.command {
        Command::TestAll { gap_ms } => test_all(config, Duration::from_millis(gap_ms)),
        Command::TestSynth { ambient_seconds } => {
            test_synth(config, Duration::from_secs(ambient_seconds))
        }
        Command::Play { name } => {
            let name: SoundName = name.parse()?;
            let sounds = audible_system(config)?;
            sounds.resolve(name)?;
            let handle = sounds.play(name, ParamOverrides::none());
            wait_for(handle, MAX_WAIT);
            Ok(())
        }
        Command::Event { name } => {
            let sounds = audible_system(config)?;
            sounds.preload(&SoundName::ALL);
            match sounds.play_game_event(&name) {
                Some(handle) => wait_for(Some(handle), MAX_WAIT),
                None => bail!("No sound played for event '{}'", name),
            }
            Ok(())
        }
        Command::Push { delta, cursed } => {
            let sounds = audible_system(config)?;
            sounds.preload(&[SoundName::PushPositive, SoundName::PushNegative, SoundName::Cursed]);
            let handle = sounds.play_push_sound(delta, cursed);
            if let Some(handle) = &handle {
                println!("✓ {} ({})", handle.name(), handle.backend());
            }
            wait_for(handle, MAX_WAIT);
            Ok(())
        }
        Command::Ambient { seconds } => {
            let sounds = audible_system(config)?;
            let handle = sounds
                .start_ambient()
                .context("Ambient sound could not be started")?;
            println!("🌫️ Ambient via {} for {}s", handle.backend(), seconds);
            thread::sleep(Duration::from_secs(seconds));
            sounds.dispose();
            Ok(())
        }
        Command::Render { name, out } => {
            let name: SoundName = name.parse()?;
            render(name, &out, config.note_spacing())
        }
        Command::Toggle => {
            let sounds = SoundSystem::builder(config).build();
            let enabled = sounds.toggle();
            println!("Sound {}", if enabled { "enabled 🔊" } else { "disabled 🔇" });
            Ok(())
        }
        Command::Volume { volume } => {
            let sounds = SoundSystem::builder(config).build();
            sounds.set_master_volume(volume);
            println!("Master volume: {:.2}", sounds.master_volume());
            Ok(())
        }
    }
}

/// Sound system on the default output device
fn audible_system(config: SoundConfig) -> Result<SoundSystem> {
    let output = RodioOutput::new().context("No audio output device")?;
    let sounds = SoundSystem::builder(config)
        .with_output(Arc::new(output))
        .build();
    sounds.init();

    if !sounds.is_enabled() {
        println!("Sound is disabled; run `couch-guardian-sfx toggle` to enable it");
    }
    Ok(sounds)
}

fn wait_for(handle: Option<PlaybackHandle>, limit: Duration) {
    let Some(handle) = handle else {
        return;
    };
    let started = Instant::now();
    while handle.is_active() && started.elapsed() < limit {
        thread::sleep(Duration::from_millis(20));
    }
}

fn test_all(config: SoundConfig, gap: Duration) -> Result<()> {
    let sounds = audible_system(config)?;
    sounds.preload(&SoundName::ALL);

    for name in SoundName::ALL {
        println!("Testing: {}", name);
        match sounds.play(name, ParamOverrides::none()) {
            Some(handle) => println!("  ✓ {}", handle.backend()),
            None => println!("  ✗ not played"),
        }
        thread::sleep(gap);
    }

    sounds.dispose();
    Ok(())
}

fn test_synth(config: SoundConfig, ambient: Duration) -> Result<()> {
    let output: Arc<dyn AudioOutput> =
        Arc::new(RodioOutput::new().context("No audio output device")?);
    let synth = Synthesizer::new(Arc::clone(&output))?.with_note_spacing(config.note_spacing());

    println!("🔊 Testing synthesized sounds...");
    let steps: [(SoundName, u64); 7] = [
        (SoundName::PushPositive, 300),
        (SoundName::PushNegative, 400),
        (SoundName::Cursed, 600),
        (SoundName::LevelUp, 400),
        (SoundName::GameStart, 500),
        (SoundName::ButtonClick, 200),
        (SoundName::Notification, 200),
    ];
    for (name, delay) in steps {
        println!("🎵 {}", name);
        synth.play(name, Default::default())?;
        thread::sleep(Duration::from_millis(delay));
    }

    thread::sleep(Duration::from_millis(500));
    println!("🌫️ Ambient for {}s", ambient.as_secs());
    let voice = synth.ambient()?;
    thread::sleep(ambient);
    voice.stop();

    output.dispose();
    Ok(())
}

/// Offline render through a device-free output
fn render(name: SoundName, out: &Path, note_spacing: Duration) -> Result<()> {
    let output = Arc::new(HeadlessOutput::silent());
    let synth = Synthesizer::new(output)?.with_note_spacing(note_spacing);
    let buffer = synth.render(name)?;

    write_wav(&buffer, out).with_context(|| format!("Failed to write {}", out.display()))?;
    println!(
        "✓ Rendered {} ({:.2}s, {} Hz) to {}",
        name,
        buffer.duration().as_secs_f32(),
        buffer.sample_rate(),
        out.display()
    );
    Ok(())
}

fn write_wav(buffer: &PcmBuffer, out: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(out, spec)?;
    for &sample in buffer.samples() {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

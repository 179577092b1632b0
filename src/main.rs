use std::fs;
use std::io::{self, BufRead, Read};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use ghostwriter::cadence::{CadenceProfile, TextStats};
use ghostwriter::control::{self, Command, Controller, EngineOptions, RunRequest};
use ghostwriter::keyboard::find_first_unsupported_char;
use ghostwriter::observer::{ConsoleObserver, RunEvent, RunOutcome};
use ghostwriter::playback::PlaybackBackend;
use ghostwriter::rewrite::{self, openrouter::OpenRouterRewriter, Intensity};
use ghostwriter::settings::{Profile, Settings};
use ghostwriter::sim::EditorSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlaybackBackendArg {
    Auto,
    X11,
    Terminal,
}

impl PlaybackBackendArg {
    fn to_library(self) -> PlaybackBackend {
        match self {
            PlaybackBackendArg::Auto => PlaybackBackend::Auto,
            PlaybackBackendArg::X11 => PlaybackBackend::X11,
            PlaybackBackendArg::Terminal => PlaybackBackend::Terminal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    CarefulStudent,
    SloppyRusher,
    MethodicalWriter,
}

impl ProfileArg {
    fn to_library(self) -> Profile {
        match self {
            ProfileArg::CarefulStudent => Profile::CarefulStudent,
            ProfileArg::SloppyRusher => Profile::SloppyRusher,
            ProfileArg::MethodicalWriter => Profile::MethodicalWriter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IntensityArg {
    Light,
    Moderate,
    Heavy,
}

impl IntensityArg {
    fn to_library(self) -> Intensity {
        match self {
            IntensityArg::Light => Intensity::Light,
            IntensityArg::Moderate => Intensity::Moderate,
            IntensityArg::Heavy => Intensity::Heavy,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct SettingsArgs {
    /// JSON settings file; missing keys take the defaults.
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Built-in typing personality. Overrides everything but the duration.
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Target session length in minutes.
    #[arg(long)]
    minutes: Option<f64>,

    #[arg(long)]
    wpm: Option<f64>,

    /// Chance (0-100) that an eligible word gets a typo.
    #[arg(long)]
    error_rate: Option<f64>,

    /// Chance (0-100) per word that a pending typo is fixed now instead of later.
    #[arg(long)]
    correction_delay: Option<f64>,

    /// Chance (0-100) of a short thinking pause before a word.
    #[arg(long)]
    thinking_chance: Option<f64>,

    /// Chance (0-100) of a long AFK break between words.
    #[arg(long)]
    afk_chance: Option<f64>,
}

impl SettingsArgs {
    fn resolve(&self) -> Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(profile) = self.profile {
            settings = settings.with_profile(profile.to_library());
        }

        let overrides = [
            (self.minutes, &mut settings.total_minutes),
            (self.wpm, &mut settings.wpm),
            (self.error_rate, &mut settings.error_rate),
            (self.correction_delay, &mut settings.correction_delay),
            (self.thinking_chance, &mut settings.thinking_chance),
            (self.afk_chance, &mut settings.afk_chance),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }

        settings.validate().context("invalid settings")?;
        Ok(settings)
    }
}

#[derive(Debug, Parser)]
#[command(name = "ghostwriter")]
#[command(about = "Types text into the focused window at a human pace, typos included", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Type a text into the currently focused editor
    Run {
        /// Keystroke backend.
        ///
        /// - auto: X11 when a display is available
        /// - x11: inject keystrokes through XTEST
        /// - terminal: echo keystrokes to this terminal
        #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
        backend: PlaybackBackendArg,

        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Seconds to wait before the first keystroke
        #[arg(long, default_value_t = 5)]
        lead_in: u64,

        /// Optional RNG seed (for debugging)
        #[arg(long)]
        seed: Option<u64>,

        /// Paraphrase the text through OpenRouter before typing it
        #[arg(long, value_enum, value_name = "INTENSITY")]
        rewrite: Option<IntensityArg>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Run the engine instantly against an in-memory editor
    Simulate {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Write the final editor text here instead of stdout
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Print the computed cadence for a text (JSON)
    Cadence {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// List the built-in profiles (JSON)
    Profiles,
}

#[derive(Debug, Serialize)]
struct ProfileListing {
    name: Profile,
    label: &'static str,
    settings: Settings,
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_output(path: &PathBuf, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();
}

/// Forward `p` (pause/resume) and `s` (stop) lines from stdin to the run.
fn spawn_stdin_control(commands: Sender<Command>) {
    let spawned = thread::Builder::new()
        .name("stdin-control".to_string())
        .spawn(move || {
            let mut paused = false;
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let command = match line.trim() {
                    "p" => {
                        paused = !paused;
                        if paused {
                            Command::Pause
                        } else {
                            Command::Resume
                        }
                    }
                    "s" => Command::Stop,
                    _ => continue,
                };
                if commands.send(command).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        tracing::warn!("stdin control unavailable: {err}");
    }
}

fn run(
    input: PathBuf,
    backend: PlaybackBackendArg,
    lead_in: u64,
    seed: Option<u64>,
    intensity: Option<IntensityArg>,
    settings: Settings,
) -> Result<()> {
    // Fail fast on unsupported environments/backends.
    let resolved = ghostwriter::playback::resolve_backend(backend.to_library())?;

    let mut text = read_input(&input)?;
    if let Some(intensity) = intensity {
        let console = ConsoleObserver;
        text = match OpenRouterRewriter::from_env() {
            Ok(rewriter) => {
                rewrite::rewrite_or_original(&rewriter, &text, intensity.to_library(), &console)
            }
            Err(err) => {
                eprintln!("Rewrite unavailable ({err}). Typing the original text.");
                text
            }
        };
    }

    if resolved == PlaybackBackend::X11 {
        if let Some((idx, c)) = find_first_unsupported_char(&text) {
            return Err(anyhow!(
                "character {c:?} at byte {idx} cannot be typed with the US keyboard layout"
            ));
        }
    }

    let stats = TextStats::of(&text);
    let cadence = CadenceProfile::compute(&settings, stats);
    eprintln!(
        "Typing: {} chars, {} words, ~{:.1} min at {:.0} WPM",
        stats.chars,
        stats.words,
        settings.total_minutes,
        settings.wpm
    );
    tracing::debug!(?cadence, "computed cadence");

    let sink = ghostwriter::playback::open_sink(backend.to_library())?;
    let (events_tx, events_rx) = mpsc::channel::<RunEvent>();

    let request = RunRequest {
        text,
        settings,
        options: EngineOptions {
            lead_in: Duration::from_secs(lead_in),
            ..Default::default()
        },
        seed,
    };

    let mut controller = Controller::new();
    controller.start(request, sink, Box::new(events_tx))?;
    let commands = controller
        .commands()
        .ok_or_else(|| anyhow!("typing run did not start"))?;

    {
        let commands = commands.clone();
        ctrlc::set_handler(move || {
            let _ = commands.send(Command::Stop);
        })
        .context("failed to install Ctrl+C handler")?;
    }
    if input.as_os_str() != std::ffi::OsStr::new("-") {
        eprintln!("Type 'p' + Enter to pause or resume, 's' + Enter to stop.");
        spawn_stdin_control(commands);
    }

    for event in events_rx {
        ConsoleObserver::print_event(&event);
        if matches!(event, RunEvent::Finished(_)) {
            break;
        }
    }

    match controller.wait() {
        Some(RunOutcome::Faulted) => Err(anyhow!("typing run failed")),
        _ => Ok(()),
    }
}

fn simulate(
    input: PathBuf,
    output: Option<PathBuf>,
    seed: Option<u64>,
    settings: Settings,
) -> Result<()> {
    let text = read_input(&input)?;
    let request = RunRequest {
        text,
        settings,
        options: EngineOptions {
            lead_in: Duration::ZERO,
            time_scale: 0.0,
            ..Default::default()
        },
        seed,
    };

    let mut editor = EditorSink::new();
    let (_commands, commands_rx) = mpsc::channel();
    let (events_tx, events_rx) = mpsc::channel::<RunEvent>();
    let outcome = control::execute(
        &request,
        &mut editor,
        &events_tx,
        commands_rx,
        control::rng_from_seed(seed),
    );
    drop(events_tx);

    let corrections = events_rx
        .iter()
        .filter(|event| matches!(event, RunEvent::Status(line) if line == "Fixed."))
        .count();
    let stats = editor.stats();
    eprintln!(
        "Simulated ({outcome}): {} keystrokes, {} backspaces, {} cursor moves, {corrections} corrections",
        stats.keystrokes, stats.backspaces, stats.cursor_moves
    );

    let typed = editor.text();
    if let Some(out) = output {
        write_output(&out, &typed)?;
    } else {
        println!("{typed}");
    }

    if outcome == RunOutcome::Faulted {
        return Err(anyhow!("simulated run failed"));
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Cmd::Run {
            backend,
            input,
            lead_in,
            seed,
            rewrite,
            settings,
        } => {
            let settings = settings.resolve()?;
            run(input, backend, lead_in, seed, rewrite, settings)?;
        }
        Cmd::Simulate {
            input,
            output,
            seed,
            settings,
        } => {
            let settings = settings.resolve()?;
            simulate(input, output, seed, settings)?;
        }
        Cmd::Cadence { input, settings } => {
            let settings = settings.resolve()?;
            let text = read_input(&input)?;
            let cadence = CadenceProfile::for_text(&settings, &text);
            let json =
                serde_json::to_string_pretty(&cadence).context("failed to serialize cadence")?;
            println!("{json}");
        }
        Cmd::Profiles => {
            let listing: Vec<ProfileListing> = Profile::ALL
                .iter()
                .map(|&profile| ProfileListing {
                    name: profile,
                    label: profile.label(),
                    settings: profile.settings(),
                })
                .collect();
            let json =
                serde_json::to_string_pretty(&listing).context("failed to serialize profiles")?;
            println!("{json}");
        }
    }

    Ok(())
}

pub mod backends;

use anyhow::{anyhow, Result};

use crate::sink::KeystrokeSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackBackend {
    Auto,
    X11,
    Terminal,
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn detected_environment() -> String {
    let mut parts = Vec::new();
    for name in ["WAYLAND_DISPLAY", "DISPLAY"] {
        if env_is_set(name) {
            parts.push(format!("{name} is set"));
        }
    }
    if let Ok(kind) = std::env::var("XDG_SESSION_TYPE") {
        if !kind.is_empty() {
            parts.push(format!("XDG_SESSION_TYPE={kind}"));
        }
    }

    if parts.is_empty() {
        "No display session detected.".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

pub fn resolve_backend(requested: PlaybackBackend) -> Result<PlaybackBackend> {
    match requested {
        PlaybackBackend::Terminal => Ok(PlaybackBackend::Terminal),
        PlaybackBackend::X11 => {
            if cfg!(feature = "x11") {
                Ok(PlaybackBackend::X11)
            } else {
                Err(anyhow!(
                    "X11 backend requested but is disabled in this build (rebuild with `--features x11`)."
                ))
            }
        }
        PlaybackBackend::Auto => {
            if cfg!(feature = "x11") && env_is_set("DISPLAY") {
                if env_is_set("WAYLAND_DISPLAY") {
                    tracing::warn!("Wayland session detected; keystrokes only reach Xwayland windows");
                }
                return Ok(PlaybackBackend::X11);
            }
            Err(anyhow!(
                "No supported keystroke backend detected. {details}\n\
                 Pass `--backend terminal` to echo keystrokes to this terminal instead.",
                details = detected_environment(),
            ))
        }
    }
}

/// Open a keystroke sink for `backend`, resolving `Auto` first.
pub fn open_sink(backend: PlaybackBackend) -> Result<Box<dyn KeystrokeSink + Send>> {
    let resolved = resolve_backend(backend)?;
    tracing::info!(?resolved, "opening keystroke sink");

    match resolved {
        PlaybackBackend::Terminal => Ok(Box::new(backends::terminal::TerminalSink::stdout())),
        PlaybackBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                Ok(Box::new(backends::x11::X11Sink::connect()?))
            }

            #[cfg(not(feature = "x11"))]
            {
                Err(anyhow!(
                    "X11 backend is disabled in this build (rebuild with `--features x11`)."
                ))
            }
        }
        PlaybackBackend::Auto => Err(anyhow!("no backend resolved")),
    }
}

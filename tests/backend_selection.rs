use std::ffi::OsString;
use std::sync::{Mutex, OnceLock};

use ghostwriter::playback::{resolve_backend, PlaybackBackend};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

struct EnvRestore {
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EnvRestore {
    fn snapshot() -> Self {
        Self {
            saved: ["DISPLAY", "WAYLAND_DISPLAY", "XDG_SESSION_TYPE"]
                .into_iter()
                .map(|name| (name, std::env::var_os(name)))
                .collect(),
        }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        // SAFETY: modifying the process environment is not thread-safe in general.
        // These tests serialize all env var mutations via the `env_lock()` mutex.
        for (name, value) in &self.saved {
            match value {
                Some(v) => unsafe { std::env::set_var(name, v) },
                None => unsafe { std::env::remove_var(name) },
            }
        }
    }
}

fn unset(name: &str) {
    // SAFETY: callers hold the global test mutex from `env_lock()`.
    unsafe { std::env::remove_var(name) };
}

fn set(name: &str, value: &str) {
    // SAFETY: callers hold the global test mutex from `env_lock()`.
    unsafe { std::env::set_var(name, value) };
}

#[test]
fn terminal_is_always_available() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    unset("DISPLAY");
    unset("WAYLAND_DISPLAY");

    let resolved = resolve_backend(PlaybackBackend::Terminal).expect("should resolve");
    assert_eq!(resolved, PlaybackBackend::Terminal);
}

#[test]
fn auto_without_a_display_suggests_the_terminal() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    unset("DISPLAY");
    unset("WAYLAND_DISPLAY");
    set("XDG_SESSION_TYPE", "tty");

    let err = resolve_backend(PlaybackBackend::Auto).unwrap_err();
    let msg = format!("{err:#}");
    assert!(
        msg.contains("No supported keystroke backend detected"),
        "expected missing-backend wording, got: {msg}"
    );
    assert!(msg.contains("XDG_SESSION_TYPE=tty"), "got: {msg}");
    assert!(msg.contains("--backend terminal"), "got: {msg}");
}

#[test]
fn auto_picks_x11_when_display_is_set() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    unset("WAYLAND_DISPLAY");
    set("DISPLAY", ":0");

    #[cfg(feature = "x11")]
    {
        let resolved = resolve_backend(PlaybackBackend::Auto).expect("should resolve");
        assert_eq!(resolved, PlaybackBackend::X11);
    }

    #[cfg(not(feature = "x11"))]
    {
        let err = resolve_backend(PlaybackBackend::Auto).unwrap_err();
        let msg = format!("{err:#}");
        assert!(
            msg.contains("DISPLAY is set"),
            "expected mention of DISPLAY, got: {msg}"
        );
    }
}

#[test]
fn explicit_x11_is_rejected_or_accepted() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    unset("DISPLAY");

    #[cfg(feature = "x11")]
    {
        let resolved = resolve_backend(PlaybackBackend::X11).expect("should resolve");
        assert_eq!(resolved, PlaybackBackend::X11);
    }

    #[cfg(not(feature = "x11"))]
    {
        let err = resolve_backend(PlaybackBackend::X11).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("X11"));
        assert!(msg.contains("disabled"));
    }
}

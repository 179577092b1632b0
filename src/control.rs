use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::TypingEngine;
use crate::error::{Error, Result};
use crate::observer::{Observer, RunOutcome};
use crate::settings::Settings;
use crate::sink::KeystrokeSink;

/// Requests from the control surface to a running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Stop,
    Pause,
    Resume,
}

/// Lifecycle of one typing run.
///
/// - Idle -> Starting (lead-in countdown)
/// - Starting -> Running | Paused
/// - Running <-> Paused
/// - Running -> Finished
/// - Starting | Running | Paused -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    Idle,
    Starting,
    Running,
    Paused,
    Stopped,
    Finished,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "Idle"),
            RunPhase::Starting => write!(f, "Starting"),
            RunPhase::Running => write!(f, "Running"),
            RunPhase::Paused => write!(f, "Paused"),
            RunPhase::Stopped => write!(f, "Stopped"),
            RunPhase::Finished => write!(f, "Finished"),
        }
    }
}

impl RunPhase {
    pub fn can_transition_to(self, target: RunPhase) -> bool {
        matches!(
            (self, target),
            (RunPhase::Idle, RunPhase::Starting)
                | (RunPhase::Starting, RunPhase::Running)
                | (RunPhase::Starting, RunPhase::Paused)
                | (RunPhase::Running, RunPhase::Paused)
                | (RunPhase::Paused, RunPhase::Running)
                | (RunPhase::Running, RunPhase::Finished)
                | (RunPhase::Starting, RunPhase::Stopped)
                | (RunPhase::Running, RunPhase::Stopped)
                | (RunPhase::Paused, RunPhase::Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Stopped | RunPhase::Finished)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    /// Countdown before the first keystroke, to let the user focus the target window.
    pub lead_in: Duration,
    /// Longest uninterrupted sleep; bounds stop/pause latency.
    pub tick: Duration,
    /// Multiplier applied to every cadence sleep. `0.0` types as fast as possible.
    pub time_scale: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            lead_in: Duration::from_secs(5),
            tick: Duration::from_millis(50),
            time_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub text: String,
    pub settings: Settings,
    pub options: EngineOptions,
    pub seed: Option<u64>,
}

pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Run one engine to completion on the current thread.
///
/// Errors and panics from the run loop are caught here, reported to the
/// observer, and turned into [`RunOutcome::Faulted`]. The observer always
/// receives exactly one `finished` call.
pub fn execute<S: KeystrokeSink, R: Rng>(
    request: &RunRequest,
    sink: S,
    observer: &dyn Observer,
    commands: Receiver<Command>,
    rng: R,
) -> RunOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        TypingEngine::new(
            &request.text,
            request.settings.clone(),
            request.options,
            sink,
            observer,
            commands,
            rng,
        )
        .run()
    }));

    let fault = match result {
        Ok(Ok(outcome)) => {
            observer.finished(outcome);
            return outcome;
        }
        Ok(Err(err)) => Error::Fault(format!("{err:#}")),
        Err(payload) => Error::Fault(panic_message(payload.as_ref())),
    };

    tracing::error!("{fault}");
    observer.error(&fault.to_string());
    observer.finished(RunOutcome::Faulted);
    RunOutcome::Faulted
}

/// Handle to a run executing on its worker thread.
#[derive(Debug)]
pub struct RunHandle {
    commands: Sender<Command>,
    worker: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn commands(&self) -> Sender<Command> {
        self.commands.clone()
    }

    /// Fire-and-forget; a finished run simply ignores the command.
    pub fn send(&self, command: Command) {
        let _ = self.commands.send(command);
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn join(self) -> RunOutcome {
        self.worker.join().unwrap_or(RunOutcome::Faulted)
    }
}

/// Start a run on a dedicated worker thread.
pub fn spawn_run(
    request: RunRequest,
    sink: Box<dyn KeystrokeSink + Send>,
    observer: Box<dyn Observer + Send>,
) -> Result<RunHandle> {
    let (commands, rx) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("typing-engine".to_string())
        .spawn(move || {
            let rng = rng_from_seed(request.seed);
            execute(&request, sink, observer.as_ref(), rx, rng)
        })
        .map_err(|err| Error::Fault(format!("failed to spawn worker thread: {err}")))?;

    Ok(RunHandle { commands, worker })
}

/// The control surface's view of typing runs: at most one is active at a time.
#[derive(Debug, Default)]
pub struct Controller {
    active: Option<RunHandle>,
    paused: bool,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|run| !run.is_finished())
    }

    pub fn start(
        &mut self,
        request: RunRequest,
        sink: Box<dyn KeystrokeSink + Send>,
        observer: Box<dyn Observer + Send>,
    ) -> Result<()> {
        if self.is_active() {
            return Err(Error::RunActive);
        }
        // Reap a previous run that already ended.
        if let Some(done) = self.active.take() {
            done.join();
        }

        tracing::info!(chars = request.text.chars().count(), "starting typing run");
        self.active = Some(spawn_run(request, sink, observer)?);
        self.paused = false;
        Ok(())
    }

    pub fn commands(&self) -> Option<Sender<Command>> {
        self.active.as_ref().map(RunHandle::commands)
    }

    pub fn stop(&mut self) {
        if let Some(run) = &self.active {
            run.send(Command::Stop);
        }
    }

    pub fn pause(&mut self) {
        if let Some(run) = &self.active {
            run.send(Command::Pause);
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        if let Some(run) = &self.active {
            run.send(Command::Resume);
            self.paused = false;
        }
    }

    /// Pause a running run, or resume a paused one. Returns the new paused state.
    pub fn toggle_pause(&mut self) -> bool {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
        self.paused
    }

    /// Block until the active run ends.
    pub fn wait(&mut self) -> Option<RunOutcome> {
        self.paused = false;
        self.active.take().map(RunHandle::join)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_display() {
        assert_eq!(RunPhase::Idle.to_string(), "Idle");
        assert_eq!(RunPhase::Paused.to_string(), "Paused");
        assert_eq!(RunPhase::Finished.to_string(), "Finished");
    }

    #[test]
    fn valid_transitions() {
        assert!(RunPhase::Idle.can_transition_to(RunPhase::Starting));
        assert!(RunPhase::Starting.can_transition_to(RunPhase::Running));
        assert!(RunPhase::Running.can_transition_to(RunPhase::Paused));
        assert!(RunPhase::Paused.can_transition_to(RunPhase::Running));
        assert!(RunPhase::Running.can_transition_to(RunPhase::Finished));
        assert!(RunPhase::Paused.can_transition_to(RunPhase::Stopped));
        assert!(RunPhase::Starting.can_transition_to(RunPhase::Stopped));
    }

    #[test]
    fn invalid_transitions() {
        assert!(!RunPhase::Idle.can_transition_to(RunPhase::Running));
        assert!(!RunPhase::Paused.can_transition_to(RunPhase::Finished));
        assert!(!RunPhase::Finished.can_transition_to(RunPhase::Running));
        assert!(!RunPhase::Stopped.can_transition_to(RunPhase::Running));
        assert!(!RunPhase::Stopped.can_transition_to(RunPhase::Finished));
        assert!(RunPhase::Stopped.is_terminal());
        assert!(!RunPhase::Paused.is_terminal());
    }

    #[test]
    fn panic_payloads_become_messages() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}

use std::fmt;
use std::sync::mpsc::Sender;

/// How a run ended. Exactly one is reported per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Stopped,
    Faulted,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "completed"),
            RunOutcome::Stopped => write!(f, "stopped"),
            RunOutcome::Faulted => write!(f, "faulted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Status(String),
    Progress(u8),
    Error(String),
    Finished(RunOutcome),
}

/// Receives run reports. Calls must not block the engine.
pub trait Observer {
    fn status(&self, message: &str);
    fn progress(&self, percent: u8);
    fn error(&self, message: &str);
    fn finished(&self, outcome: RunOutcome);
}

// A closed receiver just means nobody is listening any more.
impl Observer for Sender<RunEvent> {
    fn status(&self, message: &str) {
        let _ = self.send(RunEvent::Status(message.to_string()));
    }

    fn progress(&self, percent: u8) {
        let _ = self.send(RunEvent::Progress(percent));
    }

    fn error(&self, message: &str) {
        let _ = self.send(RunEvent::Error(message.to_string()));
    }

    fn finished(&self, outcome: RunOutcome) {
        let _ = self.send(RunEvent::Finished(outcome));
    }
}

/// Prints status lines to stderr, colored by kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleObserver;

const RESET: &str = "\x1b[0m";
const STATUS: &str = "\x1b[34m";
const FIX: &str = "\x1b[33m";
const ERROR: &str = "\x1b[31m";

impl ConsoleObserver {
    pub fn print_event(event: &RunEvent) {
        match event {
            RunEvent::Status(line) => {
                let color = if line.starts_with("Going back") || line.starts_with("Fixed") {
                    FIX
                } else {
                    STATUS
                };
                eprintln!("{color}{line}{RESET}");
            }
            // Progress is redrawn in place on one line.
            RunEvent::Progress(p) => eprint!("\r[{p:>3}%]\r"),
            RunEvent::Error(msg) => eprintln!("{ERROR}ERROR:{RESET} {msg}"),
            RunEvent::Finished(outcome) => eprintln!("Run {outcome}."),
        }
    }
}

impl Observer for ConsoleObserver {
    fn status(&self, message: &str) {
        Self::print_event(&RunEvent::Status(message.to_string()));
    }

    fn progress(&self, percent: u8) {
        Self::print_event(&RunEvent::Progress(percent));
    }

    fn error(&self, message: &str) {
        Self::print_event(&RunEvent::Error(message.to_string()));
    }

    fn finished(&self, outcome: RunOutcome) {
        Self::print_event(&RunEvent::Finished(outcome));
    }
}

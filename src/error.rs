/// Errors surfaced by the library to the control surface.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The rewrite collaborator is unreachable or misconfigured.
    #[error("rewrite service unavailable: {0}")]
    Service(String),
    /// A run is already in progress; only one may be active at a time.
    #[error("a typing run is already active")]
    RunActive,
    /// Unexpected failure inside the run loop.
    #[error("typing engine fault: {0}")]
    Fault(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

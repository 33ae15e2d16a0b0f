use thiserror::Error;

/// Errors produced while wiring up the coordinator.
///
/// Media load failures are never reported through this type; they only show
/// up as cache state.
#[derive(Debug, Error)]
pub enum Error {
    /// A retry scheduler was created outside of a tokio runtime.
    #[error("no tokio runtime available for retry timers")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// A harness argument could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidArgument { name: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;

//! Running recovered source and loading grids from elsewhere.
//!
//! The codec never evaluates anything itself. [`Executor`] is the seam for
//! whatever sandbox runs the text, and [`Fetcher`] is the seam for whatever
//! retrieves encoded images. Neither is trusted to validate its output.

use thiserror::Error;
use tracing::{error, info};

use crate::codec::Registry;
use crate::decode::{decode_text, DecodeError};
use crate::events::{DispatchReport, Event, HandlerKind, Handlers};
use crate::grid::{decode_png, GridError, PixelGrid};

/// A caught failure from the execution collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Execution failed: {message}")]
pub struct ExecutionFailure {
    pub message: String,
}

impl ExecutionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from the fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Failed to load {url}: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("Timed out loading {url}")]
    Timeout { url: String },
}

/// Errors from [`run`] and [`Loader::get`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid image: {0}")]
    Source(#[from] GridError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Execution(#[from] ExecutionFailure),
}

/// Evaluates recovered source text.
pub trait Executor {
    type Value;

    fn execute(&self, source: &str) -> Result<Self::Value, ExecutionFailure>;
}

impl<V, F> Executor for F
where
    F: Fn(&str) -> Result<V, ExecutionFailure>,
{
    type Value = V;

    fn execute(&self, source: &str) -> Result<V, ExecutionFailure> {
        self(source)
    }
}

/// Retrieves encoded image bytes.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Decode the text in `grid` and hand it to `executor`.
///
/// # Errors
///
/// - `RunError::Decode` if the grid does not hold a valid payload
/// - `RunError::Execution` if the executor reports a failure
pub fn run<X: Executor>(
    registry: &Registry,
    grid: &PixelGrid,
    executor: &X,
) -> Result<X::Value, RunError> {
    let source = decode_text(registry, grid)?;
    executor.execute(&source).map_err(|e| {
        error!(error = %e, "execution failed");
        RunError::Execution(e)
    })
}

/// Outcome of one [`Loader::get`].
#[derive(Debug)]
pub enum LoadEvent<V> {
    /// Fetched, decoded and executed.
    Loaded { url: String, value: V },
    /// The image could not be fetched.
    Failed { url: String, error: FetchError },
    /// The image arrived but could not be decoded or run.
    Broken { url: String, error: RunError },
}

impl<V> LoadEvent<V> {
    pub fn url(&self) -> &str {
        match self {
            LoadEvent::Loaded { url, .. }
            | LoadEvent::Failed { url, .. }
            | LoadEvent::Broken { url, .. } => url,
        }
    }
}

impl<V> Event for LoadEvent<V> {
    fn kind(&self) -> HandlerKind {
        match self {
            LoadEvent::Loaded { .. } => HandlerKind::Success,
            LoadEvent::Failed { .. } => HandlerKind::Error,
            LoadEvent::Broken { .. } => HandlerKind::Broken,
        }
    }
}

/// Fetches encoded PNGs, runs them and notifies handlers.
pub struct Loader<'r, F, X: Executor> {
    registry: &'r Registry,
    fetcher: F,
    executor: X,
    handlers: Handlers<LoadEvent<X::Value>>,
}

impl<'r, F: Fetcher, X: Executor> Loader<'r, F, X> {
    pub fn new(registry: &'r Registry, fetcher: F, executor: X) -> Self {
        Self {
            registry,
            fetcher,
            executor,
            handlers: Handlers::new(),
        }
    }

    /// Handler lists notified by [`Loader::get`].
    pub fn handlers(&mut self) -> &mut Handlers<LoadEvent<X::Value>> {
        &mut self.handlers
    }

    /// Fetch `url`, decode it and run the recovered source.
    ///
    /// Never fails: the outcome is delivered to the matching handler list
    /// and returned in the report.
    pub fn get(&mut self, url: &str) -> DispatchReport<LoadEvent<X::Value>> {
        let url_owned = url.to_string();
        let event = match self.fetcher.fetch(url) {
            Err(e) => {
                error!(url, error = %e, "failed to load");
                LoadEvent::Failed {
                    url: url_owned,
                    error: e,
                }
            }
            Ok(bytes) => match self.load(&bytes) {
                Ok(value) => {
                    info!(url, "loaded");
                    LoadEvent::Loaded {
                        url: url_owned,
                        value,
                    }
                }
                Err(e) => {
                    error!(url, error = %e, "broken image");
                    LoadEvent::Broken {
                        url: url_owned,
                        error: e,
                    }
                }
            },
        };
        self.handlers.dispatch(event)
    }

    fn load(&self, bytes: &[u8]) -> Result<X::Value, RunError> {
        let grid = decode_png(bytes)?;
        run(self.registry, &grid, &self.executor)
    }
}

use std::error::Error;
use std::fmt;

use ga4sync::error::SyncError;

/// Result type for loader binary operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Error type for the loader binary.
///
/// Wraps [`SyncError`] for pipeline errors and provides variants for
/// infrastructure errors around it.
#[derive(Debug)]
pub enum LoaderError {
    /// Pipeline or sync-related error.
    Sync(SyncError),
    /// Configuration error.
    Config(Box<dyn Error + Send + Sync>),
    /// I/O error.
    Io(std::io::Error),
}

impl LoaderError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            LoaderError::Sync(_) => "loader error",
            LoaderError::Config(_) => "configuration error",
            LoaderError::Io(_) => "i/o error",
        }
    }

    /// Creates a configuration error from any boxed source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        LoaderError::Config(Box::new(err))
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("loader run failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {}\n", self));

        // Aggregated sync errors already render every inner error; walking
        // the source chain would repeat the first one.
        if !matches!(self, LoaderError::Sync(err) if err.errors().is_some()) {
            let mut source = Error::source(self);
            let mut idx = 1usize;
            while let Some(err) = source {
                out.push_str(&format!("cause {idx}: {err}\n"));
                source = err.source();
                idx += 1;
            }
        }

        out
    }
}

impl fmt::Display for LoaderError {
    /// Renders a user-focused description for terminal and log output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderError::Sync(err) => write!(f, "{err}"),
            LoaderError::Config(source) => write!(f, "configuration error: {source}"),
            LoaderError::Io(source) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for LoaderError {
    /// Returns the direct cause for this error variant.
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoaderError::Sync(err) => err.source(),
            LoaderError::Config(source) => Some(source.as_ref()),
            LoaderError::Io(source) => Some(source),
        }
    }
}

impl From<SyncError> for LoaderError {
    /// Converts a sync error into a loader error variant.
    fn from(err: SyncError) -> Self {
        LoaderError::Sync(err)
    }
}

impl From<std::io::Error> for LoaderError {
    /// Converts an I/O error into an I/O error variant.
    fn from(err: std::io::Error) -> Self {
        LoaderError::Io(err)
    }
}

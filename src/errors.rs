use std::fmt;

/// Application-specific error types.
///
/// Variants mirror the failure taxonomy of the pipeline: geocoding misses,
/// pollutant provider outages, classifier unavailability, and the two
/// degradable stages (advisory generation and hospital search).
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// Geocoding yielded nothing for the given input.
    NotFound(String),
    /// Pollutant provider returned no samples or a malformed body.
    Unavailable(String),
    /// Classifier could not be reached or returned an undecodable prediction.
    ModelUnready(String),
    /// Advisory text could not be produced.
    GenerationFailure(String),
    /// Hospital query failed or errored.
    SearchFailure(String),
    /// Invalid caller input (e.g. out-of-range coordinates).
    BadRequest(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<PipelineError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::NotFound(msg) => write!(f, "Not found: {}", msg),
            PipelineError::Unavailable(msg) => write!(f, "Unavailable: {}", msg),
            PipelineError::ModelUnready(msg) => write!(f, "Model unready: {}", msg),
            PipelineError::GenerationFailure(msg) => write!(f, "Generation failure: {}", msg),
            PipelineError::SearchFailure(msg) => write!(f, "Search failure: {}", msg),
            PipelineError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            PipelineError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `PipelineError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, PipelineError>;

    /// Add context lazily (only evaluated on error).
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, PipelineError> {
    fn context(self, context: impl Into<String>) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PipelineError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

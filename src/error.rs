use thiserror::Error;

/// Failures while loading or validating a [`crate::config::SimConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Rejections of malformed add/delete payloads at the request boundary.
///
/// None of these reach the simulation core.
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("Request body must be a JSON object.")]
    MalformedBody,

    #[error("Missing required field '{0}'.")]
    MissingField(&'static str),

    #[error("Field '{field}' must be a list of {expected} numbers, got {found} entries.")]
    WrongArity {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Field '{0}' must be numeric.")]
    NotNumeric(&'static str),

    #[error("Radius must be positive.")]
    NonPositiveRadius,

    #[error("Missing or invalid 'id' field.")]
    InvalidId,
}

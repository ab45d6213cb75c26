use thiserror::Error;

/// Dataset could not be fetched or decoded
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: reqwest::StatusCode },

    #[error("malformed dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Outcome of a load attempt that did not produce a replayable dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Parsed fine but holds no usable records. Not a failure, just nothing to replay.
    #[error("dataset '{date}' contains no usable state vectors")]
    Empty { date: String },
}

impl DatasetError {
    pub fn is_empty(&self) -> bool {
        matches!(self, DatasetError::Empty { .. })
    }
}

/// Rendering surface refused a frame
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("IO error {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

macro_rules! invalid_config {
    ($field:literal, $fmt:literal $(, $arg:expr )* ) => {
        $crate::error::ConfigError::Invalid { field: $field, reason: format!( $fmt $(, $arg)* ) }
    };
}
pub(crate) use invalid_config;

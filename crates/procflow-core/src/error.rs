pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors. Everything recoverable is reported through [`crate::Diagnostics`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    #[error("Invalid level schema: {message}")]
    InvalidSchema { message: String },

    #[error("Unknown node id: {id}")]
    UnknownNode { id: String },

    #[error("Input JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("graph contains an edge with a missing endpoint: {source_id} -> {target_id}")]
    MissingEndpoint {
        source_id: String,
        target_id: String,
    },

    #[error("graph contains duplicate node id: {id}")]
    DuplicateNode { id: String },

    #[error("node {id} has a non-positive or non-finite size")]
    InvalidNodeSize { id: String },

    #[error("invalid layout options: {message}")]
    InvalidOptions { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

use gaiwan_core::{ConfigError, ErrorCode, GraphError};

/// Errors surfaced by [`crate::RetrievalEngine`].
///
/// An unknown query id is not an error; `retrieve` returns an empty list.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetrievalError {
    #[error("engine has not been fitted")]
    NotFitted,

    #[error("engine is already fitted; construct a new engine for a new corpus")]
    AlreadyFitted,

    #[error("post id '{0}' appears more than once in the corpus")]
    DuplicatePost(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl RetrievalError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFitted => ErrorCode::NotFitted,
            Self::AlreadyFitted => ErrorCode::AlreadyFitted,
            Self::DuplicatePost(_) => ErrorCode::DuplicatePost,
            Self::Config(err) => err.code(),
            Self::Graph(err) => err.code(),
        }
    }
}

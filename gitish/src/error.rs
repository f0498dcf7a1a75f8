use std::io;

use argtree::{MetadataError, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum GitishError {
    #[error("invalid command-line definition: {0}")]
    Definition(#[from] MetadataError),

    #[error("{0}")]
    Usage(#[from] ParseError),

    #[error("no help topic `{0}`")]
    UnknownTopic(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl GitishError {
    /// Process exit status: 2 for command-line mistakes, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            GitishError::Usage(_) | GitishError::UnknownTopic(_) => 2,
            GitishError::Definition(_) | GitishError::Io(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, GitishError>;

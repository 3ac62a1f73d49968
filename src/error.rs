use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::note::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("cannot decode an empty string")]
    EmptyInput,
    #[error("no identity at the start of {0:?}")]
    MissingIdentity(String),
    #[error("{0:?} has more than an identity before the first ' - '")]
    MalformedIdentity(String),
    #[error("{0:?} has more than four ' - ' separated segments")]
    TooManySegments(String),
    #[error("{0:?} carries context or a predecessor but no keyword")]
    MissingKeyword(String),
    #[error("{0:?} in the predecessor segment is not an identity")]
    MalformedPredecessor(String),
    #[error("cannot parse a date from {0:?}")]
    UnparseableDate(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("at least one keyword is needed to build a filename for {0}")]
    MissingKeyword(Identity),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("every identity for date code {0} is already taken")]
    IdentitySpaceExhausted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterializeError {
    #[error("duplicate path {path:?} for {first} and {second}")]
    DuplicatePath {
        path: String,
        first: Identity,
        second: Identity,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} already exists, delete it manually before running this command again", .0.display())]
    Exists(PathBuf),
    #[error("{} does not look like a zettelkasten (missing zettel folder, index or references file)", .0.display())]
    NotACollection(PathBuf),
    #[error("cannot walk {}: {message}", .path.display())]
    Walk { path: PathBuf, message: String },
    #[error("no note with identity {0}")]
    UnknownIdentity(Identity),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid ignore pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Failure to turn the content of a text note into a filename.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// One import source that could not be turned into a note.
#[derive(Debug, Error)]
#[error("{}: {error}", .source_path.display())]
pub struct ImportError {
    pub source_path: PathBuf,
    pub error: ContentError,
}

#[derive(Debug, Error)]
pub enum ImportFailure {
    #[error("{} file(s) could not be imported, nothing was written", .0.len())]
    Rejected(Vec<ImportError>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("target path already exists: {}", .0.display())]
    Exists(PathBuf),
    #[error("could not download example, are you connected to the internet? {0}")]
    Download(#[from] reqwest::Error),
    #[error("could not download example, status {0}")]
    Status(u16),
    #[error("invalid example archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive entry {0:?} escapes the target directory")]
    UnsafeEntry(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

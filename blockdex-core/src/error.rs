use std::{error, fmt, io};

#[derive(Debug)]
pub enum Error {
    /// The initial dataset load failed.  Fatal for the session.
    Load(String),
    /// A lazily fetched mode dataset failed.  Local to that mode.
    ModeData(String),
    /// The key-value store could not be read or written.  Recovered locally.
    Persistence(String),
    JsonError(serde_json::Error),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(msg) => write!(f, "failed to load dataset: {msg}"),
            Self::ModeData(msg) => write!(f, "failed to load mode dataset: {msg}"),
            Self::Persistence(msg) => write!(f, "persistence failure: {msg}"),
            Self::JsonError(err) => err.fmt(f),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::JsonError(err)
    }
}

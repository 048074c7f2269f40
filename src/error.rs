use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors shared by the download, organize and sync phases.
///
/// Only [`GoProError::Auth`] is fatal for a whole run. Everything else is
/// scoped to the page, item or file that raised it and the caller decides
/// whether to keep going.
#[derive(Debug, Error)]
pub enum GoProError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("network error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} requesting {url}")]
    HttpStatus { status: u16, url: String },

    #[error("filesystem error at {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed data: {0}")]
    Data(String),
}

impl GoProError {
    /// Maps a non-success status to the auth or plain HTTP variant.
    pub fn from_status(status: u16, url: &str) -> Self {
        match status {
            401 | 403 => GoProError::Auth(format!("server returned {status} for {url}")),
            _ => GoProError::HttpStatus {
                status,
                url: url.to_string(),
            },
        }
    }

    pub fn fs(path: &Path, source: io::Error) -> Self {
        GoProError::FileSystem {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, GoProError::Auth(_))
    }
}

/// `map_err` helper: `fs::read(p).map_err(fs_err(p))?`
pub fn fs_err(path: &Path) -> impl FnOnce(io::Error) -> GoProError + '_ {
    move |source| GoProError::fs(path, source)
}

pub type Result<T> = std::result::Result<T, GoProError>;

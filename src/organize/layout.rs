use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDateTime};

use crate::error::{GoProError, Result};
use crate::sidecar;

const MAX_COLLISIONS: u32 = 9999;

/// `root/YYYY/YYYY-MM-DD`
pub fn bucket_dir(root: &Path, date: NaiveDateTime) -> PathBuf {
    root.join(format!("{:04}", date.year()))
        .join(date.format("%Y-%m-%d").to_string())
}

pub fn file_name(stem: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

/// `stem` for the first candidate, then `stem-1`, `stem-2`, ...
pub fn numbered_stem(stem: &str, counter: u32) -> String {
    if counter == 0 {
        stem.to_string()
    } else {
        format!("{stem}-{counter}")
    }
}

/// Hands out destination paths that collide neither with files on disk nor
/// with paths already handed out during this run.
#[derive(Debug, Default)]
pub struct DestinationAllocator {
    claimed: HashSet<PathBuf>,
}

impl DestinationAllocator {
    pub fn new() -> DestinationAllocator {
        DestinationAllocator::default()
    }

    fn is_free(&self, path: &Path) -> bool {
        !self.claimed.contains(path) && !path.exists()
    }

    /// Picks the stem under which the file and its companions all fit in
    /// `dir`, claims every resulting path and returns the stem.
    pub fn allocate(
        &mut self,
        dir: &Path,
        stem: &str,
        extension: Option<&str>,
        companions: &[String],
    ) -> Result<String> {
        for counter in 0..=MAX_COLLISIONS {
            let candidate = numbered_stem(stem, counter);
            let mut paths = vec![dir.join(file_name(&candidate, extension))];
            paths.extend(
                companions
                    .iter()
                    .map(|c| dir.join(sidecar::rename_companion(c, stem, &candidate))),
            );

            if paths.iter().all(|p| self.is_free(p)) {
                self.claimed.extend(paths);
                return Ok(candidate);
            }
        }

        Err(GoProError::fs(
            dir,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("too many files named {}", file_name(stem, extension)),
            ),
        ))
    }
}

use std::path::Path;

use chrono::{Local, NaiveDateTime, TimeZone};
use filetime::FileTime;

use crate::error::{Result, fs_err};

/// Unix time of a wall-clock capture date in the local timezone.
///
/// Times skipped by a DST jump have no local reading and are taken as UTC.
pub fn local_unix_time(date: NaiveDateTime) -> i64 {
    Local
        .from_local_datetime(&date)
        .earliest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| date.and_utc().timestamp())
}

pub fn capture_file_time(date: NaiveDateTime) -> FileTime {
    FileTime::from_unix_time(local_unix_time(date), 0)
}

/// Sets both access and modification time to the capture date.
pub fn set_capture_times(path: &Path, date: NaiveDateTime) -> Result<()> {
    let time = capture_file_time(date);
    filetime::set_file_times(path, time, time).map_err(fs_err(path))
}

/// Sets only the modification time, leaving access time alone.
pub fn set_capture_mtime(path: &Path, date: NaiveDateTime) -> Result<()> {
    filetime::set_file_mtime(path, capture_file_time(date)).map_err(fs_err(path))
}

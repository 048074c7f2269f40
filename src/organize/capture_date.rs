use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag};
use log::debug;
use nom_exif::{MediaParser, MediaSource, TrackInfo, TrackInfoTag};
use regex::Regex;
use serde_json::Value;

use crate::error::{GoProError, Result, fs_err};
use crate::model::parse_captured_at;
use crate::sidecar;

/// Where a capture date came from, in order of trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Sidecar,
    Video,
    Exif,
    FileName,
    ModifiedTime,
}

/// Strategies tried in order; the first one that yields a date wins.
pub const STRATEGIES: [DateSource; 5] = [
    DateSource::Sidecar,
    DateSource::Video,
    DateSource::Exif,
    DateSource::FileName,
    DateSource::ModifiedTime,
];

impl DateSource {
    pub fn probe(self, path: &Path) -> Result<Option<NaiveDateTime>> {
        match self {
            DateSource::Sidecar => date_from_sidecar(path),
            DateSource::Video => date_from_video(path),
            DateSource::Exif => date_from_exif(path),
            DateSource::FileName => Ok(path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(date_from_file_name)),
            DateSource::ModifiedTime => date_from_mtime(path).map(Some),
        }
    }
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DateSource::Sidecar => "metadata sidecar",
            DateSource::Video => "video creation time",
            DateSource::Exif => "EXIF",
            DateSource::FileName => "filename",
            DateSource::ModifiedTime => "modification time",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureDate {
    pub date: NaiveDateTime,
    pub source: DateSource,
}

/// Runs the strategies against `path`.
pub fn infer_capture_date(path: &Path) -> Result<CaptureDate> {
    let mut last_error = None;
    for source in STRATEGIES {
        match source.probe(path) {
            Ok(Some(date)) => return Ok(CaptureDate { date, source }),
            Ok(None) => {}
            Err(e) => {
                debug!("No {source} date for {}: {e}", path.display());
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| {
        GoProError::Data(format!("no capture date found for {}", path.display()))
    }))
}

fn date_from_sidecar(path: &Path) -> Result<Option<NaiveDateTime>> {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return Ok(None);
    };
    let sidecar_path = path.with_file_name(sidecar::metadata_name(stem));
    if !sidecar_path.is_file() {
        return Ok(None);
    }

    let text = fs::read_to_string(&sidecar_path).map_err(fs_err(&sidecar_path))?;
    let metadata: Value = serde_json::from_str(&text).map_err(|e| {
        GoProError::Data(format!("failed to parse {}: {e}", sidecar_path.display()))
    })?;

    let captured_at = metadata
        .get("captured_at")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            GoProError::Data(format!("no 'captured_at' field in {}", sidecar_path.display()))
        })?;

    parse_captured_at(captured_at)
        .map(Some)
        .ok_or_else(|| GoProError::Data(format!("invalid captured_at '{captured_at}'")))
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "lrv", "360"];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&e.to_ascii_lowercase().as_str()))
}

/// `creation_time` from the QuickTime movie header.
///
/// GoPro cameras write their wall clock there labelled as UTC, so the UTC
/// fields are taken as-is, the same way `captured_at` is read.
fn date_from_video(path: &Path) -> Result<Option<NaiveDateTime>> {
    if !has_extension(path, VIDEO_EXTENSIONS) {
        return Ok(None);
    }

    let source = MediaSource::file_path(path)
        .map_err(|e| GoProError::Data(format!("cannot open {}: {e}", path.display())))?;
    if !source.has_track() {
        return Ok(None);
    }

    let mut parser = MediaParser::new();
    let info: TrackInfo = parser
        .parse(source)
        .map_err(|e| GoProError::Data(format!("no track metadata: {e}")))?;

    Ok(info.get(TrackInfoTag::CreateDate).and_then(|value| {
        value
            .as_time()
            .map(|t| t.naive_utc())
            .or_else(|| parse_exif_datetime(&value.to_string()))
            .filter(|date| date.year() > 1904)
    }))
}

const EXIF_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "tif", "tiff", "heic", "heif", "png", "webp", "dng", "gpr",
];

fn date_from_exif(path: &Path) -> Result<Option<NaiveDateTime>> {
    if !has_extension(path, EXIF_EXTENSIONS) {
        return Ok(None);
    }

    let file = File::open(path).map_err(fs_err(path))?;
    let reader = Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .map_err(|e| GoProError::Data(format!("no EXIF data: {e}")))?;

    for tag in [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime] {
        if let Some(field) = reader.get_field(tag, In::PRIMARY) {
            let value = field.display_value().to_string();
            if let Some(date) = parse_exif_datetime(&value) {
                return Ok(Some(date));
            }
        }
    }
    Ok(None)
}

/// EXIF datetimes carry no timezone; they are the camera's local time.
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s.trim().replace(['-', '/', '.'], ":");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    let date_part = cleaned.split(' ').next()?;
    NaiveDate::parse_from_str(date_part, "%Y:%m:%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

struct DatePattern {
    regex: &'static LazyLock<Regex>,
    format: &'static str,
}

static DASHED_COMPACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<date>(20|19)[0-9]{2}(0[1-9]|1[0-2])[0-3][0-9]-[0-9]{6})")
        .expect("valid regex")
});
static UNDERSCORED_COMPACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<date>(20|19)[0-9]{2}(0[1-9]|1[0-2])[0-3][0-9]_[0-9]{6})")
        .expect("valid regex")
});
static DASHED_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<date>(20|19)[0-9]{2}-(0[1-9]|1[0-2])-[0-3][0-9]-[0-9]{2}-[0-9]{2}-[0-9]{2})")
        .expect("valid regex")
});
static DASHED_DATE_COMPACT_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<date>(20|19)[0-9]{2}-(0[1-9]|1[0-2])-[0-3][0-9]-[0-9]{6})")
        .expect("valid regex")
});
static DIGITS_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<date>(20|19)[0-9]{2}(0[1-9]|1[0-2])[0-3][0-9]{7})").expect("valid regex")
});
static UNDERSCORED_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<date>(20|19)[0-9]{2}_(0[1-9]|1[0-2])_[0-3][0-9]_[0-9]{2}_[0-9]{2}_[0-9]{2})")
        .expect("valid regex")
});
static DASHED_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<date>(20|19)[0-9]{2}-(0[1-9]|1[0-2])-[0-3][0-9])").expect("valid regex")
});

// Each regex matches exactly the text its format parses; ASCII digits only.
static PATTERNS: &[DatePattern] = &[
    DatePattern { regex: &DASHED_COMPACT, format: "%Y%m%d-%H%M%S" },
    DatePattern { regex: &UNDERSCORED_COMPACT, format: "%Y%m%d_%H%M%S" },
    DatePattern { regex: &DASHED_FULL, format: "%Y-%m-%d-%H-%M-%S" },
    DatePattern { regex: &DASHED_DATE_COMPACT_TIME, format: "%Y-%m-%d-%H%M%S" },
    DatePattern { regex: &DIGITS_ONLY, format: "%Y%m%d%H%M%S" },
    DatePattern { regex: &UNDERSCORED_FULL, format: "%Y_%m_%d_%H_%M_%S" },
];

/// Dates embedded in names such as `IMG_20190509_154733.jpg` or
/// `2016_01_30_11_49_15.mp4`. A bare `YYYY-MM-DD` resolves to midnight.
pub fn date_from_file_name(file_name: &str) -> Option<NaiveDateTime> {
    for pattern in PATTERNS {
        let Some(found) = pattern.regex.captures(file_name).and_then(|c| c.name("date")) else {
            continue;
        };
        if let Ok(date) = NaiveDateTime::parse_from_str(found.as_str(), pattern.format) {
            return Some(date);
        }
    }

    let day = DASHED_DAY.captures(file_name)?.name("date")?;
    NaiveDate::parse_from_str(day.as_str(), "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
}

fn date_from_mtime(path: &Path) -> Result<NaiveDateTime> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(fs_err(path))?;
    Ok(DateTime::<Local>::from(modified).naive_local())
}

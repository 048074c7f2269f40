//! Names of the files the downloader writes next to each media file.
//!
//! A media file `GX010123.mp4` may be accompanied by
//! `GX010123_metadata.json`, `GX010123_highlights.json` and
//! `GX010123_gpmf.mp4`. The organizer keeps these together.

pub const METADATA_SUFFIX: &str = "_metadata.json";
pub const HIGHLIGHTS_SUFFIX: &str = "_highlights.json";
pub const GPMF_MARKER: &str = "_gpmf";
pub const PARTIAL_EXTENSION: &str = "part";

pub fn metadata_name(stem: &str) -> String {
    format!("{stem}{METADATA_SUFFIX}")
}

pub fn highlights_name(stem: &str) -> String {
    format!("{stem}{HIGHLIGHTS_SUFFIX}")
}

pub fn gpmf_name(stem: &str, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("{stem}{GPMF_MARKER}.{ext}"),
        None => format!("{stem}{GPMF_MARKER}"),
    }
}

/// Every companion name that may exist for a media file.
pub fn companion_names(stem: &str, extension: Option<&str>) -> Vec<String> {
    vec![
        metadata_name(stem),
        highlights_name(stem),
        gpmf_name(stem, extension),
    ]
}

/// True for files that only exist alongside a media file.
pub fn is_companion(file_name: &str) -> bool {
    if file_name.ends_with(METADATA_SUFFIX) || file_name.ends_with(HIGHLIGHTS_SUFFIX) {
        return true;
    }
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    };
    stem.ends_with(GPMF_MARKER)
}

/// Renames a companion of `old_stem` so it belongs to `new_stem`.
pub fn rename_companion(companion: &str, old_stem: &str, new_stem: &str) -> String {
    match companion.strip_prefix(old_stem) {
        Some(rest) => format!("{new_stem}{rest}"),
        None => companion.to_string(),
    }
}

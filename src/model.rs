use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GoProError, Result};

pub const PHOTO_TYPE: &str = "Photo";

/// One page of `GET /media/search`.
#[derive(Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "_embedded", default)]
    pub embedded: SearchEmbedded,
    #[serde(rename = "_pages")]
    pub pages: Option<Pages>,
}

#[derive(Serialize, Deserialize, Default)]
pub struct SearchEmbedded {
    #[serde(default)]
    pub media: Vec<Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Pages {
    pub current_page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_items: u64,
    pub total_pages: u32,
}

/// A listing page with its media records decoded.
pub struct SearchPage {
    pub items: Vec<MediaItem>,
    pub pages: Option<Pages>,
}

impl SearchPage {
    pub fn from_value(value: Value) -> Result<SearchPage> {
        let response: SearchResponse = serde_json::from_value(value)
            .map_err(|e| GoProError::Data(format!("unexpected listing payload: {e}")))?;

        let items = response
            .embedded
            .media
            .into_iter()
            .map(MediaItem::from_value)
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchPage {
            items,
            pages: response.pages,
        })
    }

    /// Whether the server says nothing follows this page.
    pub fn is_last(&self) -> bool {
        match &self.pages {
            Some(pages) => pages.current_page >= pages.total_pages,
            None => false,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MediaItem {
    pub id: String,
    pub captured_at: Option<String>,
    pub filename: Option<String>,
    pub file_extension: Option<String>,
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default)]
    pub moments_count: Option<u32>,
    pub camera_model: Option<String>,
    /// The record as received, kept for the metadata sidecar.
    #[serde(skip)]
    pub raw: Value,
}

impl MediaItem {
    pub fn from_value(value: Value) -> Result<MediaItem> {
        let mut item: MediaItem = serde_json::from_value(value.clone())
            .map_err(|e| GoProError::Data(format!("unexpected media record: {e}")))?;
        item.raw = value;
        Ok(item)
    }

    pub fn is_photo(&self) -> bool {
        self.media_type.eq_ignore_ascii_case(PHOTO_TYPE)
    }

    pub fn moments(&self) -> u32 {
        self.moments_count.unwrap_or(0)
    }

    pub fn capture_date(&self) -> Option<NaiveDateTime> {
        self.captured_at.as_deref().and_then(parse_captured_at)
    }

    /// Base name without extension, taken from the camera filename.
    ///
    /// Only the last path segment of the service-provided name is used.
    pub fn stem(&self) -> String {
        self.filename
            .as_deref()
            .and_then(|name| Path::new(name).file_stem())
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| self.id.clone())
    }

    pub fn extension(&self) -> Option<String> {
        self.file_extension
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(|e| e.trim_start_matches('.').to_string())
            .or_else(|| {
                self.filename
                    .as_deref()
                    .and_then(|name| Path::new(name).extension())
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_string())
            })
            .map(|e| e.to_lowercase())
    }

    pub fn local_file_name(&self) -> String {
        let stem = self.stem();
        match self.extension() {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem,
        }
    }
}

/// Parses `captured_at` as the camera's wall-clock time.
///
/// The service suffixes the value with `Z` even though cameras record local
/// time, so any offset is dropped rather than applied.
pub fn parse_captured_at(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    let bare = s.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(bare, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(bare, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Body of `GET /media/{id}/download`.
#[derive(Serialize, Deserialize)]
pub struct DownloadInfo {
    #[serde(rename = "_embedded", default)]
    pub embedded: DownloadEmbedded,
}

#[derive(Serialize, Deserialize, Default)]
pub struct DownloadEmbedded {
    #[serde(default)]
    pub files: Vec<AssetFile>,
    #[serde(default)]
    pub sidecar_files: Vec<SidecarFile>,
}

#[derive(Serialize, Deserialize)]
pub struct AssetFile {
    pub url: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SidecarFile {
    pub label: Option<String>,
    pub url: Option<String>,
}

/// Resolved download locations for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetUrls {
    pub primary: String,
    pub gpmf: Option<String>,
}

impl DownloadInfo {
    pub fn asset_urls(&self) -> Result<AssetUrls> {
        let primary = self
            .embedded
            .files
            .first()
            .and_then(|f| f.url.clone())
            .ok_or_else(|| GoProError::Data("download info has no file url".to_string()))?;

        let gpmf = self
            .embedded
            .sidecar_files
            .iter()
            .find(|f| f.label.as_deref() == Some("gpmf"))
            .and_then(|f| f.url.clone());

        Ok(AssetUrls { primary, gpmf })
    }
}

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use log::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::client::MediaApi;
use crate::config::DownloadConfig;
use crate::error::{GoProError, Result, fs_err};
use crate::lister::MediaLister;
use crate::model::MediaItem;
use crate::sidecar;
use crate::timestamps;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DownloadSummary {
    pub listed: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemOutcome {
    Downloaded,
    Skipped,
}

/// Writes media items and their sidecars into the output directory.
pub struct MediaFetcher<'a, A: MediaApi> {
    api: &'a A,
    config: &'a DownloadConfig,
    /// File names already sorted into subdirectories of the output directory.
    organized: HashSet<String>,
}

impl<'a, A: MediaApi> MediaFetcher<'a, A> {
    pub fn new(api: &'a A, config: &'a DownloadConfig) -> Result<MediaFetcher<'a, A>> {
        fs::create_dir_all(&config.output_dir).map_err(fs_err(&config.output_dir))?;

        let organized = if config.search_subdirs {
            index_subdirectories(&config.output_dir)
        } else {
            HashSet::new()
        };

        Ok(MediaFetcher {
            api,
            config,
            organized,
        })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }

    fn is_present(&self, name: &str) -> bool {
        self.path_for(name).exists() || self.organized.contains(name)
    }

    pub async fn fetch_item(&self, item: &MediaItem) -> Result<ItemOutcome> {
        let stem = item.stem();
        let extension = item.extension();
        let name = item.local_file_name();

        self.save_metadata(item, &stem)?;
        if item.moments() > 0 {
            self.save_highlights(item, &stem).await?;
        }

        let gpmf_name = sidecar::gpmf_name(&stem, extension.as_deref());
        let need_media = !self.is_present(&name);
        let need_gpmf = self.config.download_gpmf && !self.is_present(&gpmf_name);

        if !need_media && !need_gpmf {
            debug!("Skipping existing file: {name}");
            return Ok(ItemOutcome::Skipped);
        }

        let urls = self.api.download_info(&item.id).await?.asset_urls()?;

        if need_media {
            let media_path = self.path_for(&name);
            let bytes = self.api.fetch_asset(&urls.primary, &media_path).await?;
            info!("Downloaded {name} ({bytes} bytes)");

            if let Some(date) = item.capture_date() {
                timestamps::set_capture_mtime(&media_path, date)?;
            }
        }

        if need_gpmf {
            match &urls.gpmf {
                Some(url) => {
                    let gpmf_path = self.path_for(&gpmf_name);
                    self.api.fetch_asset(url, &gpmf_path).await?;
                    info!("Downloaded GPMF data {gpmf_name}");
                }
                None => debug!("No GPMF data available for {name}"),
            }
        }

        Ok(if need_media {
            ItemOutcome::Downloaded
        } else {
            ItemOutcome::Skipped
        })
    }

    fn save_metadata(&self, item: &MediaItem, stem: &str) -> Result<()> {
        let name = sidecar::metadata_name(stem);
        if self.is_present(&name) {
            return Ok(());
        }

        let path = self.path_for(&name);
        let json = serde_json::to_string_pretty(&item.raw)
            .map_err(|e| GoProError::Data(format!("cannot serialise metadata for {}: {e}", item.id)))?;
        fs::write(&path, json).map_err(fs_err(&path))
    }

    async fn save_highlights(&self, item: &MediaItem, stem: &str) -> Result<()> {
        let name = sidecar::highlights_name(stem);
        if self.is_present(&name) {
            return Ok(());
        }

        info!("Found {} HiLight tags in {stem}", item.moments());
        let moments = self.api.moments(&item.id).await?;
        let path = self.path_for(&name);
        let json = serde_json::to_string_pretty(&moments)
            .map_err(|e| GoProError::Data(format!("cannot serialise highlights for {}: {e}", item.id)))?;
        fs::write(&path, json).map_err(fs_err(&path))
    }
}

fn index_subdirectories(output_dir: &std::path::Path) -> HashSet<String> {
    let mut names = HashSet::new();
    for entry in WalkDir::new(output_dir).min_depth(2) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!("Failed to index {}: {err}", output_dir.display());
                continue;
            }
        };
        if entry.file_type().is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.insert(name.to_string());
            }
        }
    }
    names
}

/// Lists every item and fetches it, isolating failures per item.
///
/// Authentication failures and listing errors end the run; anything that goes
/// wrong for a single item is logged and counted.
pub async fn download_all<A: MediaApi>(api: &A, config: &DownloadConfig) -> Result<DownloadSummary> {
    let fetcher = MediaFetcher::new(api, config)?;
    let mut lister = MediaLister::new(api, config);
    let mut summary = DownloadSummary::default();

    info!("Saving media to {}...", config.output_dir.display());
    while let Some(item) = lister.next().await? {
        summary.listed += 1;
        match fetcher.fetch_item(&item).await {
            Ok(ItemOutcome::Downloaded) => summary.downloaded += 1,
            Ok(ItemOutcome::Skipped) => summary.skipped += 1,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!("Error processing {}: {e}", item.local_file_name());
                summary.failed += 1;
            }
        }
        debug!("Processed {} items...", summary.listed);
    }

    info!(
        "Found {} media items: {} downloaded, {} already present, {} failed",
        summary.listed, summary.downloaded, summary.skipped, summary.failed
    );
    Ok(summary)
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::info;
use serde::{Deserialize, Serialize};

pub const BASE_URL: &str = "https://api.gopro.com";
pub const PAGE_SIZE: u32 = 100;
pub const DEFAULT_CREDENTIALS_FILE: &str = "config.json";

const TOKEN_PLACEHOLDER: &str = "your-access-token-here";
const USER_ID_PLACEHOLDER: &str = "your-user-id-here";

/// Contents of the credentials file.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
    pub user_id: String,
}

impl Credentials {
    fn template() -> Credentials {
        Credentials {
            access_token: TOKEN_PLACEHOLDER.to_string(),
            user_id: USER_ID_PLACEHOLDER.to_string(),
        }
    }

    fn is_placeholder(&self) -> bool {
        self.access_token.trim().is_empty()
            || self.access_token == TOKEN_PLACEHOLDER
            || self.user_id == USER_ID_PLACEHOLDER
    }
}

/// Reads credentials from `path`.
///
/// A missing file is replaced by a template and reported as an error so the
/// user can fill in the values before the next run.
pub fn load_credentials(path: &Path) -> Result<Credentials> {
    if !path.exists() {
        write_template(path)?;
        bail!(
            "No credentials found. A template was written to {}; replace the placeholder values and run again.",
            path.display()
        );
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
    let credentials: Credentials = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse credentials file {}", path.display()))?;

    if credentials.is_placeholder() {
        bail!(
            "Credentials file {} still contains placeholder values",
            path.display()
        );
    }

    Ok(credentials)
}

fn write_template(path: &Path) -> Result<()> {
    info!("Creating template config file at {}", path.display());
    let json = serde_json::to_string_pretty(&Credentials::template())?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write template config to {}", path.display()))?;
    Ok(())
}

/// Settings for one download run.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub output_dir: PathBuf,
    pub include_photos: bool,
    /// Upper bound on items yielded across all pages.
    pub max_items: Option<usize>,
    pub download_gpmf: bool,
    pub access_token: String,
    pub user_id: String,
    pub base_url: String,
    pub page_size: u32,
    /// Also treat files already sorted into subdirectories of `output_dir` as downloaded.
    pub search_subdirs: bool,
}

impl DownloadConfig {
    pub fn new(output_dir: impl Into<PathBuf>, credentials: Credentials) -> DownloadConfig {
        DownloadConfig {
            output_dir: output_dir.into(),
            include_photos: false,
            max_items: None,
            download_gpmf: false,
            access_token: credentials.access_token,
            user_id: credentials.user_id,
            base_url: BASE_URL.to_string(),
            page_size: PAGE_SIZE,
            search_subdirs: false,
        }
    }

    /// Page size requested from the server, never larger than `max_items`.
    pub fn per_page(&self) -> u32 {
        let page_size = self.page_size.max(1);
        match self.max_items {
            Some(max) => page_size.min(max.max(1).try_into().unwrap_or(page_size)),
            None => page_size,
        }
    }
}

/// Settings for one organize run.
#[derive(Debug, Clone)]
pub struct OrganizeConfig {
    pub target_dir: PathBuf,
    pub copy_mode: bool,
    pub recursive: bool,
    pub dry_run: bool,
    pub set_file_times: bool,
}

impl OrganizeConfig {
    pub fn new(target_dir: impl Into<PathBuf>) -> OrganizeConfig {
        OrganizeConfig {
            target_dir: target_dir.into(),
            copy_mode: false,
            recursive: false,
            dry_run: false,
            set_file_times: true,
        }
    }
}

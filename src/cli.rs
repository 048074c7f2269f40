use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use log::info;

use crate::GIT_VERSION;
use crate::config::{
    DEFAULT_CREDENTIALS_FILE, DownloadConfig, OrganizeConfig, load_credentials,
};
use crate::organize::OrganizeSummary;

/// Flags that shape the download phase.
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Include photos in download
    #[arg(long)]
    pub include_photos: bool,

    /// Maximum number of items to download
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Download GPMF telemetry alongside each video
    #[arg(long)]
    pub download_gpmf: bool,

    /// JSON file holding access_token and user_id
    #[arg(long, default_value = DEFAULT_CREDENTIALS_FILE)]
    pub config: PathBuf,
}

impl DownloadArgs {
    pub fn to_config(&self, output_dir: &Path) -> Result<DownloadConfig> {
        let credentials = load_credentials(&self.config)?;
        let mut config = DownloadConfig::new(output_dir, credentials);
        config.include_photos = self.include_photos;
        config.max_items = self.max_items;
        config.download_gpmf = self.download_gpmf;
        Ok(config)
    }
}

/// Flags that shape the organize phase.
#[derive(Args, Debug, Clone)]
pub struct OrganizeArgs {
    /// Copy files instead of moving them
    #[arg(short, long)]
    pub copy: bool,

    /// Recursively process subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Show what would be done without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Leave file timestamps untouched instead of setting them to the capture date
    #[arg(long)]
    pub keep_times: bool,
}

impl OrganizeArgs {
    pub fn to_config(&self, target_dir: &Path) -> OrganizeConfig {
        let mut config = OrganizeConfig::new(target_dir);
        config.copy_mode = self.copy;
        config.recursive = self.recursive;
        config.dry_run = self.dry_run;
        config.set_file_times = !self.keep_times;
        config
    }
}

pub fn print_banner(tool: &str) {
    info!("{tool} {GIT_VERSION}");
}

pub fn report_organize(summary: &OrganizeSummary, dry_run: bool) {
    if dry_run {
        info!("This was a dry run. No files were modified.");
    }
    info!(
        "Processing complete. Successfully processed: {}, already organized: {}, errors: {}",
        summary.processed(),
        summary.in_place,
        summary.failed
    );
}

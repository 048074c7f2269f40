use log::info;

use crate::client::MediaApi;
use crate::config::{DownloadConfig, OrganizeConfig};
use crate::error::Result;
use crate::fetcher::{DownloadSummary, download_all};
use crate::organize::{OrganizeSummary, Organizer};

#[derive(Debug)]
pub struct SyncSummary {
    pub download: DownloadSummary,
    pub organize: OrganizeSummary,
}

/// Downloads into `download.output_dir`, then organizes that same directory.
///
/// The two phases are independent: files downloaded before a failure stay on
/// disk, and nothing is rolled back.
pub async fn sync<A: MediaApi>(
    api: &A,
    download: &DownloadConfig,
    organize: &OrganizeConfig,
) -> Result<SyncSummary> {
    let mut download = download.clone();
    download.search_subdirs = true;
    let mut organize = organize.clone();
    organize.target_dir = download.output_dir.clone();

    info!("Downloading media files...");
    let download_summary = download_all(api, &download).await?;

    info!("Organizing media files...");
    let organizer = Organizer::new(organize)?;
    let organize_summary = organizer.run();

    Ok(SyncSummary {
        download: download_summary,
        organize: organize_summary,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::GoProError;
    use crate::test_support::{FakeApi, test_config};

    #[tokio::test]
    async fn downloads_then_organizes() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeApi::with_videos(2).with_gpmf();
        let mut download = test_config(dir.path());
        download.download_gpmf = true;
        let organize = OrganizeConfig::new(dir.path());

        let summary = sync(&api, &download, &organize).await.unwrap();

        assert_eq!(summary.download.downloaded, 2);
        assert_eq!(summary.organize.processed(), 2);
        let first = dir.path().join("2023/2023-06-01");
        assert!(first.join("GX010000.mp4").is_file());
        assert!(first.join("GX010000_gpmf.mp4").is_file());
        assert!(first.join("GX010000_metadata.json").is_file());
        assert!(dir.path().join("2023/2023-06-02/GX010001.mp4").is_file());
    }

    #[tokio::test]
    async fn second_sync_downloads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeApi::with_videos(3);
        let download = test_config(dir.path());
        let organize = OrganizeConfig::new(dir.path());

        sync(&api, &download, &organize).await.unwrap();
        let fetched = api.fetched().len();
        let second = sync(&api, &download, &organize).await.unwrap();

        assert_eq!(second.download.downloaded, 0);
        assert_eq!(second.download.skipped, 3);
        assert_eq!(second.organize.processed(), 0);
        assert_eq!(api.fetched().len(), fetched);
        let top_level: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(top_level, vec!["2023"]);
    }

    #[tokio::test]
    async fn dry_run_only_affects_organize_phase() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeApi::with_videos(1);
        let download = test_config(dir.path());
        let mut organize = OrganizeConfig::new(dir.path());
        organize.dry_run = true;

        let summary = sync(&api, &download, &organize).await.unwrap();

        assert_eq!(summary.download.downloaded, 1);
        assert_eq!(summary.organize.processed(), 1);
        assert!(dir.path().join("GX010000.mp4").is_file());
        assert!(!dir.path().join("2023").exists());
    }

    #[tokio::test]
    async fn download_failure_skips_organize() {
        let dir = tempfile::tempdir().unwrap();
        let api = FakeApi::with_videos(1).rejecting_auth();
        let download = test_config(dir.path());
        let organize = OrganizeConfig::new(dir.path());

        let err = sync(&api, &download, &organize).await.unwrap_err();
        assert!(matches!(err, GoProError::Auth(_)));
    }
}

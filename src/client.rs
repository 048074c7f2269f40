use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use reqwest::cookie::Jar;
use reqwest::{Client, Url, header};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::config::DownloadConfig;
use crate::error::{GoProError, Result, fs_err};
use crate::model::{DownloadInfo, SearchPage};
use crate::sidecar::PARTIAL_EXTENSION;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.3 Safari/605.1.15";
const ACCEPT: &str = "application/vnd.gopro.jk.media.search+json; version=2.0.0";
const ORIGIN: &str = "https://gopro.com";
const REFERER: &str = "https://gopro.com/";

const PROCESSING_STATES: &str = "ready,failure";
const SEARCH_FIELDS: &str = "camera_model,captured_at,content_title,content_type,created_at,file_extension,file_size,filename,height,id,moments_count,type,width";
const VIDEO_TYPES: &str = "Burst,BurstVideo,Continuous,LoopedVideo,TimeLapse,TimeLapseVideo,Video";

/// The remote operations the lister and fetcher need.
#[allow(async_fn_in_trait)]
pub trait MediaApi {
    async fn search_page(&self, page: u32, per_page: u32, include_photos: bool)
    -> Result<SearchPage>;

    async fn download_info(&self, media_id: &str) -> Result<DownloadInfo>;

    async fn moments(&self, media_id: &str) -> Result<Value>;

    /// Streams `url` into `destination`, returning the number of bytes written.
    async fn fetch_asset(&self, url: &str, destination: &Path) -> Result<u64>;
}

pub struct GoProClient {
    base_address: String,
    client: Client,
    asset_client: Client,
}

impl GoProClient {
    pub fn new(config: &DownloadConfig) -> Result<GoProClient> {
        let base_address = config.base_url.trim_end_matches('/').to_string();

        Ok(GoProClient {
            client: Self::build_client(&base_address, &config.access_token, &config.user_id)?,
            asset_client: Self::build_asset_client()?,
            base_address,
        })
    }

    fn build_client(base_address: &str, access_token: &str, user_id: &str) -> Result<Client> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(header::ORIGIN, header::HeaderValue::from_static(ORIGIN));
        headers.insert(header::REFERER, header::HeaderValue::from_static(REFERER));

        let mut bearer = header::HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|_| GoProError::Auth("access token is not a valid header value".to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, bearer);

        let url: Url = base_address
            .parse()
            .map_err(|e| GoProError::Data(format!("invalid base url {base_address}: {e}")))?;
        let jar = Jar::default();
        jar.add_cookie_str(&format!("gp_access_token={access_token}"), &url);
        jar.add_cookie_str(&format!("gp_user_id={user_id}"), &url);

        reqwest::Client::builder()
            .default_headers(headers)
            .cookie_provider(Arc::new(jar))
            .build()
            .map_err(|source| GoProError::Network {
                url: base_address.to_string(),
                source,
            })
    }

    /// Asset URLs are pre-signed, so this client carries no credentials.
    fn build_asset_client() -> Result<Client> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|source| GoProError::Network {
                url: String::new(),
                source,
            })
    }

    async fn get_json(&self, url: String, query: &[(&str, String)]) -> Result<Value> {
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| GoProError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GoProError::from_status(status.as_u16(), &url));
        }

        response.json::<Value>().await.map_err(|source| {
            if source.is_decode() {
                GoProError::Data(format!("invalid JSON from {url}: {source}"))
            } else {
                GoProError::Network { url, source }
            }
        })
    }

    async fn stream_to_file(&self, url: &str, part_path: &Path, label: &str) -> Result<u64> {
        let mut response = self
            .asset_client
            .get(url)
            .send()
            .await
            .map_err(|source| GoProError::Network {
                url: url.to_string(),
                source,
            })?;

        // A refused pre-signed URL says nothing about the account's token.
        let status = response.status();
        if !status.is_success() {
            return Err(GoProError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bar = progress_bar(response.content_length(), label);
        let mut file = tokio::fs::File::create(part_path)
            .await
            .map_err(fs_err(part_path))?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| GoProError::Network {
                url: url.to_string(),
                source,
            })?
        {
            file.write_all(&chunk).await.map_err(fs_err(part_path))?;
            written += chunk.len() as u64;
            bar.set_position(written);
        }
        file.flush().await.map_err(fs_err(part_path))?;
        bar.finish_and_clear();

        Ok(written)
    }
}

impl MediaApi for GoProClient {
    async fn search_page(
        &self,
        page: u32,
        per_page: u32,
        include_photos: bool,
    ) -> Result<SearchPage> {
        let address = format!(
            "{base_address}/media/search",
            base_address = self.base_address
        );
        let query = [
            ("processing_states", PROCESSING_STATES.to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
            ("type", media_types(include_photos)),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];

        let json = self.get_json(address, &query).await?;
        SearchPage::from_value(json)
    }

    async fn download_info(&self, media_id: &str) -> Result<DownloadInfo> {
        let address = format!(
            "{base_address}/media/{media_id}/download",
            base_address = self.base_address
        );
        let json = self.get_json(address, &[]).await?;
        serde_json::from_value(json)
            .map_err(|e| GoProError::Data(format!("unexpected download info for {media_id}: {e}")))
    }

    async fn moments(&self, media_id: &str) -> Result<Value> {
        let address = format!(
            "{base_address}/media/{media_id}/moments",
            base_address = self.base_address
        );
        self.get_json(address, &[]).await
    }

    async fn fetch_asset(&self, url: &str, destination: &Path) -> Result<u64> {
        let part_path = partial_path(destination);
        let label = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.stream_to_file(url, &part_path, &label).await {
            Ok(written) => {
                tokio::fs::rename(&part_path, destination)
                    .await
                    .map_err(fs_err(destination))?;
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(e)
            }
        }
    }
}

fn media_types(include_photos: bool) -> String {
    if include_photos {
        format!("{VIDEO_TYPES},Photo")
    } else {
        VIDEO_TYPES.to_string()
    }
}

/// Where an asset is written before it is complete.
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_EXTENSION);
    destination.with_file_name(name)
}

fn progress_bar(length: Option<u64>, label: &str) -> ProgressBar {
    let bar = match length {
        Some(len) => {
            let bar = ProgressBar::new(len);
            bar.set_style(
                ProgressStyle::with_template(
                    "{msg} [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
            );
            bar
        }
        None => ProgressBar::new_spinner(),
    };
    bar.set_message(format!("Downloading {label}"));
    bar
}

//! In-memory `MediaApi` and a loopback HTTP server used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::client::MediaApi;
use crate::config::{Credentials, DownloadConfig};
use crate::error::{GoProError, Result};
use crate::model::{DownloadInfo, SearchPage};

pub fn test_config(output_dir: &Path) -> DownloadConfig {
    DownloadConfig::new(
        output_dir,
        Credentials {
            access_token: "test-token".to_string(),
            user_id: "test-user".to_string(),
        },
    )
}

pub struct FakeApi {
    media: Vec<Value>,
    gpmf: bool,
    reject_auth: bool,
    failing: HashSet<String>,
    search_calls: Cell<u32>,
    info_calls: Cell<u32>,
    fetched: RefCell<Vec<String>>,
}

impl FakeApi {
    pub fn with_media(media: Vec<Value>) -> FakeApi {
        FakeApi {
            media,
            gpmf: false,
            reject_auth: false,
            failing: HashSet::new(),
            search_calls: Cell::new(0),
            info_calls: Cell::new(0),
            fetched: RefCell::new(Vec::new()),
        }
    }

    pub fn with_videos(count: usize) -> FakeApi {
        let types = vec!["Video"; count];
        FakeApi::with_mix(&types)
    }

    pub fn with_mix(types: &[&str]) -> FakeApi {
        let media = types
            .iter()
            .enumerate()
            .map(|(i, media_type)| {
                let extension = if *media_type == "Photo" { "JPG" } else { "MP4" };
                json!({
                    "id": format!("media-{i}"),
                    "filename": format!("GX01{i:04}.{extension}"),
                    "file_extension": extension,
                    "type": media_type,
                    "captured_at": format!("2023-06-{:02}T10:00:00Z", i % 28 + 1),
                    "moments_count": 0,
                    "camera_model": "HERO11 Black"
                })
            })
            .collect();
        FakeApi::with_media(media)
    }

    pub fn with_gpmf(mut self) -> FakeApi {
        self.gpmf = true;
        self
    }

    pub fn rejecting_auth(mut self) -> FakeApi {
        self.reject_auth = true;
        self
    }

    pub fn failing_download(mut self, media_id: &str) -> FakeApi {
        self.failing.insert(media_id.to_string());
        self
    }

    pub fn with_moments(mut self, index: usize, count: u32) -> FakeApi {
        self.media[index]["moments_count"] = json!(count);
        self
    }

    pub fn search_calls(&self) -> u32 {
        self.search_calls.get()
    }

    pub fn info_calls(&self) -> u32 {
        self.info_calls.get()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl MediaApi for FakeApi {
    async fn search_page(
        &self,
        page: u32,
        per_page: u32,
        _include_photos: bool,
    ) -> Result<SearchPage> {
        self.search_calls.set(self.search_calls.get() + 1);
        if self.reject_auth {
            return Err(GoProError::Auth("server returned 401".to_string()));
        }

        let per_page = per_page.max(1) as usize;
        let start = (page as usize - 1) * per_page;
        let slice: Vec<Value> = self.media.iter().skip(start).take(per_page).cloned().collect();
        let total_pages = self.media.len().div_ceil(per_page);

        SearchPage::from_value(json!({
            "_embedded": {"media": slice},
            "_pages": {
                "current_page": page,
                "per_page": per_page,
                "total_items": self.media.len(),
                "total_pages": total_pages
            }
        }))
    }

    async fn download_info(&self, media_id: &str) -> Result<DownloadInfo> {
        self.info_calls.set(self.info_calls.get() + 1);
        if self.failing.contains(media_id) {
            return Err(GoProError::HttpStatus {
                status: 500,
                url: format!("https://api.test/media/{media_id}/download"),
            });
        }

        let mut sidecars = vec![json!({"label": "thumbnail", "url": "https://cdn.test/thumb"})];
        if self.gpmf {
            sidecars.push(json!({"label": "gpmf", "url": format!("https://cdn.test/{media_id}/gpmf")}));
        }

        serde_json::from_value(json!({
            "_embedded": {
                "files": [{"url": format!("https://cdn.test/{media_id}"), "item_number": 1}],
                "sidecar_files": sidecars
            }
        }))
        .map_err(|e| GoProError::Data(e.to_string()))
    }

    async fn moments(&self, media_id: &str) -> Result<Value> {
        Ok(json!({"media_id": media_id, "moments": [{"time": 1500}]}))
    }

    async fn fetch_asset(&self, url: &str, destination: &Path) -> Result<u64> {
        self.fetched.borrow_mut().push(url.to_string());
        std::fs::write(destination, url.as_bytes())
            .map_err(|e| GoProError::fs(destination, e))?;
        Ok(url.len() as u64)
    }
}

#[derive(Clone)]
struct Route {
    status: u16,
    body: Vec<u8>,
    /// Announce more bytes than are sent, then hang up.
    truncated: bool,
}

/// Minimal HTTP/1.1 server on 127.0.0.1 answering canned responses by path.
///
/// Every request head is recorded so tests can inspect headers and query
/// strings. Unknown paths get a 404.
pub struct TestServer {
    pub base: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub async fn start() -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::default();
        let requests: Arc<Mutex<Vec<String>>> = Arc::default();

        let (r, q) = (routes.clone(), requests.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(answer(stream, r.clone(), q.clone()));
            }
        });

        TestServer {
            base,
            routes,
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn route(&self, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.insert(path, status, body.into(), false);
    }

    pub fn json(&self, path: &str, value: Value) {
        self.route(path, 200, value.to_string());
    }

    pub fn truncated(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.insert(path, 200, body.into(), true);
    }

    fn insert(&self, path: &str, status: u16, body: Vec<u8>, truncated: bool) {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                status,
                body,
                truncated,
            },
        );
    }

    /// Lower-cased head of the last request for `path`.
    pub fn request_to(&self, path: &str) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|head| request_path(head) == path)
            .map(|head| head.to_lowercase())
    }
}

fn request_path(head: &str) -> &str {
    let target = head.split_whitespace().nth(1).unwrap_or("/");
    target.split('?').next().unwrap_or(target)
}

async fn answer(
    mut stream: TcpStream,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    let head = String::from_utf8_lossy(&head).into_owned();

    let route = routes
        .lock()
        .unwrap()
        .get(request_path(&head))
        .cloned()
        .unwrap_or(Route {
            status: 404,
            body: b"not found".to_vec(),
            truncated: false,
        });
    requests.lock().unwrap().push(head);

    let declared = if route.truncated {
        route.body.len() + 4096
    } else {
        route.body.len()
    };
    let response = format!(
        "HTTP/1.1 {} Test\r\nContent-Length: {declared}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n",
        route.status
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.write_all(&route.body).await;
    let _ = stream.shutdown().await;
}

use std::collections::VecDeque;

use log::debug;

use crate::client::MediaApi;
use crate::config::DownloadConfig;
use crate::error::Result;
use crate::model::MediaItem;

/// Pulls media items page by page from the listing endpoint.
///
/// Pages are requested only when the buffered page runs dry, so the sequence
/// is lazy. It is also single-use: once exhausted it stays exhausted.
pub struct MediaLister<'a, A: MediaApi> {
    api: &'a A,
    include_photos: bool,
    max_items: Option<usize>,
    per_page: u32,
    next_page: u32,
    buffer: VecDeque<MediaItem>,
    emitted: usize,
    exhausted: bool,
}

impl<'a, A: MediaApi> MediaLister<'a, A> {
    pub fn new(api: &'a A, config: &DownloadConfig) -> MediaLister<'a, A> {
        MediaLister {
            api,
            include_photos: config.include_photos,
            max_items: config.max_items,
            per_page: config.per_page(),
            next_page: 1,
            buffer: VecDeque::new(),
            emitted: 0,
            exhausted: false,
        }
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// The next item, or `None` once the listing or `max_items` is exhausted.
    pub async fn next(&mut self) -> Result<Option<MediaItem>> {
        if self.max_items.is_some_and(|max| self.emitted >= max) {
            self.exhausted = true;
            self.buffer.clear();
            return Ok(None);
        }

        while self.buffer.is_empty() {
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }

        let item = self.buffer.pop_front();
        if item.is_some() {
            self.emitted += 1;
        }
        Ok(item)
    }

    /// Drains the remaining sequence.
    pub async fn collect_all(mut self) -> Result<Vec<MediaItem>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let page_number = self.next_page;
        let page = self
            .api
            .search_page(page_number, self.per_page, self.include_photos)
            .await?;
        self.next_page += 1;

        debug!("Page {page_number}: {} items", page.items.len());

        if page.items.is_empty() || page.is_last() {
            self.exhausted = true;
        }

        let include_photos = self.include_photos;
        self.buffer.extend(
            page.items
                .into_iter()
                .filter(|item| include_photos || !item.is_photo()),
        );
        Ok(())
    }
}

use std::io::Cursor;

use async_trait::async_trait;
use atom_syndication::Feed;
use reqwest::{header, StatusCode};
use tracing::{debug, error, info};

use crate::{channel::ChannelId, store::UrlStore, Error, Result, W};

pub const DEFAULT_FEED_BASE_URL: &str = "https://www.youtube.com";

#[async_trait]
pub trait FeedSource: Send + Sync {
  /// Fetches the raw feed document of a channel.
  async fn fetch(&self, channel_id: &ChannelId) -> Result<String>;
}

pub struct HttpFeedSource {
  client: reqwest::Client,
  base_url: String,
  user_agent: String,
}

impl HttpFeedSource {
  pub fn new(
    client: reqwest::Client,
    base_url: impl Into<String>,
    user_agent: impl Into<String>,
  ) -> Self {
    Self {
      client,
      base_url: base_url.into(),
      user_agent: user_agent.into(),
    }
  }

  pub fn feed_url(&self, channel_id: &ChannelId) -> String {
    let base_url = self.base_url.trim_end_matches('/');
    format!(
      "{base_url}/feeds/videos.xml?channel_id={}",
      channel_id.as_str()
    )
  }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
  async fn fetch(&self, channel_id: &ChannelId) -> Result<String> {
    let resp = self
      .client
      .get(self.feed_url(channel_id))
      .header(header::USER_AGENT, &self.user_agent)
      .send()
      .await?;

    if resp.status() != StatusCode::OK {
      return Err(Error::HttpStatus(resp.status()));
    }

    Ok(resp.text().await?)
  }
}

/// Media content urls of the feed's entries, in document order. Entries
/// without `media:group/media:content` are skipped.
pub fn media_urls(feed: &Feed) -> Vec<String> {
  feed
    .entries
    .iter()
    .filter_map(|entry| match W(entry).media_content_url() {
      Ok(url) => Some(url),
      Err(e) => {
        debug!(video_id = W(entry).video_id(), error = %e, "skipping entry");
        None
      }
    })
    .collect()
}

pub struct FeedPoller<F, S> {
  source: F,
  store: S,
}

impl<F, S> FeedPoller<F, S>
where
  F: FeedSource,
  S: UrlStore,
{
  pub fn new(source: F, store: S) -> Self {
    Self { source, store }
  }

  /// Appends media urls from the channel's feed that the store has not seen
  /// yet, returning how many were added. Errors are logged and count as
  /// nothing new.
  pub async fn poll(&self, channel_id: &ChannelId) -> usize {
    match self.try_poll(channel_id).await {
      Ok(0) => {
        info!("no new media urls found");
        0
      }
      Ok(added) => {
        info!(added, "added new media urls");
        added
      }
      Err(Error::HttpStatus(status)) => {
        error!(%status, "failed to fetch feed");
        0
      }
      Err(e) => {
        error!(error = %e, "error fetching or parsing feed");
        0
      }
    }
  }

  async fn try_poll(&self, channel_id: &ChannelId) -> Result<usize> {
    let body = self.source.fetch(channel_id).await?;
    let feed = Feed::read_from(Cursor::new(body))?;

    let mut known = self.store.snapshot().await?;
    let mut new_urls = Vec::new();

    for url in media_urls(&feed) {
      if url.contains(['\r', '\n']) {
        debug!(url = ?url, "skipping url with a line break");
        continue;
      }

      if !known.contains(&url) {
        known.insert(&url);
        new_urls.push(url);
      }
    }

    if new_urls.is_empty() {
      return Ok(0);
    }

    self.store.append(&new_urls).await?;
    Ok(new_urls.len())
  }
}

#[cfg(test)]
mod test {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;
  use crate::{
    store::{temp_path, CsvFileStore, MemoryStore},
    util::serve_once,
  };

  const FEED: &str = include_str!("../fixtures/feed.xml");
  const A: &str = "https://www.youtube.com/v/aaaaaaaaaaa?version=3";
  const B: &str = "https://www.youtube.com/v/bbbbbbbbbbb?version=3";

  #[derive(Clone)]
  struct FakeSource {
    response: Result<String, StatusCode>,
    fetches: Arc<AtomicUsize>,
  }

  impl FakeSource {
    fn ok(body: impl Into<String>) -> Self {
      Self {
        response: Ok(body.into()),
        fetches: Default::default(),
      }
    }

    fn status(status: StatusCode) -> Self {
      Self {
        response: Err(status),
        fetches: Default::default(),
      }
    }
  }

  #[async_trait]
  impl FeedSource for FakeSource {
    async fn fetch(&self, _channel_id: &ChannelId) -> Result<String> {
      self.fetches.fetch_add(1, Ordering::SeqCst);
      self.response.clone().map_err(Error::HttpStatus)
    }
  }

  fn channel_id() -> ChannelId {
    ChannelId::parse("UCfirstMatchInScripts0_-").unwrap()
  }

  fn feed_with(urls: &[&str]) -> String {
    let entries: String = urls
      .iter()
      .enumerate()
      .map(|(i, url)| {
        format!(
          r#"<entry>
            <id>yt:video:{i}</id>
            <title>video {i}</title>
            <updated>2024-05-0{day}T00:00:00+00:00</updated>
            <media:group><media:content url="{url}"/></media:group>
          </entry>"#,
          day = i % 9 + 1,
        )
      })
      .collect();

    format!(
      r#"<?xml version="1.0" encoding="UTF-8"?>
      <feed xmlns:yt="http://www.youtube.com/xml/schemas/2015"
            xmlns:media="http://search.yahoo.com/mrss/"
            xmlns="http://www.w3.org/2005/Atom">
        <title>channel</title>
        {entries}
      </feed>"#
    )
  }

  fn http_source(base_url: String) -> HttpFeedSource {
    HttpFeedSource::new(reqwest::Client::new(), base_url, "media-watch-test")
  }

  #[test]
  fn test_media_urls_from_fixture() {
    let feed = Feed::read_from(Cursor::new(FEED)).unwrap();
    assert_eq!(media_urls(&feed), vec![A, B, A]);
  }

  #[test]
  fn test_feed_url() {
    let source = HttpFeedSource::new(
      reqwest::Client::new(),
      "https://www.youtube.com/",
      "Mozilla/5.0",
    );
    assert_eq!(
      source.feed_url(&channel_id()),
      "https://www.youtube.com/feeds/videos.xml?channel_id=UCfirstMatchInScripts0_-"
    );
  }

  #[tokio::test]
  async fn test_repeated_url_is_staged_once() {
    let store = MemoryStore::default();
    let poller = FeedPoller::new(FakeSource::ok(FEED), store.clone());

    assert_eq!(poller.poll(&channel_id()).await, 2);
    assert_eq!(store.contents(), vec![A, B]);
    assert_eq!(store.writes(), 1);
  }

  #[tokio::test]
  async fn test_existing_urls_are_not_duplicated() {
    let c = "https://www.youtube.com/v/ccccccccccc?version=3";
    let store = MemoryStore::with_urls(&[A]);
    let poller =
      FeedPoller::new(FakeSource::ok(feed_with(&[A, c])), store.clone());

    assert_eq!(poller.poll(&channel_id()).await, 1);
    assert_eq!(store.contents(), vec![A, c]);
  }

  #[tokio::test]
  async fn test_new_urls_keep_feed_order_after_prefix() {
    let urls = ["https://x/5", "https://x/1", "https://x/4", "https://x/2"];
    let store = MemoryStore::with_urls(&["https://x/1", "https://x/0"]);
    let poller =
      FeedPoller::new(FakeSource::ok(feed_with(&urls)), store.clone());

    assert_eq!(poller.poll(&channel_id()).await, 3);
    assert_eq!(
      store.contents(),
      vec![
        "https://x/1",
        "https://x/0",
        "https://x/5",
        "https://x/4",
        "https://x/2"
      ]
    );
  }

  #[tokio::test]
  async fn test_second_poll_adds_nothing() {
    let store = MemoryStore::default();
    let poller = FeedPoller::new(FakeSource::ok(FEED), store.clone());

    assert_eq!(poller.poll(&channel_id()).await, 2);
    assert_eq!(poller.poll(&channel_id()).await, 0);
    assert_eq!(store.contents(), vec![A, B]);
    assert_eq!(store.writes(), 1);
  }

  #[tokio::test]
  async fn test_url_with_line_break_is_never_stored() {
    let store = MemoryStore::default();
    let feed = feed_with(&["https://a/v/x&#10;y", B]);
    let poller = FeedPoller::new(FakeSource::ok(feed), store.clone());

    let mut added = Vec::new();
    for _ in 0..3 {
      added.push(poller.poll(&channel_id()).await);
    }
    assert_eq!(added, vec![1, 0, 0]);
    assert_eq!(store.contents(), vec![B]);
  }

  #[tokio::test]
  async fn test_non_ok_status_is_soft_failure() {
    for status in [StatusCode::NOT_FOUND, StatusCode::NO_CONTENT] {
      let store = MemoryStore::with_urls(&[A]);
      let source = FakeSource::status(status);
      let poller = FeedPoller::new(source.clone(), store.clone());

      assert_eq!(poller.poll(&channel_id()).await, 0);
      assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
      assert_eq!(store.contents(), vec![A]);
      assert_eq!(store.writes(), 0);
    }
  }

  #[tokio::test]
  async fn test_malformed_feed_is_soft_failure() {
    let store = MemoryStore::default();
    let poller =
      FeedPoller::new(FakeSource::ok("<html>not a feed"), store.clone());

    assert_eq!(poller.poll(&channel_id()).await, 0);
    assert_eq!(store.writes(), 0);
  }

  #[tokio::test]
  async fn test_empty_feed_writes_nothing() {
    let path = temp_path("empty-feed");
    let poller =
      FeedPoller::new(FakeSource::ok(feed_with(&[])), CsvFileStore::new(&path));

    assert_eq!(poller.poll(&channel_id()).await, 0);
    assert!(!path.exists());
  }

  #[tokio::test]
  async fn test_poll_creates_missing_file() {
    let path = temp_path("new-feed");
    let poller =
      FeedPoller::new(FakeSource::ok(FEED), CsvFileStore::new(&path));
    let expected = format!("{A}\r\n{B}\r\n");

    assert_eq!(poller.poll(&channel_id()).await, 2);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), expected);

    assert_eq!(poller.poll(&channel_id()).await, 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), expected);

    std::fs::remove_file(path).ok();
  }

  #[tokio::test]
  async fn test_http_non_ok_status_is_error() {
    let (base_url, request) = serve_once("404 Not Found", "").await;
    let res = http_source(base_url).fetch(&channel_id()).await;
    assert!(matches!(res, Err(Error::HttpStatus(StatusCode::NOT_FOUND))));

    let request = request.await.unwrap().to_ascii_lowercase();
    assert!(request.starts_with(
      "get /feeds/videos.xml?channel_id=ucfirstmatchinscripts0_- "
    ));
    assert!(request.contains("user-agent: media-watch-test\r\n"));
  }

  #[tokio::test]
  async fn test_http_feed_is_polled() {
    let (base_url, request) = serve_once("200 OK", FEED).await;
    let store = MemoryStore::default();
    let poller = FeedPoller::new(http_source(base_url), store.clone());

    assert_eq!(poller.poll(&channel_id()).await, 2);
    assert_eq!(store.contents(), vec![A, B]);

    let request = request.await.unwrap().to_ascii_lowercase();
    assert!(request.contains("user-agent: media-watch-test\r\n"));
  }
}

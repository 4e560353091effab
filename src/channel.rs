use std::fmt;

use async_trait::async_trait;
use http_types::Url;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header;
use tracing::{debug, error, info};

use crate::{Error, Result};

static CHANNEL_ID_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^UC[\w-]{22}$").unwrap());

static CHANNEL_ID_MARKER_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#""channelId":"(UC[\w-]{22})""#).unwrap());

/// A stable channel identifier such as `UCxxxxxxxxxxxxxxxxxxxxxx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
  pub fn parse(s: &str) -> Result<Self> {
    if !CHANNEL_ID_REGEX.is_match(s) {
      return Err(Error::UnsupportedURL(s.into(), "invalid channel id"));
    }
    Ok(Self(s.to_owned()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ChannelId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Url of a channel's public page, reduced to its handle or base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef(Url);

impl ChannelRef {
  /// Keeps only the first path segment and drops query and fragment,
  /// e.g. `https://www.youtube.com/@handle/videos?x=1` becomes
  /// `https://www.youtube.com/@handle`.
  pub fn parse(url: &str) -> Result<Self> {
    let mut url: Url = url
      .trim()
      .parse()
      .map_err(|_| Error::UnsupportedURL(url.into(), "invalid url"))?;

    if url.cannot_be_a_base() {
      return Err(Error::UnsupportedURL(url.into(), "not a page url"));
    }

    let base_path = url
      .path_segments()
      .and_then(|mut segments| segments.find(|s| !s.is_empty()))
      .map(|s| format!("/{s}"))
      .unwrap_or_default();

    url.set_path(&base_path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(Self(url))
  }

  /// The identifier embedded in `/channel/<id>` references, if any.
  ///
  /// Normalization cuts the path down to `/channel`, so this looks at the
  /// reference as the user passed it.
  pub fn direct_id(url: &str) -> Option<ChannelId> {
    let url: Url = url.trim().parse().ok()?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    match (segments.next(), segments.next()) {
      (Some("channel"), Some(id)) => ChannelId::parse(id).ok(),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &str {
    self.0.as_str()
  }
}

impl fmt::Display for ChannelRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[async_trait]
pub trait ChannelResolver: Send + Sync {
  /// Looks up the channel id behind `channel_url`. Failures are logged and
  /// reported as `None`.
  async fn resolve(&self, channel_url: &str) -> Option<ChannelId>;
}

/// Resolves channel ids by scraping the channel page.
pub struct PageResolver {
  client: reqwest::Client,
  user_agent: String,
}

impl PageResolver {
  pub fn new(client: reqwest::Client, user_agent: impl Into<String>) -> Self {
    Self {
      client,
      user_agent: user_agent.into(),
    }
  }

  async fn fetch_page(&self, channel: &ChannelRef) -> Result<String> {
    let resp = self
      .client
      .get(channel.as_str())
      .header(header::USER_AGENT, &self.user_agent)
      .send()
      .await?;

    Ok(resp.text().await?)
  }

  async fn try_resolve(&self, channel_url: &str) -> Result<Option<ChannelId>> {
    if let Some(id) = ChannelRef::direct_id(channel_url) {
      debug!(%id, "channel id taken from url");
      return Ok(Some(id));
    }

    let channel = ChannelRef::parse(channel_url)?;
    debug!(%channel, "fetching channel page");
    let html = self.fetch_page(&channel).await?;

    find_channel_id(&html)
  }
}

#[async_trait]
impl ChannelResolver for PageResolver {
  async fn resolve(&self, channel_url: &str) -> Option<ChannelId> {
    match self.try_resolve(channel_url).await {
      Ok(Some(id)) => {
        info!(%id, "found channel id");
        Some(id)
      }
      Ok(None) => {
        error!(channel_url, "channel id not found");
        None
      }
      Err(e) => {
        error!(channel_url, error = %e, "error extracting channel id");
        None
      }
    }
  }
}

/// Scans the page's `<script>` blocks in document order for the first
/// `"channelId":"UC..."` marker.
pub fn find_channel_id(html: &str) -> Result<Option<ChannelId>> {
  let dom = tl::parse(html, tl::ParserOptions::default())?;
  let parser = dom.parser();

  let scripts = dom
    .query_selector("script")
    .expect("selector is hard-coded, thus must be valid");

  for handle in scripts {
    let Some(node) = handle.get(parser) else {
      continue;
    };

    let content = node.inner_text(parser);
    if !content.contains(r#""channelId":""#) {
      continue;
    }

    if let Some(m) = CHANNEL_ID_MARKER_REGEX
      .captures(&content)
      .and_then(|cap| cap.get(1))
    {
      return ChannelId::parse(m.as_str()).map(Some);
    }
  }

  Ok(None)
}

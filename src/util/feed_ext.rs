use atom_syndication::{extension::Extension, Entry};

use crate::{Error, Result, W};

impl<'a> W<&'a Entry> {
  fn invalid(&self, reason: &'static str) -> Error {
    Error::InvalidFeedEntry(self.0.id.clone(), reason)
  }

  fn media_group_child(&self, name: &str) -> Result<&'a Extension> {
    self
      .0
      .extensions
      .get("media")
      .ok_or_else(|| self.invalid("not media extension"))?
      .get("group")
      .and_then(|groups| groups.first())
      .ok_or_else(|| self.invalid("not media group"))?
      .children
      .get(name)
      .and_then(|children| children.first())
      .ok_or_else(|| self.invalid("no media group children"))
  }

  /// The `url` attribute of `media:group/media:content`.
  pub fn media_content_url(&self) -> Result<String> {
    self
      .media_group_child("content")?
      .attrs
      .get("url")
      .filter(|url| !url.is_empty())
      .cloned()
      .ok_or_else(|| self.invalid("no media content url"))
  }

  pub fn video_id(&self) -> Option<&'a str> {
    self
      .0
      .extensions
      .get("yt")?
      .get("videoId")?
      .first()?
      .value()
  }
}

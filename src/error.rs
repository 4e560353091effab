use std::process::ExitStatus;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("http request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("unexpected http status: {0}")]
  HttpStatus(StatusCode),

  #[error("invalid html: {0}")]
  InvalidHTML(#[from] tl::ParseError),

  #[error("invalid feed: {0}")]
  Feed(#[from] atom_syndication::Error),

  #[error("invalid feed entry {0}: {1}")]
  InvalidFeedEntry(String, &'static str),

  #[error("unsupported url {0}: {1}")]
  UnsupportedURL(String, &'static str),

  #[error("channel id not found for {0}")]
  ChannelNotFound(String),

  #[error("external tool exited with {status}: {stderr}")]
  ExternalTool { status: ExitStatus, stderr: String },

  #[error("io error: {0}")]
  IO(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

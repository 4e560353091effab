use std::{
  ffi::OsString,
  path::{Path, PathBuf},
  process::Stdio,
};

use async_trait::async_trait;
use http_types::Url;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{util::redact_credentials, Error, Result};

use super::AudioExtractor;

pub const DEFAULT_YTDLP: &str = "yt-dlp";

const AUDIO_FORMAT: &str = "mp3";

// run yt-dlp command line to extract the audio track into a file.
// requires yt-dlp executable to be in PATH unless a path is given.
pub struct Ytdlp {
  program: PathBuf,
  proxy: Option<String>,
}

impl Ytdlp {
  pub fn new(program: impl Into<PathBuf>, proxy: Option<String>) -> Self {
    Self {
      program: program.into(),
      proxy,
    }
  }

  fn args(&self, url: &str, out_dir: &Path) -> Vec<OsString> {
    let template = out_dir.join(format!("{}.%(ext)s", output_name(url)));

    let mut args: Vec<OsString> = vec![
      "-x".into(),
      "--audio-format".into(),
      AUDIO_FORMAT.into(),
      "--audio-quality".into(),
      "0".into(),
      "--output".into(),
      template.into(),
    ];

    if let Some(proxy) = &self.proxy {
      args.push("--proxy".into());
      args.push(proxy.into());
    }

    args.push(url.into());
    args
  }
}

#[async_trait]
impl AudioExtractor for Ytdlp {
  async fn extract(&self, url: &str, out_dir: &Path) -> Result<PathBuf> {
    info!(url, "downloading audio");
    if let Some(proxy) = &self.proxy {
      debug!(proxy = redact_credentials(proxy), "using proxy");
    }

    let output = Command::new(&self.program)
      .args(self.args(url, out_dir))
      .stdin(Stdio::null())
      .stdout(Stdio::inherit())
      .stderr(Stdio::piped())
      .output()
      .await?;

    if !output.status.success() {
      return Err(Error::ExternalTool {
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
      });
    }

    Ok(out_dir.join(format!("{}.{AUDIO_FORMAT}", output_name(url))))
  }
}

/// File stem for the downloaded audio: the last non-empty path segment of
/// the url, or the text after the final `/` when the url does not parse.
fn output_name(url: &str) -> String {
  let from_path = url.parse::<Url>().ok().and_then(|url| {
    url
      .path_segments()?
      .filter(|s| !s.is_empty())
      .last()
      .map(|s| s.to_owned())
  });

  from_path.unwrap_or_else(|| {
    url.rsplit('/').next().unwrap_or_default().to_owned()
  })
}

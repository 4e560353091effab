mod ytdlp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::Result;

pub use ytdlp::{Ytdlp, DEFAULT_YTDLP};

#[async_trait]
pub trait AudioExtractor: Send + Sync {
  /// Downloads the audio track behind `url` into `out_dir` and returns the
  /// path of the produced file.
  async fn extract(&self, url: &str, out_dir: &Path) -> Result<PathBuf>;
}

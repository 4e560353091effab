use std::path::PathBuf;

use tracing::{error, info};

use crate::{extractor::AudioExtractor, store::CsvFileStore, Result};

pub const DEFAULT_AUDIO_DIR: &str = "audio";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
  pub downloaded: usize,
  pub failed: usize,
}

/// One pass over the url list, extracting audio for every record.
pub struct BatchDownloader<E> {
  store: CsvFileStore,
  audio_dir: PathBuf,
  extractor: E,
}

impl<E: AudioExtractor> BatchDownloader<E> {
  pub fn new(
    store: CsvFileStore,
    audio_dir: impl Into<PathBuf>,
    extractor: E,
  ) -> Self {
    Self {
      store,
      audio_dir: audio_dir.into(),
      extractor,
    }
  }

  /// Fails only if the audio directory or the url list is unavailable.
  /// A failing entry is logged and the pass moves on to the next one.
  pub async fn run(&self) -> Result<BatchSummary> {
    tokio::fs::create_dir_all(&self.audio_dir).await?;
    let urls = self.store.read_existing().await?;

    let mut summary = BatchSummary::default();
    for url in &urls {
      match self.extractor.extract(url, &self.audio_dir).await {
        Ok(path) => {
          info!(url = %url, path = %path.display(), "downloaded audio");
          summary.downloaded += 1;
        }
        Err(e) => {
          error!(url = %url, error = %e, "error downloading audio");
          summary.failed += 1;
        }
      }
    }

    Ok(summary)
  }
}

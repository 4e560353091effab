use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod channel;
mod cli;
mod download;
mod error;
mod extractor;
mod feed;
mod store;
mod util;
mod watch;

pub use error::{Error, Result};
pub use util::W;

use crate::{
  channel::PageResolver,
  cli::{Cli, Command},
  download::BatchDownloader,
  extractor::Ytdlp,
  feed::{FeedPoller, HttpFeedSource},
  store::CsvFileStore,
  watch::{TokioSleeper, Watcher},
};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  init_tracing();

  let cli = Cli::parse();

  match cli.command {
    Command::Watch {
      channel_url,
      interval,
      user_agent,
      feed_base_url,
    } => {
      let client = reqwest::Client::new();
      let watcher = Watcher::new(
        channel_url,
        Duration::from_secs(interval),
        PageResolver::new(client.clone(), user_agent.clone()),
        FeedPoller::new(
          HttpFeedSource::new(client, feed_base_url, user_agent),
          CsvFileStore::new(cli.store),
        ),
        TokioSleeper,
      );

      Toplevel::new(move |s: SubsystemHandle| async move {
        s.start(SubsystemBuilder::new(
          "watch",
          move |subsys: SubsystemHandle| run_watch(subsys, watcher),
        ));
      })
      .catch_signals()
      .handle_shutdown_requests(SHUTDOWN_TIMEOUT)
      .await
      .map_err(|e| anyhow::anyhow!("watch stopped: {e}"))?;
    }
    Command::Download {
      audio_dir,
      ytdlp,
      proxy,
    } => {
      let store = CsvFileStore::new(cli.store);
      let list = store.path().display().to_string();
      let downloader =
        BatchDownloader::new(store, audio_dir, Ytdlp::new(ytdlp, proxy));

      let summary = downloader
        .run()
        .await
        .with_context(|| format!("failed to download from {list}"))?;
      tracing::info!(
        downloaded = summary.downloaded,
        failed = summary.failed,
        "download pass finished"
      );
    }
  }

  Ok(())
}

async fn run_watch<R, F, S, Z>(
  subsys: SubsystemHandle,
  watcher: Watcher<R, F, S, Z>,
) -> Result<()>
where
  R: channel::ChannelResolver,
  F: feed::FeedSource,
  S: store::UrlStore,
  Z: watch::Sleeper,
{
  let cancel = CancellationToken::new();
  let watch = watcher.run(cancel.clone());
  tokio::pin!(watch);

  tokio::select! {
    res = &mut watch => res,
    _ = subsys.on_shutdown_requested() => {
      cancel.cancel();
      watch.await
    }
  }
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt().with_env_filter(filter).init();
}

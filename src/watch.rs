use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
  channel::{ChannelId, ChannelResolver},
  feed::{FeedPoller, FeedSource},
  store::UrlStore,
  Error, Result,
};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Sleeper: Send + Sync {
  async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
  async fn sleep(&self, duration: Duration) {
    tokio::time::sleep(duration).await
  }
}

#[derive(Debug)]
enum WatchState {
  Resolving,
  Polling(ChannelId),
}

/// Resolves a channel once, then polls its feed every `interval` until
/// cancelled.
pub struct Watcher<R, F, S, Z> {
  channel_url: String,
  interval: Duration,
  resolver: R,
  poller: FeedPoller<F, S>,
  sleeper: Z,
}

impl<R, F, S, Z> Watcher<R, F, S, Z>
where
  R: ChannelResolver,
  F: FeedSource,
  S: UrlStore,
  Z: Sleeper,
{
  pub fn new(
    channel_url: impl Into<String>,
    interval: Duration,
    resolver: R,
    poller: FeedPoller<F, S>,
    sleeper: Z,
  ) -> Self {
    Self {
      channel_url: channel_url.into(),
      interval,
      resolver,
      poller,
      sleeper,
    }
  }

  /// Fails only when the channel id cannot be resolved. Cancellation is
  /// observed before each poll and while sleeping.
  pub async fn run(self, cancel: CancellationToken) -> Result<()> {
    let mut state = WatchState::Resolving;

    loop {
      if cancel.is_cancelled() {
        info!("watch cancelled");
        return Ok(());
      }

      state = match state {
        WatchState::Resolving => {
          let Some(channel_id) = self.resolver.resolve(&self.channel_url).await
          else {
            error!(
              channel_url = %self.channel_url,
              "exiting, cannot fetch channel id"
            );
            return Err(Error::ChannelNotFound(self.channel_url));
          };

          info!(
            %channel_id,
            interval_secs = self.interval.as_secs_f64(),
            "watching for new media content"
          );
          WatchState::Polling(channel_id)
        }
        WatchState::Polling(channel_id) => {
          self.poller.poll(&channel_id).await;

          tokio::select! {
            _ = cancel.cancelled() => {}
            _ = self.sleeper.sleep(self.interval) => {}
          }

          WatchState::Polling(channel_id)
        }
      };
    }
  }
}

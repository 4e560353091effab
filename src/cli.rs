use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{
  download::DEFAULT_AUDIO_DIR, extractor::DEFAULT_YTDLP,
  feed::DEFAULT_FEED_BASE_URL, watch::DEFAULT_INTERVAL,
};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Parser)]
#[command(
  name = "youtube-media-watch",
  about = "Collects new media urls from a YouTube channel feed and downloads their audio"
)]
pub struct Cli {
  /// File the media urls are recorded in
  #[arg(
    long,
    global = true,
    env = "MEDIA_URLS_FILE",
    default_value = "media_urls.csv"
  )]
  pub store: PathBuf,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Resolve the channel, then poll its feed until interrupted
  Watch {
    /// Channel page url, e.g. https://www.youtube.com/@handle/videos
    channel_url: String,

    /// Seconds to wait between polls
    #[arg(
      long,
      env = "WATCH_INTERVAL",
      default_value_t = DEFAULT_INTERVAL.as_secs()
    )]
    interval: u64,

    /// User-Agent sent with every request
    #[arg(long, env = "HTTP_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Scheme and host the feed is served from
    #[arg(long, env = "FEED_BASE_URL", default_value = DEFAULT_FEED_BASE_URL)]
    feed_base_url: String,
  },
  /// Download the audio of every recorded url once and exit
  Download {
    /// Directory the audio files are written to
    #[arg(long, env = "AUDIO_DIR", default_value = DEFAULT_AUDIO_DIR)]
    audio_dir: PathBuf,

    /// yt-dlp executable
    #[arg(long, env = "YTDLP_PATH", default_value = DEFAULT_YTDLP)]
    ytdlp: PathBuf,

    /// Proxy passed on to yt-dlp
    #[arg(long, env = "YTDLP_PROXY")]
    proxy: Option<String>,
  },
}

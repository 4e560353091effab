//! Append-only record of media urls.
//!
//! The list only ever grows: polls append new urls, nothing is rewritten or
//! compacted. Uniqueness is enforced by callers through [`UrlSet::contains`]
//! before appending, never by the storage itself.

use std::{
  collections::HashSet,
  io::ErrorKind,
  path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::Result;

#[async_trait]
pub trait UrlStore: Send + Sync {
  /// All stored urls in record order. Empty if nothing was written yet.
  async fn urls(&self) -> Result<Vec<String>>;

  /// Appends `urls` in order with a single write.
  async fn append(&self, urls: &[String]) -> Result<()>;

  async fn snapshot(&self) -> Result<UrlSet> {
    Ok(UrlSet(self.urls().await?.into_iter().collect()))
  }
}

/// In-memory membership view over a store.
#[derive(Debug, Default)]
pub struct UrlSet(HashSet<String>);

impl UrlSet {
  pub fn contains(&self, url: &str) -> bool {
    self.0.contains(url)
  }

  pub fn insert(&mut self, url: &str) {
    self.0.insert(url.to_owned());
  }
}

/// Comma separated file, one record per line, url in the first field.
pub struct CsvFileStore {
  path: PathBuf,
}

impl CsvFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Reads the records, failing if the file does not exist.
  pub async fn read_existing(&self) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(&self.path).await?;
    Ok(first_fields(&content))
  }
}

#[async_trait]
impl UrlStore for CsvFileStore {
  async fn urls(&self) -> Result<Vec<String>> {
    match self.read_existing().await {
      Err(crate::Error::IO(e)) if e.kind() == ErrorKind::NotFound => {
        Ok(Vec::new())
      }
      res => res,
    }
  }

  async fn append(&self, urls: &[String]) -> Result<()> {
    if urls.is_empty() {
      return Ok(());
    }

    let mut records = String::new();
    for url in urls {
      records.push_str(&quote_field(url));
      records.push_str("\r\n");
    }

    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)
      .await?;
    file.write_all(records.as_bytes()).await?;
    file.flush().await?;

    Ok(())
  }
}

/// First field of every non-blank record. Line breaks inside a quoted field
/// belong to the field, not to the record separator.
fn first_fields(content: &str) -> Vec<String> {
  let mut fields = Vec::new();
  let mut field = String::new();
  let mut column = 0;
  let mut quoted = false;
  let mut at_field_start = true;

  let mut chars = content.chars().peekable();
  while let Some(c) = chars.next() {
    if quoted {
      match c {
        '"' if chars.peek() == Some(&'"') => {
          chars.next();
          if column == 0 {
            field.push('"');
          }
        }
        '"' => quoted = false,
        c if column == 0 => field.push(c),
        _ => {}
      }
      continue;
    }

    match c {
      '"' if at_field_start => {
        quoted = true;
        at_field_start = false;
      }
      ',' => {
        column += 1;
        at_field_start = true;
      }
      '\r' if chars.peek() == Some(&'\n') => {}
      '\n' => {
        end_record(&mut fields, &mut field);
        column = 0;
        at_field_start = true;
      }
      c => {
        if column == 0 {
          field.push(c);
        }
        at_field_start = false;
      }
    }
  }

  end_record(&mut fields, &mut field);
  fields
}

fn end_record(fields: &mut Vec<String>, field: &mut String) {
  let field = std::mem::take(field);
  if !field.trim().is_empty() {
    fields.push(field);
  }
}

fn quote_field(field: &str) -> String {
  if field.contains([',', '"', '\r', '\n']) {
    format!("\"{}\"", field.replace('"', "\"\""))
  } else {
    field.to_owned()
  }
}

#[cfg(test)]
#[derive(Default, Clone)]
pub struct MemoryStore {
  urls: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
  writes: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl MemoryStore {
  pub fn with_urls(urls: &[&str]) -> Self {
    let store = Self::default();
    store
      .urls
      .lock()
      .unwrap()
      .extend(urls.iter().map(|x| x.to_string()));
    store
  }

  pub fn contents(&self) -> Vec<String> {
    self.urls.lock().unwrap().clone()
  }

  pub fn writes(&self) -> usize {
    self.writes.load(std::sync::atomic::Ordering::SeqCst)
  }
}

#[cfg(test)]
#[async_trait]
impl UrlStore for MemoryStore {
  async fn urls(&self) -> Result<Vec<String>> {
    Ok(self.contents())
  }

  async fn append(&self, urls: &[String]) -> Result<()> {
    self
      .writes
      .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    self.urls.lock().unwrap().extend_from_slice(urls);
    Ok(())
  }
}

#[cfg(test)]
pub fn temp_path(name: &str) -> PathBuf {
  let suffix: u64 = rand::random();
  std::env::temp_dir().join(format!("youtube-media-watch-{name}-{suffix:x}"))
}

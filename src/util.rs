use once_cell::sync::Lazy;
use regex::Regex;

mod feed_ext;

#[derive(Default)]
pub struct W<T>(pub T);

// used to remove cred info from proxy url before printing
static AUTH_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"//[^:/@]+(:[^@]+)?@").unwrap());

pub fn redact_credentials(url: &str) -> String {
  AUTH_REGEX.replace(url, "//<REDACTED>@").into_owned()
}

/// Serves one canned HTTP response on a local port. Resolves to the raw
/// request head that was received.
#[cfg(test)]
pub async fn serve_once(
  status: &str,
  body: impl Into<String>,
) -> (String, tokio::task::JoinHandle<String>) {
  use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
  };

  let body = body.into();
  let response = format!(
    "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
    body.len()
  );

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let base_url = format!("http://{}", listener.local_addr().unwrap());

  let handle = tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut request = Vec::new();
    let mut buf = [0; 1024];
    while !request.ends_with(b"\r\n\r\n") {
      let n = socket.read(&mut buf).await.unwrap();
      if n == 0 {
        break;
      }
      request.extend_from_slice(&buf[..n]);
    }

    socket.write_all(response.as_bytes()).await.unwrap();
    socket.shutdown().await.ok();
    String::from_utf8_lossy(&request).into_owned()
  });

  (base_url, handle)
}

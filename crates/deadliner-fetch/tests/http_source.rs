//! Tests against a throwaway HTTP server on localhost.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use deadliner_core::LineSource;
use deadliner_fetch::{FetchSettings, HttpLineSource};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned response per connection, in order. Returns the page URL
/// and a hit counter.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut sock, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = vec![0u8; 8192];
            let _ = sock.read(&mut buf).await;
            let reply = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = sock.write_all(reply.as_bytes()).await;
            let _ = sock.shutdown().await;
        }
    });

    (format!("http://{addr}/cfp.html"), hits)
}

fn source(max_retries: u32) -> HttpLineSource {
    HttpLineSource::new(FetchSettings {
        max_retries,
        retry_base: Duration::from_millis(5),
        timeout: Duration::from_secs(5),
        ..FetchSettings::default()
    })
    .unwrap()
}

const PAGE: &str = "<html><body><h2>Important dates</h2><p>Paper submission: June 6, 2025</p></body></html>";

#[tokio::test]
async fn fetches_and_renders_lines() {
    let (url, hits) = serve(vec![(200, PAGE)]).await;
    let page = source(0).fetch(&url).await;
    assert!(page.error.is_none());
    assert_eq!(page.lines, vec!["Important dates", "Paper submission: June 6, 2025"]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_server_errors() {
    let (url, hits) = serve(vec![(503, "busy"), (502, "busy"), (200, PAGE)]).await;
    let page = source(2).fetch(&url).await;
    assert!(page.is_success());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let (url, hits) = serve(vec![(500, "down"), (500, "down"), (200, PAGE)]).await;
    let page = source(1).fetch(&url).await;
    assert!(!page.is_success());
    assert_eq!(page.error.as_deref(), Some("HTTP 500 Internal Server Error"));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (url, hits) = serve(vec![(404, "missing"), (200, PAGE)]).await;
    let page = source(3).fetch(&url).await;
    assert_eq!(page.error.as_deref(), Some("HTTP 404 Not Found"));
    assert!(page.lines.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reads_file_urls() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfp.html");
    std::fs::write(&path, PAGE).unwrap();

    let page = source(0).fetch(&format!("file://{}", path.display())).await;
    assert_eq!(page.lines.len(), 2);
    assert!(page.error.is_none());

    let missing = source(0)
        .fetch(&format!("file://{}", dir.path().join("nope.html").display()))
        .await;
    assert!(!missing.is_success());
    assert!(missing.error.unwrap().starts_with("IO error"));
}

// tests/ingest_partial_failure.rs
//! Fetch fan-out against local fixture servers: one failing source must
//! produce exactly one error record and never disturb its siblings.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use veille_digest::ingest::types::{FeedErrorKind, FeedSource, FetchStatus};
use veille_digest::ingest::{fetch_feeds, FetchOptions};

const FEED_A: &str = r#"<rss><channel>
  <item><title>A1</title><link>http://x/a1</link><description>alpha</description></item>
</channel></rss>"#;

const FEED_B: &str = r#"<rss><channel>
  <item><title>B1</title><link>http://x/b1</link><description>beta</description></item>
  <item><title>B2</title><link>http://x/b2</link><description>beta two</description></item>
</channel></rss>"#;

/// Minimal one-shot HTTP fixture server; enough for reqwest.
async fn serve_feed(body: &'static str, status_line: &'static str, delay: Option<Duration>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                if let Some(d) = delay {
                    tokio::time::sleep(d).await;
                }
                let resp = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: application/rss+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(resp.as_bytes()).await;
            });
        }
    });
    format!("http://{addr}/feed")
}

fn source(name: &str, url: String) -> FeedSource {
    FeedSource {
        name: name.into(),
        url,
        category: "Tech".into(),
    }
}

#[tokio::test]
async fn one_timed_out_source_yields_one_error_and_partial_success() {
    let fast_a = serve_feed(FEED_A, "200 OK", None).await;
    let fast_b = serve_feed(FEED_B, "200 OK", None).await;
    let slow = serve_feed(FEED_A, "200 OK", Some(Duration::from_secs(5))).await;

    let sources = vec![
        source("Alpha", fast_a),
        source("Slow", slow),
        source("Beta", fast_b),
    ];
    let opts = FetchOptions {
        timeout_secs: 1,
        concurrency: 8,
    };

    let outcome = fetch_feeds(&sources, &opts).await;

    assert_eq!(outcome.status, FetchStatus::PartialSuccess);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].source, "Slow");
    assert_eq!(outcome.errors[0].kind, FeedErrorKind::Timeout);
    // The two healthy sources still delivered everything.
    assert_eq!(outcome.articles.len(), 3);
}

#[tokio::test]
async fn http_error_status_is_recorded_per_source() {
    let ok = serve_feed(FEED_A, "200 OK", None).await;
    let broken = serve_feed("gone", "404 Not Found", None).await;

    let sources = vec![source("Ok", ok), source("Broken", broken)];
    let outcome = fetch_feeds(&sources, &FetchOptions::default()).await;

    assert_eq!(outcome.status, FetchStatus::PartialSuccess);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, FeedErrorKind::Http(404));
    assert_eq!(outcome.articles.len(), 1);
}

#[tokio::test]
async fn unparseable_body_is_a_parse_error() {
    let garbage = serve_feed("hello, not a feed", "200 OK", None).await;
    let outcome = fetch_feeds(&[source("Garbage", garbage)], &FetchOptions::default()).await;

    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, FeedErrorKind::Parse);
    assert!(outcome.articles.is_empty());
}

#[tokio::test]
async fn refused_connection_is_a_connection_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let outcome = fetch_feeds(
        &[source("Refused", format!("http://{addr}/feed"))],
        &FetchOptions::default(),
    )
    .await;

    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, FeedErrorKind::Connection);
}

#[tokio::test]
async fn fan_in_preserves_configured_source_order() {
    // Same link from two sources: whichever source is configured first must
    // win downstream deduplication, regardless of fetch completion order.
    let slow_first = serve_feed(FEED_A, "200 OK", Some(Duration::from_millis(300))).await;
    let fast_second = serve_feed(FEED_A, "200 OK", None).await;

    let sources = vec![
        source("First", slow_first),
        source("Second", fast_second),
    ];
    let outcome = fetch_feeds(&sources, &FetchOptions::default()).await;

    assert_eq!(outcome.status, FetchStatus::Success);
    assert_eq!(outcome.articles.len(), 2);
    assert_eq!(outcome.articles[0].source, "First");
    assert_eq!(outcome.articles[1].source, "Second");

    let deduped = veille_digest::curate::dedupe(outcome.articles);
    assert_eq!(deduped.len(), 1);
    assert_eq!(deduped[0].source, "First");
}

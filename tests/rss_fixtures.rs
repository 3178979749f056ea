// tests/rss_fixtures.rs
use chrono::{TimeZone, Utc};
use veille_digest::ingest::rss::parse_feed;
use veille_digest::ingest::types::FeedSource;
use veille_digest::ingest::MAX_DESCRIPTION_CHARS;

fn source(name: &str, category: &str) -> FeedSource {
    FeedSource {
        name: name.into(),
        url: "https://example.com/feed".into(),
        category: category.into(),
    }
}

#[test]
fn rss_fixture_parses_all_entries() {
    let xml = include_str!("fixtures/sample_rss.xml");
    let fetched_at = Utc.with_ymd_and_hms(2025, 8, 7, 6, 0, 0).unwrap();
    let articles = parse_feed(xml, &source("Example Tech Wire", "Tech"), fetched_at).unwrap();

    assert_eq!(articles.len(), 3);

    let chip = &articles[0];
    assert_eq!(chip.title, "Acme ships a new inference chip");
    assert_eq!(chip.link, "https://example.com/articles/acme-chip");
    assert_eq!(
        chip.published_at,
        Utc.with_ymd_and_hms(2025, 8, 5, 9, 30, 0).unwrap()
    );
    // Markup stripped from the summary
    assert!(!chip.description.contains('<'));
    assert!(chip.description.contains("new accelerator"));
    assert_eq!(chip.source, "Example Tech Wire");
    assert_eq!(chip.category, "Tech");
}

#[test]
fn missing_link_and_date_fall_back_safely() {
    let xml = include_str!("fixtures/sample_rss.xml");
    let fetched_at = Utc.with_ymd_and_hms(2025, 8, 7, 6, 0, 0).unwrap();
    let articles = parse_feed(xml, &source("Wire", "Tech"), fetched_at).unwrap();

    let linkless = &articles[1];
    assert!(linkless.link.is_empty());
    assert_eq!(linkless.published_at, fetched_at);

    let garbage_date = &articles[2];
    assert_eq!(garbage_date.published_at, fetched_at);
}

#[test]
fn atom_fixture_prefers_alternate_links() {
    let xml = include_str!("fixtures/sample_atom.xml");
    let fetched_at = Utc::now();
    let articles = parse_feed(xml, &source("Example Research Blog", "IA"), fetched_at).unwrap();

    assert_eq!(articles.len(), 2);
    assert_eq!(
        articles[0].link,
        "https://blog.example.org/posts/benchmarking-retrieval"
    );
    assert_eq!(
        articles[0].published_at,
        Utc.with_ymd_and_hms(2025, 8, 6, 7, 45, 0).unwrap()
    );

    // Second entry has no summary: content is used, updated is the date.
    assert!(articles[1].description.contains("Longer-form content"));
    assert_eq!(
        articles[1].published_at,
        Utc.with_ymd_and_hms(2025, 8, 5, 18, 20, 0).unwrap()
    );
}

#[test]
fn long_summaries_are_truncated() {
    let body = format!(
        r#"<rss><channel><item><title>Long</title><description>{}</description></item></channel></rss>"#,
        "word ".repeat(200)
    );
    let articles = parse_feed(&body, &source("Wire", "Tech"), Utc::now()).unwrap();
    assert!(articles[0].description.chars().count() <= MAX_DESCRIPTION_CHARS);
}

#[test]
fn non_feed_body_is_a_parse_error() {
    let err = parse_feed("this is not xml at all", &source("Wire", "Tech"), Utc::now());
    assert!(err.is_err());
}

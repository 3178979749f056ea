// tests/render_newsletter.rs
use chrono::{TimeZone, Utc};
use veille_digest::digest::CategoryGroup;
use veille_digest::ingest::types::Article;
use veille_digest::render::newsletter_html;

fn article(title: &str, link: &str, description: &str) -> Article {
    let ts = Utc.with_ymd_and_hms(2025, 8, 5, 10, 0, 0).unwrap();
    Article {
        title: title.into(),
        link: link.into(),
        description: description.into(),
        published_at: ts,
        source: "Wire & Co".into(),
        category: "S\u{e9}curit\u{e9}".into(),
        fetched_at: ts,
    }
}

#[test]
fn article_text_is_escaped_before_embedding() {
    let group = CategoryGroup {
        category: "S\u{e9}curit\u{e9}".into(),
        articles: vec![article(
            r#"<script>alert("xss")</script>"#,
            "http://x/a?b=1&c=2",
            "Quote: 'single' and \"double\"",
        )],
        summary: Some("Summary with <tags> & ampersands".into()),
    };

    let html = newsletter_html(&[group], Utc.with_ymd_and_hms(2025, 8, 7, 6, 0, 0).unwrap());

    assert!(!html.contains("<script>alert"));
    assert!(html.contains("&lt;script&gt;alert(&quot;xss&quot;)&lt;/script&gt;"));
    assert!(html.contains("http://x/a?b=1&amp;c=2"));
    assert!(html.contains("&#39;single&#39;"));
    assert!(html.contains("Summary with &lt;tags&gt; &amp; ampersands"));
    assert!(html.contains("Wire &amp; Co"));
}

#[test]
fn toc_links_categories_to_sections() {
    let group = CategoryGroup {
        category: "Intelligence Artificielle".into(),
        articles: vec![article("T", "http://x/t", "d")],
        summary: None,
    };
    let html = newsletter_html(&[group], Utc::now());

    assert!(html.contains("href=\"#intelligence-artificielle\""));
    assert!(html.contains("id=\"intelligence-artificielle\""));
    assert!(html.contains("Intelligence Artificielle (1)"));
}

#[test]
fn linkless_articles_render_without_anchors() {
    let group = CategoryGroup {
        category: "Tech".into(),
        articles: vec![article("No link here", "", "d")],
        summary: None,
    };
    let html = newsletter_html(&[group], Utc::now());

    assert!(html.contains("<h3>No link here</h3>"));
    assert!(!html.contains("Lire la suite"));
}

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::{Article, FeedSource, DEFAULT_CATEGORY};
use crate::ingest::normalize_text;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}
#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    summary: Option<String>,
    content: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// RFC 2822 first (RSS `pubDate`), then RFC 3339 (Atom). Anything else
/// falls back to the fetch time rather than failing the entry.
fn parse_pub_date(raw: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc2822) {
        let ts = dt.to_offset(UtcOffset::UTC).unix_timestamp();
        if let Some(dt) = DateTime::<Utc>::from_timestamp(ts, 0) {
            return dt;
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    fallback
}

/// Parse a raw feed body into articles. Tries RSS 2.0 first, then Atom.
/// Entries missing a link or date are kept with safe defaults; entries with
/// no usable content at all are dropped silently.
pub fn parse_feed(body: &str, source: &FeedSource, fetched_at: DateTime<Utc>) -> Result<Vec<Article>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(body);

    let articles = if let Ok(rss) = from_str::<Rss>(&xml_clean) {
        rss.channel
            .item
            .into_iter()
            .filter_map(|it| {
                extract_article(
                    it.title,
                    it.link,
                    it.description,
                    it.pub_date,
                    source,
                    fetched_at,
                )
            })
            .collect::<Vec<_>>()
    } else {
        let feed: AtomFeed = from_str(&xml_clean).context("parsing feed body as rss/atom")?;
        feed.entry
            .into_iter()
            .filter_map(|en| {
                // Prefer the alternate link; Atom feeds often lead with `self`.
                let link = en
                    .link
                    .iter()
                    .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
                    .or_else(|| en.link.first())
                    .and_then(|l| l.href.clone());
                let summary = en.summary.or(en.content);
                let date = en.published.or(en.updated);
                extract_article(en.title, link, summary, date, source, fetched_at)
            })
            .collect::<Vec<_>>()
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_entries_total").increment(articles.len() as u64);
    Ok(articles)
}

fn extract_article(
    title: Option<String>,
    link: Option<String>,
    summary: Option<String>,
    pub_date: Option<String>,
    source: &FeedSource,
    fetched_at: DateTime<Utc>,
) -> Option<Article> {
    let title = normalize_text(title.as_deref().unwrap_or_default());
    let link = link.unwrap_or_default().trim().to_string();
    let description = normalize_text(summary.as_deref().unwrap_or_default());

    if title.is_empty() && description.is_empty() && link.is_empty() {
        return None;
    }

    let published_at = pub_date
        .as_deref()
        .map(|raw| parse_pub_date(raw, fetched_at))
        .unwrap_or(fetched_at);

    let category = if source.category.trim().is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        source.category.clone()
    };

    Some(Article {
        title,
        link,
        description,
        published_at,
        source: source.name.clone(),
        category,
        fetched_at,
    })
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

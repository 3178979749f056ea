// src/ingest/mod.rs
pub mod rss;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::ingest::types::{
    Article, FeedError, FeedErrorKind, FeedSource, FetchOutcome, FetchStatus,
};

/// Descriptions are capped so a noisy feed cannot blow up translation cost
/// or the rendered digest.
pub const MAX_DESCRIPTION_CHARS: usize = 300;

/// Identifying user-agent; some hosts reject anonymous fetchers outright.
pub const USER_AGENT: &str = "veille-digest/0.1 (+https://github.com/veille-digest)";

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub timeout_secs: u64,
    pub concurrency: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            concurrency: 8,
        }
    }
}

/// One-time metrics registration (so series show up on a host recorder).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_entries_total", "Entries parsed from feed bodies.");
        describe_counter!("ingest_articles_total", "Articles kept after ingestion.");
        describe_counter!("ingest_feed_errors_total", "Per-source fetch/parse errors.");
        describe_counter!("curate_dedup_removed_total", "Articles removed as duplicates.");
        describe_counter!(
            "curate_filtered_total",
            "Articles dropped by the recency filter."
        );
        describe_counter!("curate_capped_total", "Articles dropped by per-category caps.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Normalize entry text: decode entities, strip tags, collapse whitespace,
/// cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap
    if out.chars().count() > MAX_DESCRIPTION_CHARS {
        out = out.chars().take(MAX_DESCRIPTION_CHARS).collect();
        out = out.trim_end().to_string();
    }

    out
}

/// Fetch every configured source, bounded fan-out, and fan results back in
/// by configured order so downstream dedup stays deterministic. A failing
/// source yields one error record and never cancels its siblings.
pub async fn fetch_feeds(sources: &[FeedSource], opts: &FetchOptions) -> FetchOutcome {
    ensure_metrics_described();

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .expect("reqwest client");

    let sem = Arc::new(Semaphore::new(opts.concurrency.max(1)));
    let mut set: JoinSet<(usize, String, Result<Vec<Article>, FeedErrorKind>)> = JoinSet::new();

    for (idx, source) in sources.iter().cloned().enumerate() {
        let client = client.clone();
        let sem = sem.clone();
        set.spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore closed");
            let name = source.name.clone();
            let res = fetch_single(&client, &source).await;
            (idx, name, res)
        });
    }

    let mut slots: Vec<Option<(String, Result<Vec<Article>, FeedErrorKind>)>> =
        (0..sources.len()).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, name, res)) => slots[idx] = Some((name, res)),
            Err(e) => tracing::warn!(error = ?e, "feed fetch task failed to join"),
        }
    }

    let mut articles = Vec::new();
    let mut errors = Vec::new();
    for slot in slots.into_iter().flatten() {
        match slot {
            (_, Ok(mut batch)) => articles.append(&mut batch),
            (name, Err(kind)) => {
                tracing::warn!(source = %name, kind = %kind, "feed error");
                counter!("ingest_feed_errors_total").increment(1);
                errors.push(FeedError { source: name, kind });
            }
        }
    }

    counter!("ingest_articles_total").increment(articles.len() as u64);

    let status = if errors.is_empty() {
        FetchStatus::Success
    } else {
        FetchStatus::PartialSuccess
    };
    FetchOutcome {
        status,
        articles,
        errors,
    }
}

async fn fetch_single(
    client: &reqwest::Client,
    source: &FeedSource,
) -> Result<Vec<Article>, FeedErrorKind> {
    let resp = match client.get(&source.url).send().await {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() => return Err(FeedErrorKind::Timeout),
        Err(_) => return Err(FeedErrorKind::Connection),
    };

    let status = resp.status();
    if !status.is_success() {
        return Err(FeedErrorKind::Http(status.as_u16()));
    }

    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) if e.is_timeout() => return Err(FeedErrorKind::Timeout),
        Err(_) => return Err(FeedErrorKind::Connection),
    };

    let fetched_at = chrono::Utc::now();
    rss::parse_feed(&body, source, fetched_at).map_err(|e| {
        tracing::warn!(source = %source.name, error = ?e, "unparseable feed body");
        FeedErrorKind::Parse
    })
}

// src/curate.rs
//! Curation stages between ingestion and translation: deduplication,
//! recency filtering and per-category volume capping. All pure over the
//! article set; each returns a new Vec.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::ingest::types::Article;

/// Collapse articles sharing a non-empty link to the first occurrence.
/// Sources are fetched in configured order, so "first" is deterministic.
/// Articles without a link carry no identity signal and are always kept.
pub fn dedupe(articles: Vec<Article>) -> Vec<Article> {
    let mut seen_links: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(articles.len());
    let mut removed = 0usize;

    for article in articles {
        if article.link.is_empty() || seen_links.insert(article.link.clone()) {
            kept.push(article);
        } else {
            removed += 1;
        }
    }

    counter!("curate_dedup_removed_total").increment(removed as u64);
    kept
}

/// Keep articles published strictly after `cutoff`. `None` means no cutoff
/// (first run or forced), and the input passes through unchanged.
pub fn filter_since(articles: Vec<Article>, cutoff: Option<DateTime<Utc>>) -> Vec<Article> {
    let Some(cutoff) = cutoff else {
        return articles;
    };

    let before = articles.len();
    let kept: Vec<Article> = articles
        .into_iter()
        .filter(|a| a.published_at > cutoff)
        .collect();

    counter!("curate_filtered_total").increment((before - kept.len()) as u64);
    kept
}

/// Bound each category to its `limit` most recent articles. The sort is
/// stable, so equal timestamps keep their ingestion order.
pub fn cap_per_category(articles: Vec<Article>, limit: usize) -> Vec<Article> {
    let before = articles.len();

    let mut by_category: BTreeMap<String, Vec<Article>> = BTreeMap::new();
    for article in articles {
        by_category
            .entry(article.category.clone())
            .or_default()
            .push(article);
    }

    let mut kept = Vec::with_capacity(before);
    for (_, mut items) in by_category {
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        items.truncate(limit);
        kept.extend(items);
    }

    counter!("curate_capped_total").increment((before - kept.len()) as u64);
    kept
}

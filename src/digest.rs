// src/digest.rs
//! Final aggregation stage: group the curated article set by category,
//! order each group newest first, and derive a short executive summary per
//! category. Summaries prefer one generative call; the title-based fallback
//! has no external dependency and always succeeds.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ingest::types::Article;
use crate::translate::{language, Translator};

/// Articles feeding each category summary.
pub const SUMMARY_SOURCE_ARTICLES: usize = 3;

const SUMMARY_MAX_TOKENS: u32 = 300;
const EXCERPT_CHARS: usize = 120;
const FALLBACK_SUMMARY_CHARS: usize = 240;

/// One category's slice of the digest. Immutable once built.
#[derive(Debug, Clone)]
pub struct CategoryGroup {
    pub category: String,
    /// Newest first.
    pub articles: Vec<Article>,
    pub summary: Option<String>,
}

/// Partition by category (stable label order) and sort each group newest
/// first. Summaries are filled in by `summarize_groups`.
pub fn group_by_category(articles: Vec<Article>) -> Vec<CategoryGroup> {
    let mut map: BTreeMap<String, Vec<Article>> = BTreeMap::new();
    for article in articles {
        map.entry(article.category.clone()).or_default().push(article);
    }

    map.into_iter()
        .map(|(category, mut articles)| {
            articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            CategoryGroup {
                category,
                articles,
                summary: None,
            }
        })
        .collect()
}

/// Fill every group's summary. A missing translator or a failed generative
/// call degrades to the deterministic fallback, never to an error.
pub async fn summarize_groups(
    groups: &mut [CategoryGroup],
    translator: Option<&Arc<Translator>>,
    target_language: &str,
) {
    for group in groups.iter_mut() {
        group.summary = Some(synthesize_summary(&group.articles, translator, target_language).await);
    }
}

pub async fn synthesize_summary(
    articles: &[Article],
    translator: Option<&Arc<Translator>>,
    target_language: &str,
) -> String {
    let top = &articles[..articles.len().min(SUMMARY_SOURCE_ARTICLES)];

    if let Some(translator) = translator {
        match generate_summary(top, translator, target_language).await {
            Ok(summary) => return summary,
            Err(e) => {
                tracing::warn!(error = ?e, "generative summary failed, using title fallback")
            }
        }
    }

    fallback_summary(top)
}

async fn generate_summary(
    top: &[Article],
    translator: &Arc<Translator>,
    target_language: &str,
) -> anyhow::Result<String> {
    let digest = top
        .iter()
        .map(|a| format!("- {}: {}", a.title, excerpt(&a.description)))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "Write a 2-3 sentence executive summary of the following news items, \
         emphasizing business impact and emerging trends. \
         Return ONLY the summary, nothing else.\n\n{digest}"
    );

    // Working language is English; translate afterwards when needed.
    let summary = translator.generate(&prompt, SUMMARY_MAX_TOKENS).await?;
    let summary = summary.trim().to_string();
    if summary.is_empty() {
        anyhow::bail!("empty summary completion");
    }

    if language::code_for_name(target_language) == "en" {
        Ok(summary)
    } else {
        Ok(translator.translate_text(&summary, target_language).await)
    }
}

/// Deterministic summary from the top 1-2 titles. Always succeeds.
pub fn fallback_summary(top: &[Article]) -> String {
    let titles: Vec<&str> = top
        .iter()
        .map(|a| a.title.as_str())
        .filter(|t| !t.is_empty())
        .take(2)
        .collect();
    if titles.is_empty() {
        return String::new();
    }

    let mut out = format!("Key developments: {}", titles.join(" \u{2022} "));
    if out.chars().count() > FALLBACK_SUMMARY_CHARS {
        out = out.chars().take(FALLBACK_SUMMARY_CHARS - 1).collect();
        out.push('\u{2026}');
    }
    out
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    out.push('\u{2026}');
    out
}

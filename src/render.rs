// src/render.rs
//! HTML rendering for the newsletter artifact. Layout is presentation only;
//! the contract that matters here is escaping: every article- or
//! summary-derived string goes through `escape_html` before being embedded.

use chrono::{DateTime, Utc};

use crate::digest::CategoryGroup;
use crate::ingest::types::Article;

/// Escape the five HTML-special characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Anchor-safe slug for category ids.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_dash = true;
    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Full newsletter document: header with run stats, table of contents, one
/// section per category.
pub fn newsletter_html(groups: &[CategoryGroup], generated_at: DateTime<Utc>) -> String {
    let total_articles: usize = groups.iter().map(|g| g.articles.len()).sum();

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head><meta charset=\"utf-8\"></head>\n<body>\n");
    html.push_str("<h1>Veille Technologique</h1>\n");
    html.push_str(&format!(
        "<p class=\"stats\">{} articles \u{2022} {} cat\u{e9}gories \u{2022} {}</p>\n",
        total_articles,
        groups.len(),
        generated_at.format("%d/%m/%Y \u{e0} %H:%M")
    ));

    html.push_str(&toc_html(groups));
    for group in groups {
        html.push_str(&category_section_html(group));
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn toc_html(groups: &[CategoryGroup]) -> String {
    let mut html = String::from("<div class=\"toc\">\n  <h2>Table des mati\u{e8}res</h2>\n  <ul>\n");
    for group in groups {
        html.push_str(&format!(
            "    <li><a href=\"#{}\">{} ({})</a></li>\n",
            slugify(&group.category),
            escape_html(&group.category),
            group.articles.len()
        ));
    }
    html.push_str("  </ul>\n</div>\n");
    html
}

fn category_section_html(group: &CategoryGroup) -> String {
    let mut html = format!(
        "<section class=\"category\" id=\"{}\">\n  <h2>{}</h2>\n",
        slugify(&group.category),
        escape_html(&group.category)
    );

    if let Some(summary) = group.summary.as_deref().filter(|s| !s.is_empty()) {
        html.push_str("  <div class=\"category-summary\">\n");
        html.push_str("    <h3>R\u{e9}sum\u{e9} de la cat\u{e9}gorie</h3>\n");
        html.push_str(&format!("    <p>{}</p>\n", escape_html(summary)));
        html.push_str("  </div>\n");
    }

    for article in &group.articles {
        html.push_str(&article_html(article));
    }

    html.push_str("</section>\n");
    html
}

fn article_html(article: &Article) -> String {
    let title = escape_html(&article.title);
    let link = escape_html(&article.link);
    let description = escape_html(&article.description);
    let source = escape_html(&article.source);
    let date = article.published_at.format("%d/%m/%Y \u{e0} %H:%M");

    let headline = if article.link.is_empty() {
        format!("    <h3>{title}</h3>\n")
    } else {
        format!("    <h3><a href=\"{link}\" target=\"_blank\">{title}</a></h3>\n")
    };

    let mut html = String::from("  <article class=\"article\">\n");
    html.push_str(&headline);
    html.push_str(&format!(
        "    <div class=\"article-meta\"><span class=\"source\">{source}</span> <span class=\"date\">{date}</span></div>\n"
    ));
    html.push_str(&format!("    <p class=\"description\">{description}</p>\n"));
    if !article.link.is_empty() {
        html.push_str(&format!(
            "    <a href=\"{link}\" class=\"read-more\" target=\"_blank\">Lire la suite \u{2192}</a>\n"
        ));
    }
    html.push_str("  </article>\n");
    html
}

// src/run.rs
//! One full pipeline pass: fetch, dedupe, filter, cap, translate, group,
//! summarize, render, deliver. Stage-local failures degrade in place; only
//! configuration problems, delivery failure, or a total ingestion wipeout
//! surface as a run-level error.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{AppConfig, TranslationConfig};
use crate::curate;
use crate::digest;
use crate::ingest::types::{Article, FeedError, FetchStatus};
use crate::ingest::{self, FetchOptions};
use crate::notify::EmailSender;
use crate::render;
use crate::translate::{self, Translator};

/// Where `--dry-run` leaves the rendered newsletter.
pub const DRY_RUN_OUTPUT: &str = "newsletter_output.html";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub dry_run: bool,
    pub force: bool,
    pub lookback_hours: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Error,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::PartialSuccess => write!(f, "partial_success"),
            RunStatus::Error => write!(f, "error"),
        }
    }
}

/// Aggregate outcome handed back to the caller. Per-item problems live in
/// `feed_errors`; they are reported, never raised.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub message: String,
    pub articles_count: usize,
    pub categories_count: usize,
    pub feed_errors: Vec<FeedError>,
}

pub async fn run(opts: &RunOptions) -> RunReport {
    match run_inner(opts).await {
        Ok(report) => report,
        Err(e) => {
            let message = format!("{e:#}");
            tracing::error!(error = %message, "run failed");
            notify_failure(opts, &message).await;
            RunReport {
                status: RunStatus::Error,
                message,
                articles_count: 0,
                categories_count: 0,
                feed_errors: Vec::new(),
            }
        }
    }
}

/// Cutoff precedence: `force` clears it, an explicit lookback window beats
/// the recorded last run, and an absent/unparseable last run means no
/// filtering at all.
pub fn resolve_cutoff(
    force: bool,
    lookback_hours: Option<u64>,
    last_execution: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if force {
        return None;
    }
    if let Some(hours) = lookback_hours {
        return Some(now - Duration::hours(hours as i64));
    }
    last_execution
}

/// Translation is an optional capability: a missing credential or unknown
/// provider logs a warning and the run continues untranslated.
pub fn build_translator(cfg: &TranslationConfig) -> Option<Arc<Translator>> {
    match Translator::from_config(&cfg.provider, cfg.model.as_deref()) {
        Ok(t) => Some(Arc::new(t)),
        Err(e) => {
            warn!(error = %e, "translation disabled");
            None
        }
    }
}

pub async fn apply_translation(
    articles: Vec<Article>,
    translator: Option<&Arc<Translator>>,
    language: &str,
) -> Vec<Article> {
    match translator {
        Some(t) => translate::translate_articles(t, articles, language).await,
        None => articles,
    }
}

async fn run_inner(opts: &RunOptions) -> Result<RunReport> {
    info!(config = %opts.config_path.display(), "starting veille run");
    let mut cfg = AppConfig::load(&opts.config_path)?;

    let fetch_opts = FetchOptions {
        timeout_secs: cfg.fetch_timeout_secs,
        ..Default::default()
    };
    let outcome = ingest::fetch_feeds(&cfg.rss_feeds, &fetch_opts).await;
    info!(
        articles = outcome.articles.len(),
        errors = outcome.errors.len(),
        "fetched feeds"
    );

    if outcome.articles.is_empty() && outcome.errors.len() == cfg.rss_feeds.len() {
        bail!("all {} feed sources failed", cfg.rss_feeds.len());
    }

    let status = match outcome.status {
        FetchStatus::Success => RunStatus::Success,
        FetchStatus::PartialSuccess => RunStatus::PartialSuccess,
    };
    let feed_errors = outcome.errors.clone();

    let articles = curate::dedupe(outcome.articles);
    let now = Utc::now();
    let cutoff = resolve_cutoff(
        opts.force,
        opts.lookback_hours,
        cfg.last_execution_utc(),
        now,
    );
    let articles = curate::filter_since(articles, cutoff);
    let articles = curate::cap_per_category(articles, cfg.max_articles_per_feed.max(1));
    info!(kept = articles.len(), "curated article set");

    if articles.is_empty() {
        cfg.touch_last_execution(now);
        if let Err(e) = cfg.save(&opts.config_path) {
            warn!(error = %e, "could not persist last_execution");
        }
        return Ok(RunReport {
            status,
            message: "No new articles found, nothing delivered".into(),
            articles_count: 0,
            categories_count: 0,
            feed_errors,
        });
    }

    let translator = build_translator(&cfg.translation);
    if let Some(t) = &translator {
        info!(backend = t.backend_name(), language = %cfg.language, "translating descriptions");
    }
    let articles = apply_translation(articles, translator.as_ref(), &cfg.language).await;

    let articles_count = articles.len();
    let mut groups = digest::group_by_category(articles);
    digest::summarize_groups(&mut groups, translator.as_ref(), &cfg.language).await;
    let categories_count = groups.len();

    let html = render::newsletter_html(&groups, now);

    if opts.dry_run {
        std::fs::write(DRY_RUN_OUTPUT, &html)
            .with_context(|| format!("writing {DRY_RUN_OUTPUT}"))?;
        info!(file = DRY_RUN_OUTPUT, "dry run, newsletter written to disk");
    } else {
        let email_cfg = cfg
            .email
            .clone()
            .context("email settings missing from config")?;
        let sender = EmailSender::new(&email_cfg)?;
        let subject = format!(
            "\u{1F4F0} Veille Technologique - {}",
            now.format("%d/%m/%Y \u{e0} %H:%M")
        );
        sender.send_newsletter(&subject, html).await?;
        info!(recipient = %email_cfg.recipient, "newsletter sent");
    }

    cfg.touch_last_execution(now);
    if let Err(e) = cfg.save(&opts.config_path) {
        warn!(error = %e, "could not persist last_execution");
    }

    Ok(RunReport {
        status,
        message: format!("Delivered {articles_count} articles across {categories_count} categories"),
        articles_count,
        categories_count,
        feed_errors,
    })
}

/// Best-effort failure notice; never lets a notification problem mask the
/// original error.
async fn notify_failure(opts: &RunOptions, message: &str) {
    if opts.dry_run {
        return;
    }
    let Ok(cfg) = AppConfig::load(&opts.config_path) else {
        return;
    };
    let Some(email_cfg) = cfg.email else {
        return;
    };
    match EmailSender::new(&email_cfg) {
        Ok(sender) => {
            if let Err(e) = sender.send_error_notice("pipeline", message).await {
                warn!(error = %e, "could not send failure notice");
            }
        }
        Err(e) => warn!(error = %e, "could not build email sender for failure notice"),
    }
}

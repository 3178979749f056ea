// src/translate/mod.rs
pub mod backend;
pub mod language;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use metrics::counter;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::ingest::types::Article;
use backend::{build_backend, DynBackend};

/// Memoization key uses a text prefix: near-duplicate descriptions within a
/// run collapse to one backend call.
pub const CACHE_KEY_CHARS: usize = 50;

const TRANSLATE_MAX_TOKENS: u32 = 500;
const TRANSLATE_CONCURRENCY: usize = 4;

/// One translator per run. The cache lives and dies with the instance so
/// runs stay isolated and testable.
pub struct Translator {
    backend: DynBackend,
    cache: Mutex<HashMap<(String, String), String>>,
}

impl Translator {
    pub fn new(backend: DynBackend) -> Self {
        Self {
            backend,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Build from the configured provider name + model. Fails when the
    /// provider is unknown or its credential env var is missing; the caller
    /// degrades to pass-through rather than aborting the run.
    pub fn from_config(provider: &str, model: Option<&str>) -> Result<Self> {
        Ok(Self::new(build_backend(provider, model)?))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Raw generative call, used by the digest summarizer.
    pub async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        self.backend.complete(prompt, max_tokens).await
    }

    /// Translate one text into `target_language` (a display name or code).
    ///
    /// Never calls the backend for empty input or for text already detected
    /// as the target language, and never fails: any backend error falls
    /// back to the original text.
    pub async fn translate_text(&self, text: &str, target_language: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        let code = language::code_for_name(target_language);
        if language::detect(text) == Some(code) {
            return text.to_string();
        }

        let key = (cache_prefix(text), code.to_string());
        if let Some(hit) = self
            .cache
            .lock()
            .expect("poisoned translation cache")
            .get(&key)
            .cloned()
        {
            counter!("translate_cache_hits_total").increment(1);
            return hit;
        }

        let prompt = translation_prompt(text, target_language);
        match self.backend.complete(&prompt, TRANSLATE_MAX_TOKENS).await {
            Ok(translated) => {
                let translated = translated.trim().to_string();
                if translated.is_empty() {
                    return text.to_string();
                }
                self.cache
                    .lock()
                    .expect("poisoned translation cache")
                    .insert(key, translated.clone());
                translated
            }
            Err(e) => {
                tracing::warn!(
                    error = ?e,
                    backend = self.backend.name(),
                    "translation failed, keeping original text"
                );
                counter!("translate_errors_total").increment(1);
                text.to_string()
            }
        }
    }
}

/// Rewrite each article's description into the target language. Titles pass
/// through untouched (proper nouns and brand names rarely translate well).
/// Calls fan out bounded; input order is preserved on the way back.
pub async fn translate_articles(
    translator: &Arc<Translator>,
    articles: Vec<Article>,
    target_language: &str,
) -> Vec<Article> {
    let sem = Arc::new(Semaphore::new(TRANSLATE_CONCURRENCY));
    let mut set: JoinSet<(usize, Article)> = JoinSet::new();

    for (idx, article) in articles.into_iter().enumerate() {
        let translator = translator.clone();
        let sem = sem.clone();
        let lang = target_language.to_string();
        set.spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore closed");
            let description = translator.translate_text(&article.description, &lang).await;
            (idx, article.with_description(description))
        });
    }

    let mut slots: Vec<Option<Article>> = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, article)) => {
                if slots.len() <= idx {
                    slots.resize(idx + 1, None);
                }
                slots[idx] = Some(article);
            }
            Err(e) => tracing::warn!(error = ?e, "translation task failed to join"),
        }
    }
    slots.into_iter().flatten().collect()
}

fn cache_prefix(text: &str) -> String {
    text.chars().take(CACHE_KEY_CHARS).collect()
}

fn translation_prompt(text: &str, language: &str) -> String {
    format!(
        "Translate the following text to {language}.\n\
         Keep the translation concise and maintain the original meaning.\n\
         Return ONLY the translated text, nothing else.\n\n\
         Original text:\n{text}"
    )
}

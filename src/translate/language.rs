// src/translate/language.rs
//! Language-name mapping and a small lexicon-based detection heuristic.
//! Detection only has to answer one question cheaply: "is this text already
//! in the target language?" — a wrong `None` just costs one backend call.

/// Baseline target code; unrecognized language names fall back to it.
pub const BASELINE_TARGET_CODE: &str = "fr";

static LANGUAGE_CODES: &[(&str, &str)] = &[
    ("french", "fr"),
    ("english", "en"),
    ("spanish", "es"),
    ("german", "de"),
    ("italian", "it"),
    ("portuguese", "pt"),
    ("dutch", "nl"),
];

/// Map a display name ("French") or a bare code ("fr") to an ISO 639-1 code.
pub fn code_for_name(name: &str) -> &'static str {
    let key = name.trim().to_lowercase();
    for (n, c) in LANGUAGE_CODES {
        if *n == key || *c == key {
            return c;
        }
    }
    BASELINE_TARGET_CODE
}

struct Lexicon {
    code: &'static str,
    words: &'static [&'static str],
}

// Function words chosen to be frequent and mostly language-exclusive.
// Shared forms ("la", "que") appear in every list they belong to so they
// can never decide on their own.
static LEXICONS: &[Lexicon] = &[
    Lexicon {
        code: "en",
        words: &[
            "the", "and", "for", "with", "that", "this", "from", "have", "has", "will", "are",
            "was", "been", "its", "into", "about", "after", "over",
        ],
    },
    Lexicon {
        code: "fr",
        words: &[
            "le", "la", "les", "des", "une", "un", "du", "et", "est", "dans", "pour", "que",
            "qui", "sur", "avec", "aux", "cette", "pas", "nous", "vous", "aussi", "plus",
            "bonjour",
        ],
    },
    Lexicon {
        code: "es",
        words: &[
            "el", "la", "los", "las", "una", "del", "es", "por", "para", "con", "que", "se",
            "su", "al", "pero", "como", "muy", "años",
        ],
    },
    Lexicon {
        code: "de",
        words: &[
            "der", "die", "das", "und", "ist", "den", "von", "mit", "für", "auf", "ein",
            "eine", "nicht", "wird", "werden", "bei",
        ],
    },
    Lexicon {
        code: "it",
        words: &[
            "il", "la", "gli", "della", "di", "che", "per", "con", "una", "sono", "nel",
            "anche", "più",
        ],
    },
    Lexicon {
        code: "pt",
        words: &[
            "os", "as", "um", "uma", "do", "da", "dos", "em", "para", "com", "que", "não",
            "mais", "são",
        ],
    },
];

/// Guess the language of `text`. Returns `None` when no lexicon is a clear
/// winner, in which case callers should assume translation is needed.
pub fn detect(text: &str) -> Option<&'static str> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    if words.is_empty() {
        return None;
    }

    let mut scores: Vec<(usize, &'static str)> = LEXICONS
        .iter()
        .map(|lex| {
            let hits = words
                .iter()
                .filter(|w| lex.words.contains(&w.as_str()))
                .count();
            (hits, lex.code)
        })
        .collect();

    scores.sort_by(|a, b| b.0.cmp(&a.0));
    let (best, code) = scores[0];
    let runner_up = scores[1].0;
    if best > 0 && best > runner_up {
        Some(code)
    } else {
        None
    }
}

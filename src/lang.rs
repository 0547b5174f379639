//! Rough script detection for prompt text.
//!
//! Prompts are mostly comma-separated tags, so word counts over
//! `unicode_words` are a better signal than character counts: a single
//! Chinese tag should not be outvoted by one long English word.

use unicode_segmentation::UnicodeSegmentation;

use crate::constants::MIXED_LANGUAGE_MINORITY_SHARE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Chinese,
    English,
    Mixed,
    Unknown,
}

impl Language {
    /// Provider language code.
    pub fn code(self) -> &'static str {
        match self {
            Language::Chinese => "zh",
            Language::English => "en",
            Language::Mixed | Language::Unknown => "auto",
        }
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{20000}'..='\u{2A6DF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3000}'..='\u{303F}'
    )
}

pub fn detect_language(text: &str) -> Language {
    let mut cjk = 0usize;
    let mut latin = 0usize;
    for word in text.unicode_words() {
        if word.chars().any(is_cjk) {
            cjk += 1;
        } else if word.chars().any(|c| c.is_ascii_alphabetic()) {
            latin += 1;
        }
    }

    let total = cjk + latin;
    if total == 0 {
        return Language::Unknown;
    }
    let minority = cjk.min(latin) as f64 / total as f64;
    if minority > MIXED_LANGUAGE_MINORITY_SHARE {
        Language::Mixed
    } else if cjk > latin {
        Language::Chinese
    } else {
        Language::English
    }
}

/// Chinese goes to English; everything else goes to Chinese.
pub fn translation_target(source: Language) -> &'static str {
    match source {
        Language::Chinese => "en",
        _ => "zh",
    }
}

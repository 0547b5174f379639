//! Seams to the translation / expansion backends.
//!
//! Provider selection, prompt rules and the backends themselves live outside
//! this crate; the engine only needs something that turns text into text.

use std::future::Future;
use std::pin::Pin;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::operation::{CancelToken, Progress};

pub type LocalFuture<T> = Pin<Box<dyn Future<Output = T>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateRequest {
    pub text: String,
    /// `zh`, `en` or `auto`.
    pub from: String,
    pub to: String,
}

/// One request per chunk; long inputs are split by `split_paragraphs` before
/// they reach the provider.
pub trait TranslateProvider {
    fn translate(&self, request: TranslateRequest) -> LocalFuture<Result<String>>;
}

/// Split `text` into chunks of at most `max_chars` characters, breaking at
/// line ends where possible. A single line longer than the limit is cut at
/// grapheme boundaries. Unless such a cut happened, joining the chunks with
/// `\n` gives `text` back.
pub fn split_paragraphs(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut started = false;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if line_len > max_chars {
            if started {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
                started = false;
            }
            let mut piece = String::new();
            let mut piece_len = 0;
            for grapheme in line.graphemes(true) {
                let len = grapheme.chars().count();
                if piece_len + len > max_chars && !piece.is_empty() {
                    chunks.push(std::mem::take(&mut piece));
                    piece_len = 0;
                }
                piece.push_str(grapheme);
                piece_len += len;
            }
            if !piece.is_empty() {
                chunks.push(piece);
            }
        } else if started && current_len + 1 + line_len > max_chars {
            chunks.push(std::mem::replace(&mut current, line.to_string()));
            current_len = line_len;
        } else {
            if started {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(line);
            current_len += line_len;
            started = true;
        }
    }
    if started {
        chunks.push(current);
    }
    chunks
}

/// Streaming prompt expansion. Implementations push partial text through
/// `progress` and should stop early once `token` is cancelled.
pub trait ExpandProvider {
    fn expand(&self, text: String, progress: Progress, token: CancelToken) -> LocalFuture<Result<String>>;
}

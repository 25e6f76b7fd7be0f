//! Sentence-aware text splitting with bounded chunk sizes and overlap.

use std::mem::take;
use std::sync::LazyLock;

use regex::Regex;

use super::ChunkOptions;

/// Sentence boundary: one or more terminators followed by whitespace.
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"[.!?。？！]+\s+") {
        Ok(regex) => regex,
        Err(err) => panic!("Sentence boundary regex is invalid: {err}"),
    });

/// Number of characters in a string (not bytes; inputs are largely Korean).
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Trailing `count` characters of a string, or the whole string if shorter.
fn char_tail(text: &str, count: usize) -> &str {
    let len = char_len(text);
    if len <= count {
        return text;
    }
    text.char_indices()
        .nth(len - count)
        .map_or(text, |(idx, _)| &text[idx..])
}

/// Split text into sentences at punctuation-terminated boundaries.
///
/// A boundary is one or more of `. ! ? 。 ？ ！` followed by whitespace. The
/// terminator stays with its sentence. Trailing text without terminal
/// punctuation becomes a final sentence, so non-empty input never yields an
/// empty list.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut rest_start = 0;
    for found in SENTENCE_BOUNDARY.find_iter(text) {
        // Keep the punctuation, drop the boundary whitespace.
        let punct_end = found.start() + text[found.start()..found.end()].trim_end().len();
        let sentence = text[rest_start..punct_end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_owned());
        }
        rest_start = found.end();
    }

    let tail = text[rest_start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_owned());
    }

    sentences
}

/// Fixed-size character windows with overlap, for `preserve_sentences = false`.
fn chunk_by_windows(text: &str, options: &ChunkOptions) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = options.max_chars.saturating_sub(options.overlap).max(1);

    let mut chunks: Vec<String> = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + options.max_chars).min(chars.len());
        let window: String = chars[start..end].iter().collect();

        // A short final window is merged backward rather than emitted alone.
        if end == chars.len() && char_len(&window) < options.min_chars && !chunks.is_empty() {
            if let Some(last) = chunks.last_mut() {
                last.push(' ');
                last.push_str(window.trim());
            }
            break;
        }

        chunks.push(window);
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Split one text into ordered, size-bounded, overlapping chunks.
///
/// Sentence boundaries are preferred; a single sentence longer than
/// `max_chars` is emitted whole rather than split mid-word, so the size bound
/// is best-effort. Non-empty input always yields at least one chunk and no
/// trailing content is dropped.
pub fn chunk_text(text: &str, options: &ChunkOptions) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if char_len(trimmed) <= options.max_chars {
        return vec![trimmed.to_owned()];
    }

    if !options.preserve_sentences {
        return chunk_by_windows(trimmed, options);
    }

    let mut sentences = split_sentences(trimmed);
    if sentences.is_empty() {
        sentences.push(trimmed.to_owned());
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        let current_len = char_len(&current);
        let joined_len = if current.is_empty() {
            char_len(&sentence)
        } else {
            current_len + 1 + char_len(&sentence)
        };

        if joined_len > options.max_chars && current_len >= options.min_chars {
            // Close the running chunk, carrying its tail into the next one.
            let carry = if options.overlap > 0 && current_len > options.overlap {
                char_tail(&current, options.overlap).to_owned()
            } else {
                String::new()
            };
            chunks.push(take(&mut current));

            if carry.is_empty() {
                current = sentence;
            } else {
                current = format!("{carry} {sentence}");
            }
        } else if current.is_empty() {
            current = sentence;
        } else {
            current.push(' ');
            current.push_str(&sentence);
        }
    }

    if !current.is_empty() {
        if char_len(&current) >= options.min_chars || chunks.is_empty() {
            chunks.push(current);
        } else if let Some(last) = chunks.last_mut() {
            // Leftover below the minimum joins the last chunk; content is
            // never dropped.
            last.push(' ');
            last.push_str(&current);
        }
    }

    chunks
}

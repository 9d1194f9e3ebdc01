//! Overlapping text chunker.
//!
//! Splits raw document text into bounded [`TextChunk`]s that respect a
//! configurable character limit, duplicating a trailing window of each
//! chunk into the next so context survives chunk boundaries.
//!
//! # Algorithm
//!
//! 1. Text that fits in `chunk_size` (after trimming) is returned as a
//!    single chunk. Empty or whitespace-only input yields one chunk with
//!    empty content, never an empty list.
//! 2. Text is split into paragraphs on blank-line boundaries and
//!    consecutive paragraphs are packed greedily, counting a two-character
//!    `\n\n` separator.
//! 3. A paragraph that alone exceeds `chunk_size` is split into sentences
//!    by a forward scanner (no lookbehind): a boundary falls after any of
//!    `. ! ?`, their wide forms, or a newline, plus trailing whitespace.
//!    Sentences are packed greedily; when a chunk closes on overflow, the
//!    next one is seeded with the closed chunk's last `chunk_overlap`
//!    characters.
//! 4. A sentence that alone exceeds `chunk_size` is force-split into
//!    fixed-width windows advancing by `chunk_size - chunk_overlap`, so
//!    every window after the first repeats its predecessor's tail.
//! 5. A final pass prepends the previous chunk's trailing
//!    `chunk_overlap` characters to every chunk that does not already
//!    carry seeded overlap from steps 3-4. Prepending a second copy onto
//!    already-seeded chunks would duplicate the window, so those are
//!    skipped. Indices are assigned after this pass.
//!
//! All lengths are measured in characters, never bytes; slicing is always
//! `char`-boundary safe.

use crate::models::TextChunk;

/// Soft maximum character length of a packed chunk before overlap is attached.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Characters of trailing context duplicated into the following chunk.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Characters that end a sentence. Covers ASCII and wide-form terminal
/// punctuation; a newline also forces a boundary.
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '。', '．', '！', '？', '\n'];

/// Chunking options. All fields have working defaults.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Soft maximum chunk length in characters.
    pub chunk_size: usize,
    /// Trailing characters duplicated into the next chunk.
    pub chunk_overlap: usize,
    /// Reserved for custom paragraph delimiters; currently unused.
    pub separator: Option<String>,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separator: None,
        }
    }
}

/// A packed segment on its way to becoming a chunk. `seeded` marks
/// content whose head already carries overlap from a closed predecessor,
/// so the final overlap pass must not prepend a second copy.
struct Piece {
    content: String,
    seeded: bool,
}

/// Split text into bounded, overlapping chunks.
///
/// Total for every string input: well-formed text always yields at least
/// one chunk, and empty/whitespace-only text yields exactly one chunk
/// with empty content. Indices are contiguous `0..total_chunks-1` and
/// every chunk carries the same `total_chunks`.
pub fn split_text(text: &str, options: &ChunkOptions) -> Vec<TextChunk> {
    let chunk_size = options.chunk_size.max(1);
    // Overlap must leave room for the forced-split window to advance.
    let overlap = options.chunk_overlap.min(chunk_size - 1);

    let trimmed = text.trim();
    if char_len(trimmed) <= chunk_size {
        return finish(vec![trimmed.to_string()]);
    }

    let mut pieces: Vec<Piece> = Vec::new();
    let mut buf = String::new();

    for paragraph in split_paragraphs(trimmed) {
        let para = paragraph.trim();
        if para.is_empty() {
            continue;
        }
        let para_len = char_len(para);

        if para_len > chunk_size {
            // Too big to pack whole: flush the pending chunk, then fall
            // back to sentence splitting for this paragraph alone.
            if !buf.trim().is_empty() {
                pieces.push(Piece {
                    content: buf.trim().to_string(),
                    seeded: false,
                });
            }
            buf.clear();
            split_by_sentences(para, chunk_size, overlap, &mut pieces);
        } else if !buf.is_empty() && char_len(&buf) + 2 + para_len > chunk_size {
            pieces.push(Piece {
                content: buf.trim().to_string(),
                seeded: false,
            });
            buf = para.to_string();
        } else {
            if !buf.is_empty() {
                buf.push_str("\n\n");
            }
            buf.push_str(para);
        }
    }

    if !buf.trim().is_empty() {
        pieces.push(Piece {
            content: buf.trim().to_string(),
            seeded: false,
        });
    }

    if pieces.is_empty() {
        return finish(vec![trimmed.to_string()]);
    }

    finish(apply_overlap(pieces, overlap))
}

/// Sentence-level packing for a single oversized paragraph.
///
/// When a chunk closes on overflow, the next buffer is seeded with the
/// closed chunk's trailing `overlap` characters followed by the sentence
/// that triggered the overflow. A sentence too long to fit on its own is
/// force-split; all windows but the last are emitted immediately and the
/// last becomes the running buffer so packing continues.
fn split_by_sentences(text: &str, chunk_size: usize, overlap: usize, pieces: &mut Vec<Piece>) {
    let mut buf = String::new();
    let mut buf_seeded = false;

    for raw in split_sentences(text) {
        let sentence = raw.trim();
        if sentence.is_empty() {
            continue;
        }
        let sentence_len = char_len(sentence);

        if char_len(&buf) + sentence_len + 1 > chunk_size {
            if !buf.is_empty() {
                let tail = tail_chars(&buf, overlap).to_string();
                pieces.push(Piece {
                    content: buf.trim().to_string(),
                    seeded: buf_seeded,
                });
                buf = format!("{} {}", tail, sentence);
                buf_seeded = true;
            } else {
                let windows = force_split(sentence, chunk_size, overlap);
                let last = windows.len() - 1;
                for (i, window) in windows.into_iter().enumerate() {
                    if i < last {
                        pieces.push(Piece {
                            content: window,
                            seeded: i > 0,
                        });
                    } else {
                        buf = window;
                        buf_seeded = i > 0;
                    }
                }
            }
        } else if buf.is_empty() {
            buf = sentence.to_string();
            buf_seeded = false;
        } else {
            buf.push(' ');
            buf.push_str(sentence);
        }
    }

    if !buf.trim().is_empty() {
        pieces.push(Piece {
            content: buf.trim().to_string(),
            seeded: buf_seeded,
        });
    }
}

/// Fixed-width splitting for a single sentence longer than `chunk_size`.
///
/// Windows advance by `chunk_size - overlap` characters, so each window
/// after the first repeats its predecessor's last `overlap` characters.
/// Iteration stops once the remaining tail is within `overlap` of the end.
fn force_split(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut windows = Vec::new();
    let mut start = 0usize;

    while start < len {
        let end = (start + chunk_size).min(len);
        windows.push(chars[start..end].iter().collect());
        start = end - overlap.min(end);
        if start >= len.saturating_sub(overlap) {
            break;
        }
    }

    windows
}

/// Prepend the previous piece's trailing `overlap` characters to every
/// piece after the first, skipping pieces whose head already carries
/// seeded overlap. The window is always taken from the predecessor's
/// pre-overlap content.
fn apply_overlap(pieces: Vec<Piece>, overlap: usize) -> Vec<String> {
    if pieces.len() <= 1 || overlap == 0 {
        return pieces.into_iter().map(|p| p.content).collect();
    }

    let mut out = Vec::with_capacity(pieces.len());
    for i in 0..pieces.len() {
        if i == 0 || pieces[i].seeded {
            out.push(pieces[i].content.clone());
        } else {
            let tail = tail_chars(&pieces[i - 1].content, overlap);
            out.push(format!("{} {}", tail, pieces[i].content).trim().to_string());
        }
    }
    out
}

/// Assign contiguous indices and the shared total.
fn finish(contents: Vec<String>) -> Vec<TextChunk> {
    let total = contents.len();
    contents
        .into_iter()
        .enumerate()
        .map(|(i, content)| TextChunk {
            content,
            chunk_index: i,
            total_chunks: total,
        })
        .collect()
}

/// Split on blank-line boundaries. A line containing only whitespace
/// separates paragraphs; single newlines are kept inside a paragraph.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
}

/// Deterministic forward scanner for sentence boundaries: a break falls
/// after any terminal punctuation character, consuming any whitespace
/// that immediately follows it.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if SENTENCE_TERMINATORS.contains(&c) {
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = iter.peek() {
                if next.is_whitespace() {
                    end = j + next.len_utf8();
                    iter.next();
                } else {
                    break;
                }
            }
            sentences.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The last `n` characters of `s` as a subslice (char-boundary safe).
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let len = char_len(s);
    if len <= n {
        return s;
    }
    let byte = s
        .char_indices()
        .nth(len - n)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[byte..]
}

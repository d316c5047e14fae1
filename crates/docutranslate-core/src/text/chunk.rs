//! Splitting long text into provider-sized pieces.
//!
//! Pieces break on sentence boundaries where possible, then on word
//! boundaries. Lengths are measured in characters. A single word longer than
//! the limit is emitted whole, so that piece may exceed the limit.

/// A bounded-length slice of source text submitted as one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub index: usize,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `text` into ordered chunks of at most `max_len` characters.
///
/// Pure function: identical input always yields identical output. Empty or
/// whitespace-only input yields no chunks.
pub fn split(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let text = text.trim();

    if text.is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max_len {
        return vec![text.to_string()];
    }

    let sentences = sentences(text);
    if sentences.len() <= 1 && !ends_with_terminator(text) {
        // No sentence punctuation at all
        return split_words(text, max_len);
    }

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0;

    for sentence in sentences {
        let sentence_len = char_len(sentence);

        if sentence_len > max_len {
            flush(&mut chunks, &mut buffer, &mut buffer_len);
            chunks.extend(split_words(sentence, max_len));
        } else if buffer.is_empty() {
            buffer.push_str(sentence);
            buffer_len = sentence_len;
        } else if buffer_len + 1 + sentence_len <= max_len {
            buffer.push(' ');
            buffer.push_str(sentence);
            buffer_len += 1 + sentence_len;
        } else {
            flush(&mut chunks, &mut buffer, &mut buffer_len);
            buffer.push_str(sentence);
            buffer_len = sentence_len;
        }
    }
    flush(&mut chunks, &mut buffer, &mut buffer_len);

    chunks
}

/// Like [`split`], tagged with sequence indices.
pub fn chunks(text: &str, max_len: usize) -> Vec<Chunk> {
    split(text, max_len)
        .into_iter()
        .enumerate()
        .map(|(index, content)| Chunk { content, index })
        .collect()
}

fn flush(chunks: &mut Vec<String>, buffer: &mut String, buffer_len: &mut usize) {
    if !buffer.trim().is_empty() {
        chunks.push(std::mem::take(buffer));
    }
    buffer.clear();
    *buffer_len = 0;
}

const fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn ends_with_terminator(text: &str) -> bool {
    text.chars().last().is_some_and(is_terminator)
}

/// Sentence spans, trimmed and non-empty.
///
/// A sentence ends at a run of `.`, `!` or `?` followed by whitespace or the
/// end of the text, so "3.14" and "example.com" stay whole.
fn sentences(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !is_terminator(next) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }
        let at_boundary = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
        if at_boundary {
            let span = text[start..end].trim();
            if !span.is_empty() {
                spans.push(span);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        spans.push(tail);
    }
    spans
}

fn split_words(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0;

    for word in text.split_whitespace() {
        let word_len = char_len(word);

        if buffer.is_empty() {
            buffer.push_str(word);
            buffer_len = word_len;
        } else if buffer_len + 1 + word_len <= max_len {
            buffer.push(' ');
            buffer.push_str(word);
            buffer_len += 1 + word_len;
        } else {
            flush(&mut chunks, &mut buffer, &mut buffer_len);
            buffer.push_str(word);
            buffer_len = word_len;
        }
    }
    flush(&mut chunks, &mut buffer, &mut buffer_len);

    chunks
}

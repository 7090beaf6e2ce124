//! Word counting and sentence-boundary trimming.
//!
//! The word count definition used everywhere in the crate: the number of
//! maximal whitespace-separated substrings. Generation and verification must
//! agree on this or the convergence loop oscillates.

/// Count maximal whitespace-separated substrings.
#[inline]
pub fn count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Trim `text` to the longest prefix of whole sentences whose word count does
/// not exceed `max_words`.
///
/// A sentence boundary is a `.`, `!` or `?` followed by whitespace or end of
/// text. If even the first sentence exceeds the budget (or the text has no
/// boundary at all), the first sentence (or the whole text) is returned
/// unchanged: content is never cut mid-sentence.
pub fn trim_to_sentence_boundary(text: &str, max_words: usize) -> String {
    let sentences = split_sentences(text);
    if sentences.len() <= 1 {
        return text.to_string();
    }

    let mut kept = String::new();
    let mut words = 0;
    for sentence in &sentences {
        let sentence_words = count(sentence);
        if !kept.is_empty() && words + sentence_words > max_words {
            break;
        }
        kept.push_str(sentence);
        words += sentence_words;
        if words > max_words {
            break;
        }
    }

    if kept.is_empty() {
        text.to_string()
    } else {
        kept.trim_end().to_string()
    }
}

/// Split text into sentences, each slice keeping its terminator and trailing
/// whitespace so that concatenating all pieces reproduces the input.
fn split_sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?') {
            // Consume any run of terminators ("..." / "?!")
            while i + 1 < bytes.len() && matches!(bytes[i + 1], b'.' | b'!' | b'?') {
                i += 1;
            }
            let at_end = i + 1 >= bytes.len();
            if at_end || bytes[i + 1].is_ascii_whitespace() {
                // Include trailing whitespace in this sentence slice
                let mut end = i + 1;
                while end < bytes.len() && bytes[end].is_ascii_whitespace() {
                    end += 1;
                }
                sentences.push(&text[start..end]);
                start = end;
                i = end;
                continue;
            }
        }
        i += 1;
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

//! Recursive character text splitter.
//!
//! Splits extracted lecture text into pieces of roughly `chunk_size` bytes
//! (at most `chunk_size + overlap`), preferring to break on paragraph
//! boundaries, then sentence ends, then spaces, before falling back to a
//! hard split. Consecutive chunks share an `overlap`-byte tail so sentences
//! cut near a boundary stay readable in the next chunk.
//!
//! Guarantees: non-empty input always yields at least one chunk, and chunk
//! indices assigned by the ingestion pipeline are contiguous from 0.

/// Separator ladder, most to least preferred. The empty string means a hard
/// split at the size limit.
const SEPARATORS: [&str; 4] = ["\n\n", ". ", " ", ""];

/// Split `text` into chunks of at most `chunk_size` bytes with `overlap`
/// bytes carried between consecutive chunks. `overlap` must be smaller than
/// `chunk_size` (enforced by config validation).
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let pieces = split_recursive(trimmed, chunk_size, &SEPARATORS);
    let chunks = merge_pieces(&pieces, chunk_size, overlap);

    if chunks.is_empty() {
        // Degenerate input (all-whitespace pieces); keep the invariant.
        return vec![trimmed.to_string()];
    }
    chunks
}

/// Break text into pieces each no longer than `chunk_size`, recursing down
/// the separator ladder for oversized pieces.
fn split_recursive(text: &str, chunk_size: usize, separators: &[&str]) -> Vec<String> {
    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let (sep, rest) = match separators.split_first() {
        Some(pair) => pair,
        None => return hard_split(text, chunk_size),
    };

    if sep.is_empty() {
        return hard_split(text, chunk_size);
    }

    if !text.contains(sep) {
        return split_recursive(text, chunk_size, rest);
    }

    let mut pieces = Vec::new();
    let mut remaining = text;
    while let Some(pos) = remaining.find(sep) {
        let end = pos + sep.len();
        let part = &remaining[..end];
        if part.len() > chunk_size {
            pieces.extend(split_recursive(part, chunk_size, rest));
        } else {
            pieces.push(part.to_string());
        }
        remaining = &remaining[end..];
    }
    if !remaining.is_empty() {
        if remaining.len() > chunk_size {
            pieces.extend(split_recursive(remaining, chunk_size, rest));
        } else {
            pieces.push(remaining.to_string());
        }
    }

    pieces
}

/// Hard split at the size limit, backed off to a char boundary.
fn hard_split(text: &str, chunk_size: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let split_at = floor_char_boundary(remaining, remaining.len().min(chunk_size));
        // A multi-byte char wider than chunk_size would stall; take it whole.
        let split_at = if split_at == 0 {
            remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len())
        } else {
            split_at
        };
        pieces.push(remaining[..split_at].to_string());
        remaining = &remaining[split_at..];
    }
    pieces
}

/// Merge small pieces into chunks up to `chunk_size`, seeding each new chunk
/// with the previous chunk's tail for overlap.
fn merge_pieces(pieces: &[String], chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        if piece.trim().is_empty() {
            continue;
        }

        if !current.is_empty() && current.len() + piece.len() > chunk_size {
            flush(&mut chunks, &mut current, overlap);
        }
        current.push_str(piece);
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut String, overlap: usize) {
    let finished = current.trim().to_string();
    let carry = if overlap > 0 {
        tail_bytes(&finished, overlap).to_string()
    } else {
        String::new()
    };
    chunks.push(finished);
    current.clear();
    current.push_str(&carry);
}

/// Suffix of at most `n` bytes starting at a char boundary.
fn tail_bytes(s: &str, n: usize) -> &str {
    if s.len() <= n {
        return s;
    }
    let start = s.len() - n;
    let start = ceil_char_boundary(s, start);
    &s[start..]
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_text_single_chunk() {
        let chunks = split_text("Hello, world!", 1000, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Hello, world!");
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_text("", 1000, 100).is_empty());
        assert!(split_text("   \n\n  ", 1000, 100).is_empty());
    }

    #[test]
    fn paragraphs_grouped_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = split_text(text, 1000, 100);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("First paragraph."));
        assert!(chunks[0].contains("Third paragraph."));
    }

    #[test]
    fn splits_on_paragraph_boundary_when_over_limit() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = split_text(text, 30, 5);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 30 + 5, "chunk too long: {:?}", chunk);
        }
    }

    #[test]
    fn falls_back_to_sentence_splits() {
        let text = "One sentence here. Another sentence here. A third sentence here.";
        let chunks = split_text(text, 25, 0);
        assert!(chunks.len() >= 2);
        assert!(chunks[0].starts_with("One sentence"));
    }

    #[test]
    fn hard_split_handles_unbroken_text() {
        let text = "a".repeat(250);
        let chunks = split_text(&text, 100, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[2].len(), 50);
    }

    #[test]
    fn overlap_carries_tail_forward() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = split_text(text, 20, 8);
        assert!(chunks.len() > 1);
        // Each chunk after the first starts with text already seen.
        for pair in chunks.windows(2) {
            let carried: &str = &pair[1][..pair[1].len().min(4)];
            assert!(
                pair[0].contains(carried.trim()),
                "no overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "المحاضرة الأولى عن قواعد البيانات ".repeat(20);
        let chunks = split_text(&text, 100, 20);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            // Slicing would have panicked already; confirm valid UTF-8 pieces.
            assert!(chunk.chars().count() > 0);
        }
    }

    #[test]
    fn deterministic() {
        let text = "Alpha.\n\nBeta.\n\nGamma.\n\nDelta.";
        let a = split_text(text, 12, 4);
        let b = split_text(text, 12, 4);
        assert_eq!(a, b);
    }
}
